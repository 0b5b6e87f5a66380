// 5.0: positions and their collateral sets. a position is owned by exactly one
// account and identified by (owner, id), where id is a strictly increasing
// index within the owner's list. closed and liquidated positions are never
// physically removed.

use crate::types::{AccountId, Amount, AssetId, PositionId, PositionStatus, Timestamp};
use serde::{Deserialize, Serialize};

/// Ceiling on distinct collateral assets per position.
pub const MAX_COLLATERAL_ASSETS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollateralError {
    #[error("position holds {held} of asset {asset:?}, {requested} requested")]
    InsufficientBalance {
        asset: AssetId,
        held: Amount,
        requested: Amount,
    },

    #[error("position already holds {MAX_COLLATERAL_ASSETS} collateral assets")]
    TooManyAssets,
}

// 5.1: insertion-ordered (asset, amount) map bounded at MAX_COLLATERAL_ASSETS.
// a Vec is the right container at this size: membership tests stay O(20) and
// iteration order is deterministic, which keeps valuation and event payloads
// reproducible.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollateralSet {
    entries: Vec<(AssetId, Amount)>,
}

impl CollateralSet {
    pub fn amount_of(&self, asset: AssetId) -> Amount {
        self.entries
            .iter()
            .find(|(id, _)| *id == asset)
            .map(|(_, amount)| *amount)
            .unwrap_or(Amount::zero())
    }

    pub fn contains(&self, asset: AssetId) -> bool {
        self.entries.iter().any(|(id, _)| *id == asset)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AssetId, Amount)> + '_ {
        self.entries.iter().copied()
    }

    /// Add to an asset's balance, registering the asset if new.
    pub fn add(&mut self, asset: AssetId, amount: Amount) -> Result<(), CollateralError> {
        if let Some((_, held)) = self.entries.iter_mut().find(|(id, _)| *id == asset) {
            *held = held.add(amount);
            return Ok(());
        }
        if self.entries.len() >= MAX_COLLATERAL_ASSETS {
            return Err(CollateralError::TooManyAssets);
        }
        self.entries.push((asset, amount));
        Ok(())
    }

    /// Subtract from an asset's balance. When `remove_empty` is set, an entry
    /// that reaches zero is dropped from the set; isolated positions keep
    /// their single registered entry.
    pub fn sub(
        &mut self,
        asset: AssetId,
        amount: Amount,
        remove_empty: bool,
    ) -> Result<(), CollateralError> {
        let held = self.amount_of(asset);
        if held < amount {
            return Err(CollateralError::InsufficientBalance {
                asset,
                held,
                requested: amount,
            });
        }
        let entry = self
            .entries
            .iter_mut()
            .find(|(id, _)| *id == asset)
            .unwrap();
        entry.1 = held.saturating_sub(amount);
        if remove_empty && entry.1.is_zero() {
            self.entries.retain(|(id, _)| *id != asset);
        }
        Ok(())
    }

    /// Drain every entry, returning the held (asset, amount) pairs.
    pub fn drain(&mut self) -> Vec<(AssetId, Amount)> {
        std::mem::take(&mut self.entries)
    }
}

// 5.2: the position record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub owner: AccountId,
    pub id: PositionId,
    pub isolated: bool,
    /// The single permitted collateral asset of an isolated position, fixed
    /// at open.
    pub isolated_asset: Option<AssetId>,
    pub collateral: CollateralSet,
    /// Debt principal in WAD-scaled stable units, with interest folded in at
    /// the last touch.
    pub debt_principal: u128,
    pub last_accrual: Timestamp,
    pub status: PositionStatus,
}

impl Position {
    pub fn open(
        owner: AccountId,
        id: PositionId,
        asset: AssetId,
        isolated: bool,
        now: Timestamp,
    ) -> Self {
        let mut collateral = CollateralSet::default();
        let isolated_asset = if isolated {
            // register the single asset immediately with a zero balance
            collateral.add(asset, Amount::zero()).unwrap();
            Some(asset)
        } else {
            None
        };
        Self {
            owner,
            id,
            isolated,
            isolated_asset,
            collateral,
            debt_principal: 0,
            last_accrual: now,
            status: PositionStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == PositionStatus::Active
    }

    pub fn has_debt(&self) -> bool {
        self.debt_principal > 0
    }
}
