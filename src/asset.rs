// 4.0: the asset registry. each listed asset carries its risk parameters,
// caps, and oracle source set. assets are only ever deactivated, never removed,
// so deactivated assets stay queryable for audit.

use crate::math::WAD;
use crate::oracle::{OracleSource, SourceKind};
use crate::types::{Amount, AssetId, SourceId, Tier};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub symbol: String,
    /// Native decimal precision of the token.
    pub decimals: u32,
    pub active: bool,
    pub tier: Tier,
    /// Fraction (WAD) of collateral value that may be borrowed against.
    pub borrow_threshold: u128,
    /// Fraction (WAD) of collateral value counted toward liquidation safety.
    /// Always >= `borrow_threshold`.
    pub liquidation_threshold: u128,
    /// Global cap on the total supplied amount of this asset.
    pub max_supply_threshold: Amount,
    /// Debt ceiling for isolated positions collateralized by this asset.
    /// Nonzero only for the ISOLATED tier.
    pub isolation_debt_cap: u128,
    /// Minimum valid oracle sources per aggregation; 0 means use the global
    /// default.
    pub min_oracle_count: usize,
    pub sources: Vec<OracleSource>,
    pub primary: Option<SourceId>,
    /// Total amount currently supplied across all positions (TVL).
    pub total_supplied: Amount,
}

impl Asset {
    pub fn new(
        id: AssetId,
        symbol: &str,
        decimals: u32,
        tier: Tier,
        borrow_threshold: u128,
        liquidation_threshold: u128,
    ) -> Self {
        Self {
            id,
            symbol: symbol.to_string(),
            decimals,
            active: true,
            tier,
            borrow_threshold,
            liquidation_threshold,
            max_supply_threshold: Amount::new(u128::MAX),
            isolation_debt_cap: 0,
            min_oracle_count: 0,
            sources: Vec::new(),
            primary: None,
            total_supplied: Amount::zero(),
        }
    }

    pub fn with_supply_cap(mut self, cap: Amount) -> Self {
        self.max_supply_threshold = cap;
        self
    }

    pub fn with_isolation_debt_cap(mut self, cap: u128) -> Self {
        self.isolation_debt_cap = cap;
        self
    }

    pub fn with_min_oracle_count(mut self, count: usize) -> Self {
        self.min_oracle_count = count;
        self
    }

    pub fn with_source(mut self, source: OracleSource, primary: bool) -> Self {
        if primary {
            self.primary = Some(source.id);
        }
        self.sources.push(source);
        self
    }

    pub fn validate(&self) -> Result<(), AssetError> {
        if self.borrow_threshold > WAD || self.liquidation_threshold > WAD {
            return Err(AssetError::InvalidConfig {
                asset: self.id,
                reason: "thresholds must not exceed WAD",
            });
        }
        if self.liquidation_threshold < self.borrow_threshold {
            return Err(AssetError::InvalidConfig {
                asset: self.id,
                reason: "liquidation threshold below borrow threshold",
            });
        }
        match self.tier {
            Tier::Isolated if self.isolation_debt_cap == 0 => {
                return Err(AssetError::InvalidConfig {
                    asset: self.id,
                    reason: "isolated tier requires a debt cap",
                });
            }
            Tier::Isolated => {}
            _ if self.isolation_debt_cap != 0 => {
                return Err(AssetError::InvalidConfig {
                    asset: self.id,
                    reason: "debt cap is only valid for the isolated tier",
                });
            }
            _ => {}
        }
        for kind in [SourceKind::PushFeed, SourceKind::AmmTwap] {
            let active_of_kind = self
                .sources
                .iter()
                .filter(|s| s.active && s.kind == kind)
                .count();
            if active_of_kind > 1 {
                return Err(AssetError::DuplicateSourceKind {
                    asset: self.id,
                    kind,
                });
            }
        }
        if let Some(primary) = self.primary {
            if !self.sources.iter().any(|s| s.id == primary) {
                return Err(AssetError::InvalidConfig {
                    asset: self.id,
                    reason: "primary source not in source set",
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetError {
    #[error("asset {0:?} is already listed")]
    AlreadyListed(AssetId),

    #[error("asset {0:?} is not listed")]
    NotListed(AssetId),

    #[error("asset {0:?} is not active")]
    NotActive(AssetId),

    #[error("asset {asset:?}: invalid configuration: {reason}")]
    InvalidConfig {
        asset: AssetId,
        reason: &'static str,
    },

    #[error("asset {asset:?}: more than one active source of kind {kind:?}")]
    DuplicateSourceKind { asset: AssetId, kind: SourceKind },
}

/// Listed assets, keyed by id. Insert/update only; deactivation instead of
/// removal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetRegistry {
    assets: HashMap<AssetId, Asset>,
}

impl AssetRegistry {
    pub fn list(&mut self, asset: Asset) -> Result<(), AssetError> {
        asset.validate()?;
        if self.assets.contains_key(&asset.id) {
            return Err(AssetError::AlreadyListed(asset.id));
        }
        self.assets.insert(asset.id, asset);
        Ok(())
    }

    /// Replace a listed asset's configuration. TVL is carried over; it is
    /// runtime state, not configuration.
    pub fn update(&mut self, mut asset: Asset) -> Result<(), AssetError> {
        asset.validate()?;
        let existing = self
            .assets
            .get(&asset.id)
            .ok_or(AssetError::NotListed(asset.id))?;
        asset.total_supplied = existing.total_supplied;
        self.assets.insert(asset.id, asset);
        Ok(())
    }

    pub fn deactivate(&mut self, id: AssetId) -> Result<(), AssetError> {
        let asset = self.assets.get_mut(&id).ok_or(AssetError::NotListed(id))?;
        asset.active = false;
        Ok(())
    }

    pub fn get(&self, id: AssetId) -> Result<&Asset, AssetError> {
        self.assets.get(&id).ok_or(AssetError::NotListed(id))
    }

    pub fn get_active(&self, id: AssetId) -> Result<&Asset, AssetError> {
        let asset = self.get(id)?;
        if !asset.active {
            return Err(AssetError::NotActive(id));
        }
        Ok(asset)
    }

    pub(crate) fn get_mut(&mut self, id: AssetId) -> Result<&mut Asset, AssetError> {
        self.assets.get_mut(&id).ok_or(AssetError::NotListed(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Asset> {
        self.assets.values()
    }
}
