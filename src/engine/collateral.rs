// 8.2: position opening and collateral movement. every operation validates
// fully before the first mutation, so a rejection leaves the ledger
// byte-for-byte unchanged.

use super::core::{Ledger, MAX_POSITIONS_PER_OWNER};
use super::results::LedgerError;
use crate::events::{
    CollateralSuppliedEvent, CollateralTransferredEvent, CollateralWithdrawnEvent, EventPayload,
    PositionOpenedEvent,
};
use crate::position::{CollateralError, Position, MAX_COLLATERAL_ASSETS};
use crate::risk;
use crate::types::{AccountId, Amount, AssetId, PositionId, Tier};

impl Ledger {
    /// Create a position for `caller`. An isolated position is bound to
    /// `asset_id` for its whole life; a cross position merely requires the
    /// asset to be listed and active.
    pub fn open_position(
        &mut self,
        caller: AccountId,
        asset_id: AssetId,
        isolated: bool,
    ) -> Result<PositionId, LedgerError> {
        self.begin_op()?;
        let result = self.open_position_inner(caller, asset_id, isolated);
        self.end_op();
        result
    }

    fn open_position_inner(
        &mut self,
        caller: AccountId,
        asset_id: AssetId,
        isolated: bool,
    ) -> Result<PositionId, LedgerError> {
        let tier = self.assets.get_active(asset_id)?.tier;
        if tier == Tier::Isolated && !isolated {
            return Err(LedgerError::IsolatedTierOnly { asset: asset_id });
        }

        let list = self.positions.entry(caller).or_default();
        if list.len() >= MAX_POSITIONS_PER_OWNER {
            return Err(LedgerError::TooManyPositions {
                limit: MAX_POSITIONS_PER_OWNER,
            });
        }

        // ids index into the owner's list; positions are never removed, so
        // ids are strictly increasing and never reused
        let position_id = PositionId(list.len() as u64);
        list.push(Position::open(
            caller,
            position_id,
            asset_id,
            isolated,
            self.current_time,
        ));

        self.emit_event(EventPayload::PositionOpened(PositionOpenedEvent {
            owner: caller,
            position_id,
            isolated,
            asset_id,
        }));

        Ok(position_id)
    }

    pub fn supply_collateral(
        &mut self,
        caller: AccountId,
        position_id: PositionId,
        asset_id: AssetId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.begin_op()?;
        let result = self.supply_collateral_inner(caller, position_id, asset_id, amount);
        self.end_op();
        result
    }

    fn supply_collateral_inner(
        &mut self,
        caller: AccountId,
        position_id: PositionId,
        asset_id: AssetId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return Err(LedgerError::ZeroAmount);
        }

        let (isolated, isolated_asset, held_count, already_held) = {
            let position = self.active_position(caller, position_id)?;
            (
                position.isolated,
                position.isolated_asset,
                position.collateral.len(),
                position.collateral.contains(asset_id),
            )
        };

        let (tier, cap, tvl) = {
            let asset = self.assets.get_active(asset_id)?;
            (asset.tier, asset.max_supply_threshold, asset.total_supplied)
        };

        let new_tvl = tvl.add(amount);
        if new_tvl > cap {
            return Err(LedgerError::SupplyCapExceeded {
                asset: asset_id,
                cap,
                requested: amount,
            });
        }
        if tier == Tier::Isolated && !isolated {
            return Err(LedgerError::IsolatedTierOnly { asset: asset_id });
        }
        if let Some(expected) = isolated_asset {
            if expected != asset_id {
                return Err(LedgerError::IsolatedAssetMismatch {
                    expected,
                    actual: asset_id,
                });
            }
        }
        if !already_held && held_count >= MAX_COLLATERAL_ASSETS {
            return Err(LedgerError::Collateral(CollateralError::TooManyAssets));
        }

        self.position_mut(caller, position_id)?
            .collateral
            .add(asset_id, amount)?;
        self.assets.get_mut(asset_id)?.total_supplied = new_tvl;

        self.emit_event(EventPayload::CollateralSupplied(CollateralSuppliedEvent {
            owner: caller,
            position_id,
            asset_id,
            amount,
            new_tvl,
        }));

        Ok(())
    }

    pub fn withdraw_collateral(
        &mut self,
        caller: AccountId,
        position_id: PositionId,
        asset_id: AssetId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.begin_op()?;
        let result = self.withdraw_collateral_inner(caller, position_id, asset_id, amount);
        self.end_op();
        result
    }

    fn withdraw_collateral_inner(
        &mut self,
        caller: AccountId,
        position_id: PositionId,
        asset_id: AssetId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return Err(LedgerError::ZeroAmount);
        }

        let position = self.active_position(caller, position_id)?.clone();
        let held = position.collateral.amount_of(asset_id);
        if held < amount {
            return Err(LedgerError::Collateral(CollateralError::InsufficientBalance {
                asset: asset_id,
                held,
                requested: amount,
            }));
        }

        // the remaining collateral must still cover the outstanding debt
        if position.has_debt() {
            let debt = self.current_debt(&position)?;
            let mut remaining = position.collateral.clone();
            remaining.sub(asset_id, amount, !position.isolated)?;
            let lines = self.lines_for(&remaining)?;
            let limit = risk::credit_limit(&lines);
            if limit < debt {
                return Err(LedgerError::CreditLimitExceeded {
                    limit,
                    requested: debt,
                });
            }
        }

        let new_tvl = {
            let asset = self.assets.get_mut(asset_id)?;
            asset.total_supplied = asset.total_supplied.saturating_sub(amount);
            asset.total_supplied
        };
        self.position_mut(caller, position_id)?
            .collateral
            .sub(asset_id, amount, !position.isolated)?;

        self.emit_event(EventPayload::CollateralWithdrawn(CollateralWithdrawnEvent {
            owner: caller,
            position_id,
            asset_id,
            amount,
            new_tvl,
        }));

        Ok(())
    }

    /// Atomic withdraw-then-supply between two positions of the same owner,
    /// subject to the same checks as the independent operations. Asset TVL is
    /// unchanged: the collateral never leaves the ledger.
    pub fn transfer_collateral(
        &mut self,
        caller: AccountId,
        from_id: PositionId,
        to_id: PositionId,
        asset_id: AssetId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.begin_op()?;
        let result = self.transfer_collateral_inner(caller, from_id, to_id, asset_id, amount);
        self.end_op();
        result
    }

    fn transfer_collateral_inner(
        &mut self,
        caller: AccountId,
        from_id: PositionId,
        to_id: PositionId,
        asset_id: AssetId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if from_id == to_id {
            return Err(LedgerError::SamePosition);
        }
        if amount.is_zero() {
            return Err(LedgerError::ZeroAmount);
        }

        let from = self.active_position(caller, from_id)?.clone();
        let to = self.active_position(caller, to_id)?.clone();

        // withdraw-side checks
        let held = from.collateral.amount_of(asset_id);
        if held < amount {
            return Err(LedgerError::Collateral(CollateralError::InsufficientBalance {
                asset: asset_id,
                held,
                requested: amount,
            }));
        }
        if from.has_debt() {
            let debt = self.current_debt(&from)?;
            let mut remaining = from.collateral.clone();
            remaining.sub(asset_id, amount, !from.isolated)?;
            let lines = self.lines_for(&remaining)?;
            let limit = risk::credit_limit(&lines);
            if limit < debt {
                return Err(LedgerError::CreditLimitExceeded {
                    limit,
                    requested: debt,
                });
            }
        }

        // supply-side checks
        let (tier, cap, tvl) = {
            let asset = self.assets.get_active(asset_id)?;
            (asset.tier, asset.max_supply_threshold, asset.total_supplied)
        };
        if tvl > cap {
            return Err(LedgerError::SupplyCapExceeded {
                asset: asset_id,
                cap,
                requested: amount,
            });
        }
        if tier == Tier::Isolated && !to.isolated {
            return Err(LedgerError::IsolatedTierOnly { asset: asset_id });
        }
        if let Some(expected) = to.isolated_asset {
            if expected != asset_id {
                return Err(LedgerError::IsolatedAssetMismatch {
                    expected,
                    actual: asset_id,
                });
            }
        }
        if !to.collateral.contains(asset_id) && to.collateral.len() >= MAX_COLLATERAL_ASSETS {
            return Err(LedgerError::Collateral(CollateralError::TooManyAssets));
        }

        self.position_mut(caller, from_id)?
            .collateral
            .sub(asset_id, amount, !from.isolated)?;
        self.position_mut(caller, to_id)?
            .collateral
            .add(asset_id, amount)?;

        self.emit_event(EventPayload::CollateralTransferred(
            CollateralTransferredEvent {
                owner: caller,
                from_position: from_id,
                to_position: to_id,
                asset_id,
                amount,
            },
        ));

        Ok(())
    }
}
