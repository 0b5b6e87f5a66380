//! Valuation plumbing: priced collateral lines, debt views, and rate queries.
//!
//! Price reads go through the oracle engine and commit its runtime state, so
//! everything that values collateral takes `&mut self`. Any oracle fault
//! propagates out and aborts the calling operation; no operation proceeds on
//! an unvalidated price.

use super::core::Ledger;
use super::results::LedgerError;
use crate::events::{EventPayload, PriceCommittedEvent};
use crate::position::{CollateralSet, Position};
use crate::risk::{self, CollateralLine};
use crate::types::{AccountId, AssetId, PositionId, Price, Tier};

impl Ledger {
    /// Price every held (asset, amount) pair of a collateral set. Zero
    /// balances are skipped so an empty isolated slot does not force a
    /// needless oracle read.
    pub(super) fn lines_for(
        &mut self,
        collateral: &CollateralSet,
    ) -> Result<Vec<CollateralLine>, LedgerError> {
        let mut lines = Vec::with_capacity(collateral.len());
        for (asset_id, amount) in collateral.iter() {
            if amount.is_zero() {
                continue;
            }
            let asset = self.assets.get(asset_id)?;
            let validated = self.oracle.asset_price(asset, self.current_time)?;
            lines.push(CollateralLine {
                asset: asset_id,
                amount,
                price: validated.price,
                asset_decimals: asset.decimals,
                borrow_threshold: asset.borrow_threshold,
                liquidation_threshold: asset.liquidation_threshold,
                tier: asset.tier,
            });
        }
        Ok(lines)
    }

    /// The position's risk tier: the single permitted asset's tier for
    /// isolated positions, the riskiest held tier otherwise.
    pub(super) fn tier_of(&self, position: &Position) -> Result<Tier, LedgerError> {
        if let Some(asset_id) = position.isolated_asset {
            return Ok(self.assets.get(asset_id)?.tier);
        }
        let mut tier = Tier::Stable;
        for (asset_id, amount) in position.collateral.iter() {
            if amount.is_zero() {
                continue;
            }
            tier = tier.riskier_of(self.assets.get(asset_id)?.tier);
        }
        Ok(tier)
    }

    /// Annualized borrow rate currently applicable to a position.
    pub(super) fn position_rate(&self, position: &Position) -> Result<u128, LedgerError> {
        let tier = self.tier_of(position)?;
        Ok(self.borrow_rate(tier))
    }

    /// Debt with interest compounded lazily from the last accrual touch.
    pub(super) fn current_debt(&self, position: &Position) -> Result<u128, LedgerError> {
        if position.debt_principal == 0 {
            return Ok(0);
        }
        let rate = self.position_rate(position)?;
        Ok(risk::debt_with_interest(
            position.debt_principal,
            rate,
            position.last_accrual,
            self.current_time,
        ))
    }

    // -- public queries --

    pub fn collateral_value(
        &mut self,
        owner: AccountId,
        position_id: PositionId,
    ) -> Result<u128, LedgerError> {
        let collateral = self.position(owner, position_id)?.collateral.clone();
        let lines = self.lines_for(&collateral)?;
        Ok(risk::collateral_value(&lines))
    }

    pub fn credit_limit(
        &mut self,
        owner: AccountId,
        position_id: PositionId,
    ) -> Result<u128, LedgerError> {
        let collateral = self.position(owner, position_id)?.collateral.clone();
        let lines = self.lines_for(&collateral)?;
        Ok(risk::credit_limit(&lines))
    }

    pub fn health_factor(
        &mut self,
        owner: AccountId,
        position_id: PositionId,
    ) -> Result<u128, LedgerError> {
        let position = self.position(owner, position_id)?.clone();
        let debt = self.current_debt(&position)?;
        let lines = self.lines_for(&position.collateral)?;
        Ok(risk::health_factor(risk::liquidation_value(&lines), debt))
    }

    pub fn is_liquidatable(
        &mut self,
        owner: AccountId,
        position_id: PositionId,
    ) -> Result<bool, LedgerError> {
        Ok(risk::is_liquidatable(self.health_factor(owner, position_id)?))
    }

    /// Lazy view of a position's debt with interest; does not fold.
    pub fn position_debt(
        &self,
        owner: AccountId,
        position_id: PositionId,
    ) -> Result<u128, LedgerError> {
        let position = self.position(owner, position_id)?;
        self.current_debt(position)
    }

    pub fn utilization(&self) -> u128 {
        risk::utilization(self.totals.total_borrow, self.totals.total_supplied_liquidity)
    }

    pub fn supply_rate(&self) -> u128 {
        risk::supply_rate(
            self.stable_balance,
            self.totals.total_borrow,
            self.totals.total_supplied_liquidity,
            self.protocol.profit_target_rate,
        )
    }

    pub fn borrow_rate(&self, tier: Tier) -> u128 {
        risk::borrow_rate(
            self.utilization(),
            self.supply_rate(),
            self.protocol.base_borrow_rate,
            self.protocol.profit_target_rate,
            self.protocol.tier_params(tier).jump_rate,
        )
    }

    /// Validate and commit a fresh aggregate price for an asset. Used by
    /// keepers to refresh the oracle baseline outside of lifecycle
    /// operations.
    pub fn refresh_asset_price(&mut self, asset_id: AssetId) -> Result<Price, LedgerError> {
        let validated = {
            let asset = self.assets.get(asset_id)?;
            self.oracle.asset_price(asset, self.current_time)?
        };
        self.emit_event(EventPayload::PriceCommitted(PriceCommittedEvent {
            asset_id,
            price: validated.price,
            valid_sources: validated.valid_sources,
        }));
        Ok(validated.price)
    }
}
