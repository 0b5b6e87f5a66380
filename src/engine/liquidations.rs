// 8.4: involuntary closure of unsafe positions. any caller holding the
// governance-token threshold may liquidate a position whose health factor has
// dropped below one: the caller remits debt plus a tier-scaled fee, receives
// all collateral, and the position terminates as LIQUIDATED.

use super::core::Ledger;
use super::results::{LedgerError, LiquidationOutcome};
use crate::events::{EventPayload, InterestAccruedEvent, LiquidatedEvent};
use crate::risk;
use crate::types::{AccountId, PositionId, PositionStatus, UsdValue};

impl Ledger {
    pub fn liquidate(
        &mut self,
        liquidator: AccountId,
        owner: AccountId,
        position_id: PositionId,
    ) -> Result<LiquidationOutcome, LedgerError> {
        self.begin_op()?;
        let result = self.liquidate_inner(liquidator, owner, position_id);
        self.end_op();
        result
    }

    fn liquidate_inner(
        &mut self,
        liquidator: AccountId,
        owner: AccountId,
        position_id: PositionId,
    ) -> Result<LiquidationOutcome, LedgerError> {
        // eligibility is checked before anything else
        let held = self.gov_balance(liquidator);
        let required = self.protocol.liquidator_gov_threshold;
        if held < required {
            return Err(LedgerError::NotEligibleLiquidator { held, required });
        }

        let position = self.active_position(owner, position_id)?.clone();
        let debt = self.current_debt(&position)?;
        let accrued = debt - position.debt_principal;

        let lines = self.lines_for(&position.collateral)?;
        let health_factor = risk::health_factor(risk::liquidation_value(&lines), debt);
        if !risk::is_liquidatable(health_factor) {
            return Err(LedgerError::NotLiquidatable { health_factor });
        }

        let tier = self.tier_of(&position)?;
        let fee = risk::liquidation_fee(debt, self.protocol.tier_params(tier).liquidation_fee);

        // the liquidator remits debt plus fee; all collateral leaves the
        // ledger toward the liquidator
        self.stable_balance += debt + fee;
        self.totals.total_borrow = self.totals.total_borrow + accrued - debt;
        self.totals.borrower_interest_accrued += accrued;

        let seized = {
            let now = self.current_time;
            let position = self.position_mut(owner, position_id)?;
            position.debt_principal = 0;
            position.last_accrual = now;
            position.status = PositionStatus::Liquidated;
            position.collateral.drain()
        };
        let seized: Vec<_> = seized
            .into_iter()
            .filter(|(_, amount)| !amount.is_zero())
            .collect();
        for (asset_id, amount) in &seized {
            let asset = self.assets.get_mut(*asset_id)?;
            asset.total_supplied = asset.total_supplied.saturating_sub(*amount);
        }

        if accrued > 0 {
            self.emit_event(EventPayload::InterestAccrued(InterestAccruedEvent {
                owner,
                position_id,
                interest: UsdValue::new(accrued),
            }));
        }
        self.emit_event(EventPayload::Liquidated(LiquidatedEvent {
            owner,
            position_id,
            liquidator,
            debt_repaid: UsdValue::new(debt),
            fee: UsdValue::new(fee),
            collateral_seized: seized.clone(),
        }));

        Ok(LiquidationOutcome {
            owner,
            position_id,
            debt_repaid: UsdValue::new(debt),
            fee: UsdValue::new(fee),
            collateral_seized: seized,
        })
    }
}
