// 8.3: debt lifecycle. borrow and repay first fold lazily-accrued interest
// into the position's principal and the aggregate total, then apply the
// operation. the fold and the operation commit together or not at all.

use super::core::Ledger;
use super::results::{CloseOutcome, LedgerError, RepayOutcome};
use crate::events::{
    BorrowedEvent, CollateralWithdrawnEvent, EventPayload, InterestAccruedEvent,
    PositionClosedEvent, RepaidEvent,
};
use crate::risk;
use crate::types::{AccountId, PositionId, PositionStatus, UsdValue};

impl Ledger {
    pub fn borrow(
        &mut self,
        caller: AccountId,
        position_id: PositionId,
        amount: u128,
    ) -> Result<(), LedgerError> {
        self.begin_op()?;
        let result = self.borrow_inner(caller, position_id, amount);
        self.end_op();
        result
    }

    fn borrow_inner(
        &mut self,
        caller: AccountId,
        position_id: PositionId,
        amount: u128,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }

        let position = self.active_position(caller, position_id)?.clone();
        let debt = self.current_debt(&position)?;
        let accrued = debt - position.debt_principal;
        let new_debt = debt + amount;

        // protocol-wide liquidity: the pool must cover the draw both against
        // supplied liquidity and the stable units actually on hand
        let borrowed_after_fold = self.totals.total_borrow + accrued;
        let available = self
            .totals
            .total_supplied_liquidity
            .saturating_sub(borrowed_after_fold)
            .min(self.stable_balance);
        if amount > available {
            return Err(LedgerError::InsufficientLiquidity {
                available,
                requested: amount,
            });
        }

        if let Some(asset_id) = position.isolated_asset {
            let cap = self.assets.get(asset_id)?.isolation_debt_cap;
            if new_debt > cap {
                return Err(LedgerError::IsolationDebtCapExceeded {
                    cap,
                    requested: new_debt,
                });
            }
        }

        let lines = self.lines_for(&position.collateral)?;
        let limit = risk::credit_limit(&lines);
        if new_debt > limit {
            return Err(LedgerError::CreditLimitExceeded {
                limit,
                requested: new_debt,
            });
        }

        {
            let now = self.current_time;
            let position = self.position_mut(caller, position_id)?;
            position.debt_principal = new_debt;
            position.last_accrual = now;
        }
        self.totals.total_borrow += accrued + amount;
        self.totals.borrower_interest_accrued += accrued;
        self.stable_balance -= amount;

        if accrued > 0 {
            self.emit_event(EventPayload::InterestAccrued(InterestAccruedEvent {
                owner: caller,
                position_id,
                interest: UsdValue::new(accrued),
            }));
        }
        self.emit_event(EventPayload::Borrowed(BorrowedEvent {
            owner: caller,
            position_id,
            amount: UsdValue::new(amount),
            new_debt: UsdValue::new(new_debt),
        }));

        Ok(())
    }

    /// Repay up to `amount` of the outstanding debt; [`REPAY_ALL`] repays
    /// everything. The repaid stable units enter the protocol balance.
    pub fn repay(
        &mut self,
        caller: AccountId,
        position_id: PositionId,
        amount: u128,
    ) -> Result<RepayOutcome, LedgerError> {
        self.begin_op()?;
        let result = self.repay_inner(caller, position_id, amount);
        self.end_op();
        result
    }

    fn repay_inner(
        &mut self,
        caller: AccountId,
        position_id: PositionId,
        amount: u128,
    ) -> Result<RepayOutcome, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }

        let position = self.active_position(caller, position_id)?.clone();
        let debt = self.current_debt(&position)?;
        if debt == 0 {
            return Ok(RepayOutcome {
                repaid: UsdValue::zero(),
                remaining_debt: UsdValue::zero(),
            });
        }
        let accrued = debt - position.debt_principal;
        let actual = amount.min(debt);
        let remaining = debt - actual;

        {
            let now = self.current_time;
            let position = self.position_mut(caller, position_id)?;
            position.debt_principal = remaining;
            position.last_accrual = now;
        }
        self.totals.total_borrow = self.totals.total_borrow + accrued - actual;
        self.totals.borrower_interest_accrued += accrued;
        self.stable_balance += actual;

        if accrued > 0 {
            self.emit_event(EventPayload::InterestAccrued(InterestAccruedEvent {
                owner: caller,
                position_id,
                interest: UsdValue::new(accrued),
            }));
        }
        self.emit_event(EventPayload::Repaid(RepaidEvent {
            owner: caller,
            position_id,
            amount: UsdValue::new(actual),
            remaining_debt: UsdValue::new(remaining),
        }));

        Ok(RepayOutcome {
            repaid: UsdValue::new(actual),
            remaining_debt: UsdValue::new(remaining),
        })
    }

    /// Voluntary exit: repay everything outstanding, return every collateral
    /// asset to the owner, and transition to CLOSED.
    pub fn close_position(
        &mut self,
        caller: AccountId,
        position_id: PositionId,
    ) -> Result<CloseOutcome, LedgerError> {
        self.begin_op()?;
        let result = self.close_position_inner(caller, position_id);
        self.end_op();
        result
    }

    fn close_position_inner(
        &mut self,
        caller: AccountId,
        position_id: PositionId,
    ) -> Result<CloseOutcome, LedgerError> {
        let position = self.active_position(caller, position_id)?.clone();
        let debt = self.current_debt(&position)?;
        let accrued = debt - position.debt_principal;

        // every held asset must resolve before any mutation
        for (asset_id, _) in position.collateral.iter() {
            self.assets.get(asset_id)?;
        }

        self.totals.total_borrow = self.totals.total_borrow + accrued - debt;
        self.totals.borrower_interest_accrued += accrued;
        self.stable_balance += debt;

        let returned = {
            let now = self.current_time;
            let position = self.position_mut(caller, position_id)?;
            position.debt_principal = 0;
            position.last_accrual = now;
            position.status = PositionStatus::Closed;
            position.collateral.drain()
        };

        if accrued > 0 {
            self.emit_event(EventPayload::InterestAccrued(InterestAccruedEvent {
                owner: caller,
                position_id,
                interest: UsdValue::new(accrued),
            }));
        }
        if debt > 0 {
            self.emit_event(EventPayload::Repaid(RepaidEvent {
                owner: caller,
                position_id,
                amount: UsdValue::new(debt),
                remaining_debt: UsdValue::zero(),
            }));
        }

        let mut collateral_returned = Vec::new();
        for (asset_id, amount) in &returned {
            if amount.is_zero() {
                continue;
            }
            let new_tvl = {
                let asset = self.assets.get_mut(*asset_id)?;
                asset.total_supplied = asset.total_supplied.saturating_sub(*amount);
                asset.total_supplied
            };
            collateral_returned.push((*asset_id, *amount));
            self.emit_event(EventPayload::CollateralWithdrawn(CollateralWithdrawnEvent {
                owner: caller,
                position_id,
                asset_id: *asset_id,
                amount: *amount,
                new_tvl,
            }));
        }

        self.emit_event(EventPayload::PositionClosed(PositionClosedEvent {
            owner: caller,
            position_id,
        }));

        Ok(CloseOutcome {
            repaid: UsdValue::new(debt),
            collateral_returned,
        })
    }
}
