// 8.5: flash loans. the ledger lends stable units for the duration of one
// callback; the receiver must return principal plus fee within that callback
// or the whole operation unwinds. the operation latch stays held across the
// callback, so any attempt to re-enter a mutating operation from inside it is
// rejected.

use super::core::Ledger;
use super::results::{FlashLoanOutcome, LedgerError};
use crate::events::{EventPayload, FlashLoanEvent};
use crate::math;
use crate::types::{AccountId, UsdValue};

/// Borrower side of a flash loan. Implementations receive the loaned amount
/// (conceptually already transferred) and return the amount they transfer
/// back. The `ledger` handle exists so receivers can attempt reads; mutating
/// operations fail with `ReentrantCall` while the loan is in flight.
pub trait FlashLoanReceiver {
    fn on_flash_loan(
        &mut self,
        ledger: &mut Ledger,
        amount: u128,
        fee: u128,
        data: &[u8],
    ) -> Result<u128, String>;
}

impl Ledger {
    pub fn flash_loan(
        &mut self,
        initiator: AccountId,
        receiver: &mut dyn FlashLoanReceiver,
        amount: u128,
        data: &[u8],
    ) -> Result<FlashLoanOutcome, LedgerError> {
        self.begin_op()?;
        let result = self.flash_loan_inner(initiator, receiver, amount, data);
        self.end_op();
        result
    }

    fn flash_loan_inner(
        &mut self,
        initiator: AccountId,
        receiver: &mut dyn FlashLoanReceiver,
        amount: u128,
        data: &[u8],
    ) -> Result<FlashLoanOutcome, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        if amount > self.stable_balance {
            return Err(LedgerError::InsufficientLiquidity {
                available: self.stable_balance,
                requested: amount,
            });
        }

        let fee = math::wad_mul(amount, self.protocol.flash_loan_fee);
        let balance_before = self.stable_balance;

        self.stable_balance -= amount;
        let repaid = match receiver.on_flash_loan(self, amount, fee, data) {
            Ok(repaid) => repaid,
            Err(reason) => {
                self.stable_balance = balance_before;
                return Err(LedgerError::FlashLoanCallbackFailed { reason });
            }
        };
        self.stable_balance += repaid;

        // the post-callback balance must cover the pre-loan balance plus fee
        if self.stable_balance < balance_before + fee {
            self.stable_balance = balance_before;
            return Err(LedgerError::FlashLoanNotRepaid {
                expected: amount + fee,
                actual: repaid,
            });
        }

        self.totals.flash_fees_accrued += fee;
        self.emit_event(EventPayload::FlashLoan(FlashLoanEvent {
            initiator,
            amount: UsdValue::new(amount),
            fee: UsdValue::new(fee),
        }));

        Ok(FlashLoanOutcome {
            amount: UsdValue::new(amount),
            fee: UsdValue::new(fee),
        })
    }
}
