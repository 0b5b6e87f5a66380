// 8.6: the stable-unit liquidity pool. providers fund what borrowers draw;
// their base accounting backs utilization and the supply rate, and a
// sustained, large-enough supply earns a time-gated reward whose distribution
// is delegated to the external distributor.

use super::core::Ledger;
use super::results::{LedgerError, WithdrawLiquidityOutcome};
use crate::events::{
    EventPayload, LiquiditySuppliedEvent, LiquidityWithdrawnEvent, RewardEligibleEvent,
};
use crate::types::{AccountId, Timestamp, UsdValue};
use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// Per-provider liquidity accounting.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LiquidityAccount {
    /// Base units credited at supply time; share-out is proportional to this.
    pub base: u128,
    pub last_supply: Timestamp,
    /// Start of the current reward accrual window.
    pub last_reward: Timestamp,
}

/// a * b / c at 256 bits, floor. share-out math never rounds in the
/// provider's favor.
fn mul_div(a: u128, b: u128, c: u128) -> u128 {
    debug_assert!(c > 0);
    let result = U256::from(a) * U256::from(b) / U256::from(c);
    debug_assert!(result <= U256::from(u128::MAX));
    result.as_u128()
}

impl Ledger {
    /// Total pool value backing the liquidity base: idle stable units plus
    /// everything currently lent out.
    fn pool_value(&self) -> u128 {
        self.stable_balance + self.totals.total_borrow
    }

    pub fn supply_liquidity(
        &mut self,
        provider: AccountId,
        amount: u128,
    ) -> Result<(), LedgerError> {
        self.begin_op()?;
        let result = self.supply_liquidity_inner(provider, amount);
        self.end_op();
        result
    }

    fn supply_liquidity_inner(
        &mut self,
        provider: AccountId,
        amount: u128,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }

        let total_base = self.totals.total_supplied_liquidity;
        let base_minted = if total_base == 0 {
            amount
        } else {
            // mint at the current base-to-value exchange rate
            mul_div(amount, total_base, self.pool_value())
        };

        self.stable_balance += amount;
        self.totals.total_supplied_liquidity += base_minted;
        let account = self.providers.entry(provider).or_default();
        let first_supply = account.base == 0;
        account.base += base_minted;
        account.last_supply = self.current_time;
        if first_supply {
            account.last_reward = self.current_time;
        }
        let new_base = account.base;

        self.emit_event(EventPayload::LiquiditySupplied(LiquiditySuppliedEvent {
            provider,
            amount: UsdValue::new(amount),
            new_base: UsdValue::new(new_base),
        }));

        Ok(())
    }

    /// Burn `base_amount` of the provider's base for a proportional share of
    /// the pool's current value.
    pub fn withdraw_liquidity(
        &mut self,
        provider: AccountId,
        base_amount: u128,
    ) -> Result<WithdrawLiquidityOutcome, LedgerError> {
        self.begin_op()?;
        let result = self.withdraw_liquidity_inner(provider, base_amount);
        self.end_op();
        result
    }

    fn withdraw_liquidity_inner(
        &mut self,
        provider: AccountId,
        base_amount: u128,
    ) -> Result<WithdrawLiquidityOutcome, LedgerError> {
        if base_amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }

        let held = self.providers.get(&provider).map(|a| a.base).unwrap_or(0);
        if held < base_amount {
            return Err(LedgerError::InsufficientLiquidityBase {
                held,
                requested: base_amount,
            });
        }

        let total_base = self.totals.total_supplied_liquidity;
        let value_out = mul_div(base_amount, self.pool_value(), total_base);
        if value_out > self.stable_balance {
            return Err(LedgerError::InsufficientLiquidity {
                available: self.stable_balance,
                requested: value_out,
            });
        }

        let account = self.providers.get_mut(&provider).unwrap();
        account.base -= base_amount;
        self.totals.total_supplied_liquidity -= base_amount;
        self.stable_balance -= value_out;
        self.totals.supplier_interest_accrued += value_out.saturating_sub(base_amount);

        self.emit_event(EventPayload::LiquidityWithdrawn(LiquidityWithdrawnEvent {
            provider,
            base_burned: UsdValue::new(base_amount),
            value_out: UsdValue::new(value_out),
        }));

        Ok(WithdrawLiquidityOutcome {
            base_burned: UsdValue::new(base_amount),
            value_out: UsdValue::new(value_out),
        })
    }

    /// Whether a provider currently qualifies for a reward, and the nominal
    /// amount a claim would yield. Eligibility requires the base to meet the
    /// configured threshold and a full interval of sustained supply.
    pub fn reward_eligibility(&self, provider: AccountId) -> (bool, u128) {
        let Some(account) = self.providers.get(&provider) else {
            return (false, 0);
        };
        let elapsed = self.current_time.seconds_since(account.last_reward);
        let eligible = account.base >= self.protocol.reward_supply_threshold
            && elapsed >= self.protocol.reward_interval_secs;
        if eligible {
            (true, self.protocol.reward_amount)
        } else {
            (false, 0)
        }
    }

    /// Record a reward claim, resetting the accrual window. The nominal
    /// amount is returned for the external distributor; no stable units move
    /// here.
    pub fn claim_reward(&mut self, provider: AccountId) -> Result<u128, LedgerError> {
        self.begin_op()?;
        let result = self.claim_reward_inner(provider);
        self.end_op();
        result
    }

    fn claim_reward_inner(&mut self, provider: AccountId) -> Result<u128, LedgerError> {
        let (eligible, reward) = self.reward_eligibility(provider);
        if !eligible {
            return Err(LedgerError::RewardNotEligible);
        }
        let account = self.providers.get_mut(&provider).unwrap();
        account.last_reward = self.current_time;

        self.emit_event(EventPayload::RewardEligible(RewardEligibleEvent {
            provider,
            reward: UsdValue::new(reward),
        }));

        Ok(reward)
    }
}
