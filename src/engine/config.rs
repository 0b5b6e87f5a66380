//! Ledger and protocol configuration.

use crate::math::WAD;
use crate::types::Tier;
use serde::{Deserialize, Serialize};

/// Host-facing ledger options.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Maximum number of events to retain in memory.
    pub max_events: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_events: 100_000,
        }
    }
}

/// Per-tier rate and fee parameters, WAD-scaled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TierParams {
    /// Borrow-rate premium at full utilization.
    pub jump_rate: u128,
    /// Liquidation fee on outstanding debt.
    pub liquidation_fee: u128,
}

/// Versioned economic parameters, mutated only by the manager role within
/// bounded ranges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    pub version: u32,
    /// Annualized protocol profit target (WAD).
    pub profit_target_rate: u128,
    /// Floor for the annualized borrow rate (WAD).
    pub base_borrow_rate: u128,
    /// Nominal reward per claim, in WAD-scaled stable units.
    pub reward_amount: u128,
    /// Minimum sustained-supply duration between reward claims.
    pub reward_interval_secs: u64,
    /// Minimum liquidity base for reward eligibility.
    pub reward_supply_threshold: u128,
    /// Governance-token balance required to liquidate.
    pub liquidator_gov_threshold: u128,
    /// Flash-loan fee as a WAD fraction of the loaned amount.
    pub flash_loan_fee: u128,
    pub tier_stable: TierParams,
    pub tier_cross_a: TierParams,
    pub tier_cross_b: TierParams,
    pub tier_isolated: TierParams,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            version: 1,
            profit_target_rate: WAD / 100,      // 1%
            base_borrow_rate: WAD * 6 / 100,    // 6%
            reward_amount: 2_000 * WAD,
            reward_interval_secs: 180 * 86_400, // 180 days
            reward_supply_threshold: 100_000 * WAD,
            liquidator_gov_threshold: 20_000 * WAD,
            flash_loan_fee: WAD * 9 / 10_000,   // 9 bps
            tier_stable: TierParams {
                jump_rate: WAD * 25 / 10_000,   // 0.25%
                liquidation_fee: WAD / 100,     // 1%
            },
            tier_cross_a: TierParams {
                jump_rate: WAD * 50 / 10_000,
                liquidation_fee: WAD * 2 / 100,
            },
            tier_cross_b: TierParams {
                jump_rate: WAD / 100,
                liquidation_fee: WAD * 3 / 100,
            },
            tier_isolated: TierParams {
                jump_rate: WAD * 2 / 100,
                liquidation_fee: WAD * 4 / 100,
            },
        }
    }
}

impl ProtocolConfig {
    pub fn tier_params(&self, tier: Tier) -> &TierParams {
        match tier {
            Tier::Stable => &self.tier_stable,
            Tier::CrossA => &self.tier_cross_a,
            Tier::CrossB => &self.tier_cross_b,
            Tier::Isolated => &self.tier_isolated,
        }
    }

    /// Bounded ranges for manager updates.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.profit_target_rate < WAD / 400 || self.profit_target_rate > WAD / 10 {
            return Err("profit target out of [0.25%, 10%]");
        }
        if self.base_borrow_rate < WAD / 100 || self.base_borrow_rate > WAD / 2 {
            return Err("base borrow rate out of [1%, 50%]");
        }
        if self.flash_loan_fee > WAD / 100 {
            return Err("flash loan fee above 1%");
        }
        if self.reward_interval_secs < 86_400 {
            return Err("reward interval below one day");
        }
        for tier in [
            &self.tier_stable,
            &self.tier_cross_a,
            &self.tier_cross_b,
            &self.tier_isolated,
        ] {
            if tier.jump_rate > WAD / 4 {
                return Err("tier jump rate above 25%");
            }
            if tier.liquidation_fee > WAD / 10 {
                return Err("tier liquidation fee above 10%");
            }
        }
        Ok(())
    }
}
