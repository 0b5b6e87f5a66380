//! Risk calculations: collateral valuation, credit limits, health factors,
//! and the interest-rate curve.
//!
//! Everything here is a pure function over already-validated inputs. The
//! ledger assembles valuation lines (amount, validated price, thresholds) for
//! a position and the risk engine reduces them; it never reaches back into
//! ledger state, which keeps every check reproducible.

use crate::math::{self, WAD};
use crate::oracle::ORACLE_PRECISION;
use crate::types::{Amount, AssetId, Price, Tier, Timestamp};

/// Sentinel health factor for debt-free positions: never liquidatable.
pub const HEALTH_FACTOR_MAX: u128 = u128::MAX;

/// One collateral holding of a position, priced and annotated with the
/// asset's risk parameters.
#[derive(Debug, Clone, Copy)]
pub struct CollateralLine {
    pub asset: AssetId,
    pub amount: Amount,
    pub price: Price,
    pub asset_decimals: u32,
    pub borrow_threshold: u128,
    pub liquidation_threshold: u128,
    pub tier: Tier,
}

impl CollateralLine {
    /// WAD-scaled USD value of this holding.
    fn value(&self) -> u128 {
        math::usd_value(
            self.amount.value(),
            self.price.value(),
            self.asset_decimals + ORACLE_PRECISION,
        )
    }
}

/// Total WAD-scaled USD value of the position's collateral.
pub fn collateral_value(lines: &[CollateralLine]) -> u128 {
    lines.iter().map(|line| line.value()).sum()
}

/// Maximum sustainable debt: each holding weighted by its borrow threshold.
/// Zero for a position with no collateral.
pub fn credit_limit(lines: &[CollateralLine]) -> u128 {
    lines
        .iter()
        .map(|line| math::wad_mul(line.value(), line.borrow_threshold))
        .sum()
}

/// Liquidation-threshold-weighted collateral value.
pub fn liquidation_value(lines: &[CollateralLine]) -> u128 {
    lines
        .iter()
        .map(|line| math::wad_mul(line.value(), line.liquidation_threshold))
        .sum()
}

/// Ratio (WAD) of liquidation value to outstanding debt. A position is
/// liquidatable exactly when this drops below WAD.
pub fn health_factor(liquidation_value: u128, debt: u128) -> u128 {
    if debt == 0 {
        return HEALTH_FACTOR_MAX;
    }
    math::wad_div(liquidation_value, debt)
}

pub fn is_liquidatable(health_factor: u128) -> bool {
    health_factor < WAD
}

/// Highest-risk tier among the held assets; Stable when nothing is held.
pub fn position_tier(lines: &[CollateralLine]) -> Tier {
    lines
        .iter()
        .fold(Tier::Stable, |acc, line| acc.riskier_of(line.tier))
}

/// Fraction (WAD) of supplied liquidity currently borrowed.
pub fn utilization(total_borrow: u128, total_supplied: u128) -> u128 {
    if total_supplied == 0 {
        return 0;
    }
    math::wad_div(total_borrow, total_supplied)
}

/// Annualized supplier rate (WAD), derived from what the protocol actually
/// holds versus what suppliers put in. When assets exceed supplied liquidity
/// plus the profit target, the target slice is an implied protocol fee and is
/// excluded from the supplier's rate; below that, the full surplus accrues to
/// suppliers.
pub fn supply_rate(
    stable_balance: u128,
    total_borrow: u128,
    total_supplied: u128,
    profit_target: u128,
) -> u128 {
    if total_supplied == 0 {
        return 0;
    }
    let total = stable_balance + total_borrow;
    let target = math::wad_mul(total_supplied, profit_target);
    let fee = if total >= total_supplied + target {
        target
    } else {
        0
    };
    math::wad_div(total - fee, total_supplied).saturating_sub(WAD)
}

/// Annualized borrow rate (WAD) for a tier: the break-even rate that makes
/// suppliers whole, floored at the base rate, plus the profit target, plus a
/// tier jump premium proportional to utilization.
pub fn borrow_rate(
    utilization: u128,
    supply_rate: u128,
    base_rate: u128,
    profit_target: u128,
    tier_jump: u128,
) -> u128 {
    if utilization == 0 {
        return base_rate + profit_target;
    }
    // only the utilized fraction pays, so gross the supplier rate up
    let break_even = math::wad_div(supply_rate, utilization);
    break_even.max(base_rate) + profit_target + math::wad_mul(tier_jump, utilization)
}

/// Debt principal compounded from the last accrual to `now` at the
/// position's annualized borrow rate.
pub fn debt_with_interest(
    principal: u128,
    annual_rate: u128,
    last_accrual: Timestamp,
    now: Timestamp,
) -> u128 {
    math::compound(principal, annual_rate, now.seconds_since(last_accrual))
}

/// Liquidation fee on the outstanding debt, at the tier's WAD-scaled fee.
pub fn liquidation_fee(debt: u128, fee_pct: u128) -> u128 {
    math::wad_mul(debt, fee_pct)
}
