// 9.0: every committed state change produces an event. used for audit trails,
// state reconstruction, and notifying external systems. the EventPayload enum
// lists all event types.

use crate::types::{AccountId, Amount, AssetId, Price, PositionId, Tier, Timestamp, UsdValue};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // Registry events
    AssetListed(AssetListedEvent),
    AssetUpdated(AssetUpdatedEvent),

    // Position events
    PositionOpened(PositionOpenedEvent),
    PositionClosed(PositionClosedEvent),
    CollateralSupplied(CollateralSuppliedEvent),
    CollateralWithdrawn(CollateralWithdrawnEvent),
    CollateralTransferred(CollateralTransferredEvent),

    // Debt events
    Borrowed(BorrowedEvent),
    Repaid(RepaidEvent),
    InterestAccrued(InterestAccruedEvent),
    Liquidated(LiquidatedEvent),

    // Liquidity events
    LiquiditySupplied(LiquiditySuppliedEvent),
    LiquidityWithdrawn(LiquidityWithdrawnEvent),
    RewardEligible(RewardEligibleEvent),
    FlashLoan(FlashLoanEvent),

    // Oracle events
    PriceCommitted(PriceCommittedEvent),
    CircuitBreakerTripped(CircuitBreakerTrippedEvent),
    CircuitBreakerReset(CircuitBreakerResetEvent),

    // Administrative events
    PausedSet(PausedSetEvent),
    ProtocolConfigUpdated(ProtocolConfigUpdatedEvent),
    OracleConfigUpdated(OracleConfigUpdatedEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetListedEvent {
    pub asset_id: AssetId,
    pub symbol: String,
    pub tier: Tier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetUpdatedEvent {
    pub asset_id: AssetId,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionOpenedEvent {
    pub owner: AccountId,
    pub position_id: PositionId,
    pub isolated: bool,
    pub asset_id: AssetId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionClosedEvent {
    pub owner: AccountId,
    pub position_id: PositionId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollateralSuppliedEvent {
    pub owner: AccountId,
    pub position_id: PositionId,
    pub asset_id: AssetId,
    pub amount: Amount,
    pub new_tvl: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollateralWithdrawnEvent {
    pub owner: AccountId,
    pub position_id: PositionId,
    pub asset_id: AssetId,
    pub amount: Amount,
    pub new_tvl: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollateralTransferredEvent {
    pub owner: AccountId,
    pub from_position: PositionId,
    pub to_position: PositionId,
    pub asset_id: AssetId,
    pub amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorrowedEvent {
    pub owner: AccountId,
    pub position_id: PositionId,
    pub amount: UsdValue,
    pub new_debt: UsdValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepaidEvent {
    pub owner: AccountId,
    pub position_id: PositionId,
    pub amount: UsdValue,
    pub remaining_debt: UsdValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterestAccruedEvent {
    pub owner: AccountId,
    pub position_id: PositionId,
    pub interest: UsdValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidatedEvent {
    pub owner: AccountId,
    pub position_id: PositionId,
    pub liquidator: AccountId,
    pub debt_repaid: UsdValue,
    pub fee: UsdValue,
    pub collateral_seized: Vec<(AssetId, Amount)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquiditySuppliedEvent {
    pub provider: AccountId,
    pub amount: UsdValue,
    pub new_base: UsdValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidityWithdrawnEvent {
    pub provider: AccountId,
    pub base_burned: UsdValue,
    pub value_out: UsdValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardEligibleEvent {
    pub provider: AccountId,
    pub reward: UsdValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashLoanEvent {
    pub initiator: AccountId,
    pub amount: UsdValue,
    pub fee: UsdValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceCommittedEvent {
    pub asset_id: AssetId,
    pub price: Price,
    pub valid_sources: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerTrippedEvent {
    pub asset_id: AssetId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerResetEvent {
    pub asset_id: AssetId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PausedSetEvent {
    pub paused: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfigUpdatedEvent {
    pub version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfigUpdatedEvent;
