// 8.0.2: result types and errors for ledger operations. every fault carries
// its structured payload so callers see the offending limits and requested
// values, not just a message.

use crate::asset::AssetError;
use crate::auth::AuthError;
use crate::oracle::OracleError;
use crate::position::CollateralError;
use crate::types::{AccountId, Amount, AssetId, PositionId, SourceId, UsdValue};

/// Sentinel repay amount meaning "repay everything outstanding".
pub const REPAY_ALL: u128 = u128::MAX;

#[derive(Debug, Clone)]
pub struct RepayOutcome {
    pub repaid: UsdValue,
    pub remaining_debt: UsdValue,
}

#[derive(Debug, Clone)]
pub struct CloseOutcome {
    pub repaid: UsdValue,
    pub collateral_returned: Vec<(AssetId, Amount)>,
}

#[derive(Debug, Clone)]
pub struct LiquidationOutcome {
    pub owner: AccountId,
    pub position_id: PositionId,
    pub debt_repaid: UsdValue,
    pub fee: UsdValue,
    pub collateral_seized: Vec<(AssetId, Amount)>,
}

#[derive(Debug, Clone)]
pub struct WithdrawLiquidityOutcome {
    pub base_burned: UsdValue,
    pub value_out: UsdValue,
}

#[derive(Debug, Clone)]
pub struct FlashLoanOutcome {
    pub amount: UsdValue,
    pub fee: UsdValue,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    // administrative faults
    #[error("protocol is halted")]
    ProtocolPaused,

    #[error("another operation is already in progress")]
    ReentrantCall,

    // authorization faults
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("liquidator holds {held} governance tokens, {required} required")]
    NotEligibleLiquidator { held: u128, required: u128 },

    // validation faults
    #[error("amount must be nonzero")]
    ZeroAmount,

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error("position ({owner:?}, {position_id:?}) not found")]
    PositionNotFound {
        owner: AccountId,
        position_id: PositionId,
    },

    #[error("position ({owner:?}, {position_id:?}) is not active")]
    PositionNotActive {
        owner: AccountId,
        position_id: PositionId,
    },

    #[error("owner already holds the maximum of {limit} positions")]
    TooManyPositions { limit: usize },

    #[error(transparent)]
    Collateral(#[from] CollateralError),

    #[error("asset {asset:?} requires an isolated position")]
    IsolatedTierOnly { asset: AssetId },

    #[error("isolated position holds {expected:?}, cannot take {actual:?}")]
    IsolatedAssetMismatch { expected: AssetId, actual: AssetId },

    #[error("source {source_id:?} is not configured for asset {asset:?}")]
    UnknownSource { asset: AssetId, source_id: SourceId },

    #[error("transfer requires two distinct positions")]
    SamePosition,

    // solvency faults
    #[error("supplying {requested} of asset {asset:?} would exceed the cap of {cap}")]
    SupplyCapExceeded {
        asset: AssetId,
        cap: Amount,
        requested: Amount,
    },

    #[error("debt of {requested} would exceed the credit limit of {limit}")]
    CreditLimitExceeded { limit: u128, requested: u128 },

    #[error("debt of {requested} would exceed the isolation cap of {cap}")]
    IsolationDebtCapExceeded { cap: u128, requested: u128 },

    #[error("protocol has {available} available, {requested} requested")]
    InsufficientLiquidity { available: u128, requested: u128 },

    #[error("provider holds {held} liquidity base, {requested} requested")]
    InsufficientLiquidityBase { held: u128, requested: u128 },

    // oracle faults
    #[error(transparent)]
    Oracle(#[from] OracleError),

    // liquidation faults
    #[error("position is not liquidatable (health factor {health_factor})")]
    NotLiquidatable { health_factor: u128 },

    // flash loan faults
    #[error("flash loan not repaid: {expected} expected, {actual} returned")]
    FlashLoanNotRepaid { expected: u128, actual: u128 },

    #[error("flash loan callback failed: {reason}")]
    FlashLoanCallbackFailed { reason: String },

    // reward faults
    #[error("provider is not yet eligible for a reward")]
    RewardNotEligible,

    // configuration faults
    #[error("configuration out of bounds: {reason}")]
    ConfigOutOfBounds { reason: &'static str },
}
