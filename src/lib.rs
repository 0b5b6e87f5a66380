// lending-core: collateralized lending ledger engine.
// risk-first architecture: oracle validation and solvency math take priority.
// all computation is deterministic with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: AccountId, AssetId, Amount, Price, Tier
//   2.x  math.rs: WAD/RAY fixed point, binary-exponentiation compounding
//   3.x  oracle.rs: per-source validation, median aggregation, circuit breaker
//   4.x  asset.rs: asset registry, risk tiers, thresholds, caps, TVL
//   5.x  position.rs: positions and bounded collateral sets
//   6.x  risk.rs: collateral value, credit limit, health factor, rate curve
//   7.x  auth.rs: role capability table for administrative calls
//   8.x  engine/: the ledger aggregate: every lifecycle operation
//   9.x  events.rs: state transition events for audit

// core ledger modules
pub mod asset;
pub mod engine;
pub mod events;
pub mod math;
pub mod oracle;
pub mod position;
pub mod risk;
pub mod types;

// access control
pub mod auth;

// re exports for convenience
pub use asset::{Asset, AssetError, AssetRegistry};
pub use auth::{Acl, AuthError, Role};
pub use engine::{
    CloseOutcome, FlashLoanOutcome, FlashLoanReceiver, Ledger, LedgerConfig, LedgerError,
    LedgerTotals, LiquidationOutcome, LiquidityAccount, ProtocolConfig, RepayOutcome, TierParams,
    WithdrawLiquidityOutcome, MAX_POSITIONS_PER_OWNER, REPAY_ALL,
};
pub use events::{Event, EventId, EventPayload};
pub use oracle::{
    GlobalOracleConfig, OracleEngine, OracleError, OracleSource, OracleState, PriceRound,
    SourceKind, ValidatedPrice, ORACLE_PRECISION,
};
pub use position::{CollateralError, CollateralSet, Position, MAX_COLLATERAL_ASSETS};
pub use risk::{CollateralLine, HEALTH_FACTOR_MAX};
pub use types::{
    AccountId, Amount, AssetId, Price, PositionId, PositionStatus, SourceId, Tier, Timestamp,
    UsdValue,
};
