//! Solvency invariant tests.
//!
//! Random operation sequences against the ledger, verifying after every step
//! that the aggregate totals match the per-position sums, that rejected
//! operations change nothing, and that no active position exceeds its credit
//! limit while prices stand still.

use lending_core::math::WAD;
use lending_core::*;
use proptest::prelude::*;
use std::collections::HashMap;

const ADMIN: AccountId = AccountId(0);
const PROVIDER: AccountId = AccountId(100);
const USERS: [AccountId; 3] = [AccountId(1), AccountId(2), AccountId(3)];
const WETH: AssetId = AssetId(1);
const USDT: AssetId = AssetId(2);
const ASSETS: [AssetId; 2] = [WETH, USDT];
const FEED: SourceId = SourceId(1);

#[derive(Debug, Clone)]
enum Op {
    Open { user: u8 },
    Supply { user: u8, position: u8, asset: u8, amount: u64 },
    Withdraw { user: u8, position: u8, asset: u8, amount: u64 },
    Borrow { user: u8, position: u8, amount: u64 },
    Repay { user: u8, position: u8, amount: u64 },
    Close { user: u8, position: u8 },
    Transfer { user: u8, from: u8, to: u8, asset: u8, amount: u64 },
    AddLiquidity { amount: u64 },
    RemoveLiquidity { amount: u64 },
    Advance { secs: u16 },
}

fn op_strategy(with_time: bool) -> BoxedStrategy<Op> {
    let base = prop_oneof![
        (0..3u8).prop_map(|user| Op::Open { user }),
        (0..3u8, 0..4u8, 0..2u8, 1..500u64)
            .prop_map(|(user, position, asset, amount)| Op::Supply { user, position, asset, amount }),
        (0..3u8, 0..4u8, 0..2u8, 1..500u64)
            .prop_map(|(user, position, asset, amount)| Op::Withdraw { user, position, asset, amount }),
        (0..3u8, 0..4u8, 1..3_000u64)
            .prop_map(|(user, position, amount)| Op::Borrow { user, position, amount }),
        (0..3u8, 0..4u8, 1..4_000u64)
            .prop_map(|(user, position, amount)| Op::Repay { user, position, amount }),
        (0..3u8, 0..4u8).prop_map(|(user, position)| Op::Close { user, position }),
        (0..3u8, 0..4u8, 0..4u8, 0..2u8, 1..200u64)
            .prop_map(|(user, from, to, asset, amount)| Op::Transfer { user, from, to, asset, amount }),
        (1..10_000u64).prop_map(|amount| Op::AddLiquidity { amount }),
        (1..10_000u64).prop_map(|amount| Op::RemoveLiquidity { amount }),
    ];
    if with_time {
        prop_oneof![base, (1..3_000u16).prop_map(|secs| Op::Advance { secs })].boxed()
    } else {
        base.boxed()
    }
}

fn pct(p: u128) -> u128 {
    WAD * p / 100
}

fn setup() -> Ledger {
    let mut ledger = Ledger::new(LedgerConfig::default(), ADMIN);
    ledger.set_time(Timestamp::from_secs(1_000_000));

    let source = OracleSource {
        id: FEED,
        kind: SourceKind::PushFeed,
        decimals: 8,
        active: true,
    };
    let weth = Asset::new(WETH, "WETH", 18, Tier::CrossA, pct(70), pct(80))
        .with_source(source.clone(), true);
    let usdt = Asset::new(USDT, "USDT", 6, Tier::Stable, pct(90), pct(95))
        .with_source(source, true);
    ledger.list_asset(ADMIN, weth).unwrap();
    ledger.list_asset(ADMIN, usdt).unwrap();

    ledger.supply_liquidity(PROVIDER, 1_000_000 * WAD).unwrap();
    ledger
}

fn feed_all(ledger: &mut Ledger, round_id: u64) {
    for (asset, price) in [(WETH, 2_000_00000000i128), (USDT, 1_00000000i128)] {
        ledger
            .submit_round(
                ADMIN,
                asset,
                FEED,
                PriceRound {
                    answer: price,
                    round_id,
                    answered_in_round: round_id,
                    updated_at: ledger.time(),
                },
            )
            .unwrap();
    }
}

/// Token units for an asset index: WETH at 18 decimals, USDT at 6.
fn token_amount(asset: u8, amount: u64) -> Amount {
    match asset % 2 {
        0 => Amount::new(amount as u128 * WAD / 100),
        _ => Amount::new(amount as u128 * 10_000), // 0.01 USDT steps
    }
}

fn asset_id(asset: u8) -> AssetId {
    ASSETS[(asset % 2) as usize]
}

type Snapshot = (LedgerTotals, u128, Vec<u128>, usize, String);

fn snapshot(ledger: &Ledger) -> Snapshot {
    let tvls = ASSETS
        .iter()
        .map(|a| ledger.asset(*a).unwrap().total_supplied.value())
        .collect();
    let positions = format!(
        "{:?}",
        USERS.iter().map(|u| ledger.positions_of(*u)).collect::<Vec<_>>()
    );
    (
        *ledger.totals(),
        ledger.stable_balance(),
        tvls,
        ledger.events().len(),
        positions,
    )
}

/// Apply one operation; on rejection, verify nothing changed.
fn apply(ledger: &mut Ledger, op: &Op, round_id: &mut u64) {
    let before = snapshot(ledger);
    let result: Result<(), LedgerError> = match *op {
        Op::Open { user } => ledger
            .open_position(USERS[(user % 3) as usize], WETH, false)
            .map(|_| ()),
        Op::Supply { user, position, asset, amount } => ledger.supply_collateral(
            USERS[(user % 3) as usize],
            PositionId(position as u64),
            asset_id(asset),
            token_amount(asset, amount),
        ),
        Op::Withdraw { user, position, asset, amount } => ledger.withdraw_collateral(
            USERS[(user % 3) as usize],
            PositionId(position as u64),
            asset_id(asset),
            token_amount(asset, amount),
        ),
        Op::Borrow { user, position, amount } => ledger.borrow(
            USERS[(user % 3) as usize],
            PositionId(position as u64),
            amount as u128 * WAD,
        ),
        Op::Repay { user, position, amount } => ledger
            .repay(
                USERS[(user % 3) as usize],
                PositionId(position as u64),
                amount as u128 * WAD,
            )
            .map(|_| ()),
        Op::Close { user, position } => ledger
            .close_position(USERS[(user % 3) as usize], PositionId(position as u64))
            .map(|_| ()),
        Op::Transfer { user, from, to, asset, amount } => ledger.transfer_collateral(
            USERS[(user % 3) as usize],
            PositionId(from as u64),
            PositionId(to as u64),
            asset_id(asset),
            token_amount(asset, amount),
        ),
        Op::AddLiquidity { amount } => {
            ledger.supply_liquidity(PROVIDER, amount as u128 * WAD)
        }
        Op::RemoveLiquidity { amount } => ledger
            .withdraw_liquidity(PROVIDER, amount as u128 * WAD)
            .map(|_| ()),
        Op::Advance { secs } => {
            ledger.advance_time(secs as u64);
            *round_id += 1;
            feed_all(ledger, *round_id);
            Ok(())
        }
    };

    if result.is_err() {
        assert_eq!(before, snapshot(ledger), "rejected op mutated state: {op:?}");
    }
}

/// Aggregate totals must always equal the per-position sums.
fn assert_ledger_sums(ledger: &Ledger) {
    let mut debt_sum = 0u128;
    let mut tvl: HashMap<AssetId, u128> = HashMap::new();
    for user in USERS {
        for position in ledger.positions_of(user) {
            if position.is_active() {
                debt_sum += position.debt_principal;
            }
            for (asset, amount) in position.collateral.iter() {
                *tvl.entry(asset).or_default() += amount.value();
            }
        }
    }
    assert_eq!(ledger.totals().total_borrow, debt_sum, "borrow total drifted");
    for asset in ASSETS {
        assert_eq!(
            ledger.asset(asset).unwrap().total_supplied.value(),
            tvl.get(&asset).copied().unwrap_or(0),
            "TVL drifted for {asset:?}"
        );
    }
}

proptest! {
    /// With prices and time frozen, every active position stays within its
    /// credit limit and the aggregate sums never drift.
    #[test]
    fn invariants_hold_with_static_prices(
        ops in proptest::collection::vec(op_strategy(false), 1..60),
    ) {
        let mut ledger = setup();
        let mut round_id = 1u64;
        feed_all(&mut ledger, round_id);

        for op in &ops {
            apply(&mut ledger, op, &mut round_id);
            assert_ledger_sums(&ledger);
        }

        // solvency: debt never exceeds the credit limit at unchanged prices
        for user in USERS {
            let count = ledger.positions_of(user).len();
            for index in 0..count {
                let id = PositionId(index as u64);
                let position = ledger.position(user, id).unwrap();
                if !position.is_active() || !position.has_debt() {
                    continue;
                }
                let debt = position.debt_principal;
                let limit = ledger.credit_limit(user, id).unwrap();
                prop_assert!(
                    debt <= limit,
                    "position ({user:?}, {id:?}) debt {debt} above limit {limit}"
                );
            }
        }
    }

    /// Time may advance and interest may fold, but the aggregate totals still
    /// equal the per-position sums after every operation.
    #[test]
    fn totals_track_positions_under_accrual(
        ops in proptest::collection::vec(op_strategy(true), 1..60),
    ) {
        let mut ledger = setup();
        let mut round_id = 1u64;
        feed_all(&mut ledger, round_id);

        for op in &ops {
            apply(&mut ledger, op, &mut round_id);
            assert_ledger_sums(&ledger);
        }
    }

    /// Position ids stay dense and strictly increasing no matter the mix of
    /// opens and closes.
    #[test]
    fn position_ids_stay_monotonic(
        ops in proptest::collection::vec(op_strategy(false), 1..40),
    ) {
        let mut ledger = setup();
        let mut round_id = 1u64;
        feed_all(&mut ledger, round_id);

        for op in &ops {
            apply(&mut ledger, op, &mut round_id);
        }

        for user in USERS {
            for (index, position) in ledger.positions_of(user).iter().enumerate() {
                prop_assert_eq!(position.id, PositionId(index as u64));
                prop_assert_eq!(position.owner, user);
            }
        }
    }
}
