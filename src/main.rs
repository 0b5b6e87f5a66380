//! Collateralized Lending Ledger Simulation.
//!
//! Demonstrates the full ledger lifecycle including oracle aggregation,
//! supply/borrow/repay, a liquidation after a price drop, flash loans, and
//! the administrative halt and circuit breaker controls.

use lending_core::*;

const ADMIN: AccountId = AccountId(0);
const WETH: AssetId = AssetId(1);
const FEED: SourceId = SourceId(1);
const TWAP: SourceId = SourceId(2);

fn main() {
    env_logger::init();

    println!("Collateralized Lending Ledger Simulation");
    println!("Multi-Source Oracle, Tiered Risk, Full Lifecycle\n");

    scenario_1_oracle_aggregation();
    scenario_2_lending_lifecycle();
    scenario_3_liquidation();
    scenario_4_flash_loan();
    scenario_5_halt_and_breaker();

    println!("\nAll simulations completed successfully.");
}

/// A ledger with WETH listed (two oracle sources) and a funded liquidity pool.
fn setup() -> Ledger {
    let mut ledger = Ledger::new(LedgerConfig::default(), ADMIN);
    ledger.set_time(Timestamp::from_secs(1_000_000));

    let weth = Asset::new(WETH, "WETH", 18, Tier::CrossA, wad_pct(70), wad_pct(80))
        .with_source(
            OracleSource {
                id: FEED,
                kind: SourceKind::PushFeed,
                decimals: 8,
                active: true,
            },
            true,
        )
        .with_source(
            OracleSource {
                id: TWAP,
                kind: SourceKind::AmmTwap,
                decimals: 8,
                active: true,
            },
            false,
        )
        .with_min_oracle_count(2);
    ledger.list_asset(ADMIN, weth).unwrap();

    let provider = AccountId(100);
    ledger.supply_liquidity(provider, 1_000_000 * math::WAD).unwrap();

    ledger
}

fn wad_pct(pct: u128) -> u128 {
    math::WAD * pct / 100
}

/// Push the same round to both WETH sources.
fn feed_weth(ledger: &mut Ledger, price_e8: i128, round_id: u64) {
    let round = PriceRound {
        answer: price_e8,
        round_id,
        answered_in_round: round_id,
        updated_at: ledger.time(),
    };
    ledger.submit_round(ADMIN, WETH, FEED, round).unwrap();
    ledger.submit_round(ADMIN, WETH, TWAP, round).unwrap();
}

/// Median aggregation across disagreeing sources.
fn scenario_1_oracle_aggregation() {
    println!("Scenario 1: Oracle Aggregation\n");

    let mut ledger = setup();

    let at = ledger.time();
    ledger
        .submit_round(ADMIN, WETH, FEED, PriceRound {
            answer: 2_000_00000000,
            round_id: 1,
            answered_in_round: 1,
            updated_at: at,
        })
        .unwrap();
    ledger
        .submit_round(ADMIN, WETH, TWAP, PriceRound {
            answer: 2_010_00000000,
            round_id: 1,
            answered_in_round: 1,
            updated_at: at,
        })
        .unwrap();

    let price = ledger.refresh_asset_price(WETH).unwrap();
    println!("  Feed reports $2000.00, TWAP reports $2010.00");
    println!("  Committed median: {} (e8)\n", price.value());
}

/// Supply, borrow, accrue a year of interest, repay, close.
fn scenario_2_lending_lifecycle() {
    println!("Scenario 2: Lending Lifecycle\n");

    let mut ledger = setup();
    feed_weth(&mut ledger, 2_000_00000000, 1);

    let bob = AccountId(2);
    let position = ledger.open_position(bob, WETH, false).unwrap();
    ledger
        .supply_collateral(bob, position, WETH, Amount::new(10 * math::WAD))
        .unwrap();

    let limit = ledger.credit_limit(bob, position).unwrap();
    println!("  Bob supplies 10 WETH at $2000, credit limit {}", limit / math::WAD);

    ledger.borrow(bob, position, 10_000 * math::WAD).unwrap();
    println!("  Bob borrows 10,000 stable units");
    println!("  Utilization: {}%", ledger.utilization() * 100 / math::WAD);

    ledger.advance_time(math::SECONDS_PER_YEAR);
    feed_weth(&mut ledger, 2_000_00000000, 2);

    let debt = ledger.position_debt(bob, position).unwrap();
    println!("  One year later debt has grown to {}", debt / math::WAD);

    let outcome = ledger.repay(bob, position, REPAY_ALL).unwrap();
    println!("  Bob repays {} in full", outcome.repaid.value() / math::WAD);

    let close = ledger.close_position(bob, position).unwrap();
    println!(
        "  Position closed, {} collateral assets returned\n",
        close.collateral_returned.len()
    );
}

/// A price drop pushes the health factor below one; a governance-token
/// holder liquidates.
fn scenario_3_liquidation() {
    println!("Scenario 3: Liquidation\n");

    let mut ledger = setup();
    feed_weth(&mut ledger, 2_000_00000000, 1);

    let bob = AccountId(2);
    let carol = AccountId(3);
    ledger
        .set_governance_balance(ADMIN, carol, 50_000 * math::WAD)
        .unwrap();

    let position = ledger.open_position(bob, WETH, false).unwrap();
    ledger
        .supply_collateral(bob, position, WETH, Amount::new(10 * math::WAD))
        .unwrap();
    ledger.borrow(bob, position, 13_000 * math::WAD).unwrap();

    let hf = ledger.health_factor(bob, position).unwrap();
    println!("  Bob borrows 13,000 against 10 WETH, health factor {:.3}", hf as f64 / math::WAD as f64);

    ledger.advance_time(60);
    feed_weth(&mut ledger, 1_550_00000000, 2);
    let hf = ledger.health_factor(bob, position).unwrap();
    println!("  WETH drops to $1550, health factor {:.3}", hf as f64 / math::WAD as f64);

    let outcome = ledger.liquidate(carol, bob, position).unwrap();
    println!(
        "  Carol liquidates: repays {} plus fee {}, seizes {} asset(s)\n",
        outcome.debt_repaid.value() / math::WAD,
        outcome.fee.value() / math::WAD,
        outcome.collateral_seized.len()
    );
}

struct ArbitrageReceiver {
    repay_in_full: bool,
}

impl FlashLoanReceiver for ArbitrageReceiver {
    fn on_flash_loan(
        &mut self,
        _ledger: &mut Ledger,
        amount: u128,
        fee: u128,
        _data: &[u8],
    ) -> Result<u128, String> {
        if self.repay_in_full {
            Ok(amount + fee)
        } else {
            Ok(amount / 2)
        }
    }
}

/// Flash loans: a well-behaved receiver pays the fee, a short repayment
/// unwinds with no state change.
fn scenario_4_flash_loan() {
    println!("Scenario 4: Flash Loans\n");

    let mut ledger = setup();
    let balance_before = ledger.stable_balance();

    let mut good = ArbitrageReceiver { repay_in_full: true };
    let outcome = ledger
        .flash_loan(AccountId(7), &mut good, 100_000 * math::WAD, &[])
        .unwrap();
    println!(
        "  Flash loan of 100,000 repaid with fee {}",
        outcome.fee.value() / math::WAD
    );
    println!(
        "  Pool grew by {}",
        (ledger.stable_balance() - balance_before) / math::WAD
    );

    let balance_before = ledger.stable_balance();
    let mut bad = ArbitrageReceiver { repay_in_full: false };
    let err = ledger
        .flash_loan(AccountId(7), &mut bad, 100_000 * math::WAD, &[])
        .unwrap_err();
    println!("  Short repayment rejected: {err}");
    assert_eq!(ledger.stable_balance(), balance_before);
    println!("  Pool balance unchanged\n");
}

/// Administrative halt and circuit breaker controls.
fn scenario_5_halt_and_breaker() {
    println!("Scenario 5: Halt and Circuit Breaker\n");

    let mut ledger = setup();
    feed_weth(&mut ledger, 2_000_00000000, 1);
    let bob = AccountId(2);
    let position = ledger.open_position(bob, WETH, false).unwrap();

    ledger.set_paused(ADMIN, true).unwrap();
    let err = ledger
        .supply_collateral(bob, position, WETH, Amount::new(math::WAD))
        .unwrap_err();
    println!("  While halted: {err}");
    ledger.set_paused(ADMIN, false).unwrap();

    ledger.trip_breaker(ADMIN, WETH).unwrap();
    let err = ledger.refresh_asset_price(WETH).unwrap_err();
    println!("  Breaker tripped: {err}");

    ledger.reset_breaker(ADMIN, WETH).unwrap();
    let price = ledger.refresh_asset_price(WETH).unwrap();
    println!("  Breaker reset, price reads again: {} (e8)", price.value());
}
