// 3.0: oracle validation and aggregation. each asset carries a set of price
// sources; a price is only trusted after per-source checks (positivity, round
// staleness, freshness, volatility) and cross-source median aggregation, and
// the per-asset circuit breaker can stop pricing entirely after an anomalous
// swing. a lending protocol is only as safe as its weakest oracle.

use crate::asset::Asset;
use crate::math::{self, WAD};
use crate::types::{AssetId, Price, SourceId, Timestamp};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Common decimal precision every source is normalized to before comparison
/// or aggregation.
pub const ORACLE_PRECISION: u32 = 8;

// 3.1: a price source record. an asset may hold at most one active source
// per kind, and one source may be designated primary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    /// Push-style feed reporting discrete rounds.
    PushFeed,
    /// AMM time-weighted average price.
    AmmTwap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleSource {
    pub id: SourceId,
    pub kind: SourceKind,
    /// Decimal precision of the raw answers this source reports.
    pub decimals: u32,
    pub active: bool,
}

/// One reported round from a source, as delivered by the external feed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriceRound {
    /// Raw answer at the source's own decimal precision. Signed because
    /// faulty feeds do report non-positive values.
    pub answer: i128,
    pub round_id: u64,
    /// Round the answer was actually computed in. Lagging behind `round_id`
    /// marks the round as stale.
    pub answered_in_round: u64,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Feed {
    latest: PriceRound,
    /// Answer of the round before `latest`, kept for the volatility check.
    previous_answer: Option<i128>,
}

// 3.2: process-wide oracle thresholds. manager-mutated only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalOracleConfig {
    /// Maximum age of a report before it is rejected outright.
    pub freshness_threshold_secs: u64,
    /// Reports older than this window must also pass the volatility check.
    pub volatility_window_secs: u64,
    /// Maximum percentage change (WAD) vs the prior round outside the window.
    pub volatility_pct: u128,
    /// Maximum deviation (WAD) of an aggregated candidate vs the last valid
    /// price before the circuit breaker rejects it.
    pub breaker_pct: u128,
    /// Default minimum count of valid sources per aggregation.
    pub min_required_sources: usize,
}

impl Default for GlobalOracleConfig {
    fn default() -> Self {
        Self {
            freshness_threshold_secs: 3_600,
            volatility_window_secs: 600,
            volatility_pct: WAD / 5,  // 20%
            breaker_pct: WAD / 2,     // 50%
            min_required_sources: 1,
        }
    }
}

impl GlobalOracleConfig {
    pub fn validate(&self) -> Result<(), OracleError> {
        if self.freshness_threshold_secs == 0 {
            return Err(OracleError::InvalidConfig {
                reason: "freshness threshold must be positive",
            });
        }
        if self.breaker_pct <= self.volatility_pct {
            return Err(OracleError::InvalidConfig {
                reason: "circuit breaker threshold must exceed volatility threshold",
            });
        }
        if self.min_required_sources == 0 {
            return Err(OracleError::InvalidConfig {
                reason: "minimum source count must be positive",
            });
        }
        Ok(())
    }
}

/// Per-asset oracle runtime state, mutated by price reads and breaker actions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OracleState {
    pub breaker_engaged: bool,
    pub last_valid_price: Option<Price>,
    pub last_update: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("source {source_id:?} reported non-positive answer {answer}")]
    InvalidPrice { source_id: SourceId, answer: i128 },

    #[error("source {source_id:?} round {round_id} answered in stale round {answered_in_round}")]
    StaleRound {
        source_id: SourceId,
        round_id: u64,
        answered_in_round: u64,
    },

    #[error("source {source_id:?} report is {age_secs}s old, freshness limit {max_age_secs}s")]
    PriceTimeout {
        source_id: SourceId,
        age_secs: u64,
        max_age_secs: u64,
    },

    #[error("source {source_id:?} moved {change_pct} (WAD) vs prior round, limit {threshold_pct}")]
    ExcessVolatility {
        source_id: SourceId,
        change_pct: u128,
        threshold_pct: u128,
    },

    #[error("source {source_id:?} has never reported a round")]
    NoRound { source_id: SourceId },

    #[error("asset {asset:?}: {actual} valid sources, {required} required")]
    InsufficientSources {
        asset: AssetId,
        required: usize,
        actual: usize,
    },

    #[error("asset {asset:?}: circuit breaker active")]
    CircuitBreakerActive { asset: AssetId },

    #[error("asset {asset:?}: candidate deviates {deviation_pct} (WAD) from last valid price, limit {threshold_pct}")]
    LargeDeviation {
        asset: AssetId,
        deviation_pct: u128,
        threshold_pct: u128,
    },

    #[error("invalid oracle configuration: {reason}")]
    InvalidConfig { reason: &'static str },
}

/// A validated aggregate price together with how many sources backed it.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedPrice {
    pub price: Price,
    pub valid_sources: usize,
}

// 3.3: the aggregation engine. holds the latest round per (asset, source)
// and the per-asset runtime state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleEngine {
    config: GlobalOracleConfig,
    feeds: HashMap<(AssetId, SourceId), Feed>,
    states: HashMap<AssetId, OracleState>,
}

impl Default for OracleEngine {
    fn default() -> Self {
        Self {
            config: GlobalOracleConfig::default(),
            feeds: HashMap::new(),
            states: HashMap::new(),
        }
    }
}

impl OracleEngine {
    pub fn new(config: GlobalOracleConfig) -> Result<Self, OracleError> {
        config.validate()?;
        Ok(Self {
            config,
            feeds: HashMap::new(),
            states: HashMap::new(),
        })
    }

    pub fn config(&self) -> &GlobalOracleConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: GlobalOracleConfig) -> Result<(), OracleError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Record a round pushed by an external feed. The previous latest answer
    /// is retained for the volatility check.
    pub fn submit_round(&mut self, asset: AssetId, source: SourceId, round: PriceRound) {
        let entry = self.feeds.entry((asset, source));
        match entry {
            std::collections::hash_map::Entry::Occupied(mut o) => {
                let feed = o.get_mut();
                feed.previous_answer = Some(feed.latest.answer);
                feed.latest = round;
            }
            std::collections::hash_map::Entry::Vacant(v) => {
                v.insert(Feed {
                    latest: round,
                    previous_answer: None,
                });
            }
        }
    }

    pub fn state(&self, asset: AssetId) -> Option<&OracleState> {
        self.states.get(&asset)
    }

    pub fn breaker_engaged(&self, asset: AssetId) -> bool {
        self.states
            .get(&asset)
            .is_some_and(|s| s.breaker_engaged)
    }

    /// Forcibly engage the breaker. All price reads fail until reset.
    pub fn trip_breaker(&mut self, asset: AssetId) {
        warn!("circuit breaker tripped for asset {}", asset.0);
        self.states.entry(asset).or_default().breaker_engaged = true;
    }

    /// Clear the breaker flag. `last_valid_price` is left untouched.
    pub fn reset_breaker(&mut self, asset: AssetId) {
        self.states.entry(asset).or_default().breaker_engaged = false;
    }

    // 3.4: per-source validation. order matters: positivity, round staleness,
    // freshness, then the windowed volatility check. a report inside the
    // volatility window is exempt from the volatility check entirely.
    fn validate_source(
        &self,
        asset: AssetId,
        source: &OracleSource,
        now: Timestamp,
    ) -> Result<u128, OracleError> {
        let feed = self
            .feeds
            .get(&(asset, source.id))
            .ok_or(OracleError::NoRound { source_id: source.id })?;
        let round = &feed.latest;

        if round.answer <= 0 {
            return Err(OracleError::InvalidPrice {
                source_id: source.id,
                answer: round.answer,
            });
        }

        if round.answered_in_round < round.round_id {
            return Err(OracleError::StaleRound {
                source_id: source.id,
                round_id: round.round_id,
                answered_in_round: round.answered_in_round,
            });
        }

        let age = now.seconds_since(round.updated_at);
        if age > self.config.freshness_threshold_secs {
            return Err(OracleError::PriceTimeout {
                source_id: source.id,
                age_secs: age,
                max_age_secs: self.config.freshness_threshold_secs,
            });
        }

        if age > self.config.volatility_window_secs {
            if let Some(prev) = feed.previous_answer.filter(|p| *p > 0) {
                let current = round.answer as u128;
                let prev = prev as u128;
                let delta = current.abs_diff(prev);
                let change_pct = math::wad_div(delta, prev);
                if change_pct > self.config.volatility_pct {
                    return Err(OracleError::ExcessVolatility {
                        source_id: source.id,
                        change_pct,
                        threshold_pct: self.config.volatility_pct,
                    });
                }
            }
        }

        // a positive answer can still vanish when scaled down to the common
        // precision; treat that as an invalid price, not a zero quote
        let normalized = normalize(round.answer as u128, source.decimals);
        if normalized == 0 {
            return Err(OracleError::InvalidPrice {
                source_id: source.id,
                answer: round.answer,
            });
        }
        Ok(normalized)
    }

    // 3.5: aggregate read. collects valid normalized prices, enforces the
    // quorum (with single-primary fallback), takes the median, and runs the
    // candidate through the circuit breaker before committing it as the new
    // last valid price.
    pub fn asset_price(
        &mut self,
        asset: &Asset,
        now: Timestamp,
    ) -> Result<ValidatedPrice, OracleError> {
        if self.breaker_engaged(asset.id) {
            return Err(OracleError::CircuitBreakerActive { asset: asset.id });
        }

        let mut valid: Vec<u128> = Vec::with_capacity(asset.sources.len());
        for source in asset.sources.iter().filter(|s| s.active) {
            if let Ok(price) = self.validate_source(asset.id, source, now) {
                valid.push(price);
            }
        }

        let required = if asset.min_oracle_count > 0 {
            asset.min_oracle_count
        } else {
            self.config.min_required_sources
        };

        let (candidate, valid_sources) = if valid.len() >= required {
            (median(&mut valid), valid.len())
        } else if asset.sources.len() == 1
            && asset.primary == Some(asset.sources[0].id)
            && valid.len() == 1
        {
            // quorum unreachable with a single configured source: fall back
            // to the designated primary's reading
            (valid[0], 1)
        } else {
            return Err(OracleError::InsufficientSources {
                asset: asset.id,
                required,
                actual: valid.len(),
            });
        };

        let state = self.states.entry(asset.id).or_default();
        if let Some(last) = state.last_valid_price {
            let delta = candidate.abs_diff(last.value());
            let deviation_pct = math::wad_div(delta, last.value());
            if deviation_pct > self.config.breaker_pct {
                warn!(
                    "asset {} candidate price {} deviates {} (WAD) from last valid {}",
                    asset.id.0,
                    candidate,
                    deviation_pct,
                    last.value()
                );
                return Err(OracleError::LargeDeviation {
                    asset: asset.id,
                    deviation_pct,
                    threshold_pct: self.config.breaker_pct,
                });
            }
        }

        let price = Price::new_unchecked(candidate);
        state.last_valid_price = Some(price);
        state.last_update = now;

        Ok(ValidatedPrice {
            price,
            valid_sources,
        })
    }
}

/// Scale a raw answer from `decimals` precision to [`ORACLE_PRECISION`].
fn normalize(price: u128, decimals: u32) -> u128 {
    match decimals.cmp(&ORACLE_PRECISION) {
        std::cmp::Ordering::Greater => price / 10u128.pow(decimals - ORACLE_PRECISION),
        std::cmp::Ordering::Less => price * 10u128.pow(ORACLE_PRECISION - decimals),
        std::cmp::Ordering::Equal => price,
    }
}

/// Median of the valid prices: middle value for odd counts, arithmetic mean
/// of the two middle values (rounded down) for even counts.
fn median(prices: &mut [u128]) -> u128 {
    debug_assert!(!prices.is_empty());
    prices.sort_unstable();
    let len = prices.len();
    if len % 2 == 1 {
        prices[len / 2]
    } else {
        (prices[len / 2 - 1] + prices[len / 2]) / 2
    }
}
