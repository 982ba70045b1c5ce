//! Synthetic intraday price feed.
//!
//! Each instrument starts at `base_price + U{0..base_spread}` and moves by a
//! uniform step of up to `max_step_permille` per tick, rounded to cents.
//! With a seed the whole session is reproducible.

use chrono::{Duration, NaiveTime};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::types::PriceSample;

const MINUTES_PER_DAY: u64 = 24 * 60;

/// Random-walk feed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Seed for reproducible sessions (entropy when absent).
    pub seed: Option<u64>,
    /// Lowest possible opening price.
    pub base_price: u32,
    /// Opening prices are drawn from `base_price..base_price + base_spread`.
    pub base_spread: u32,
    /// Largest per-tick move in thousandths (100 = 10%).
    pub max_step_permille: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            seed: None,
            base_price: 100,
            base_spread: 50,
            max_step_permille: 100,
        }
    }
}

impl FeedConfig {
    /// Sets a seed for reproducible sessions.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Random-walk price generator for a fixed instrument list.
pub struct RandomWalkFeed {
    config: FeedConfig,
    rng: ChaCha8Rng,
    symbols: Vec<String>,
    prices: Vec<Option<Decimal>>,
    session_open: NaiveTime,
    tick_interval_minutes: u32,
}

impl RandomWalkFeed {
    pub fn new(
        config: FeedConfig,
        symbols: &[String],
        session_open: NaiveTime,
        tick_interval_minutes: u32,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            config,
            rng,
            symbols: symbols.to_vec(),
            prices: vec![None; symbols.len()],
            session_open,
            tick_interval_minutes,
        }
    }

    /// Wall-clock time of a tick.
    ///
    /// Wraps past midnight.
    pub fn time_of(&self, tick: u32) -> NaiveTime {
        let minutes = u64::from(tick) * u64::from(self.tick_interval_minutes) % MINUTES_PER_DAY;
        self.session_open + Duration::minutes(minutes as i64)
    }

    /// Draw one sample per instrument, in configured order.
    pub fn next_tick(&mut self, tick: u32) -> Vec<PriceSample> {
        let time = self.time_of(tick);
        let max_step = self.config.max_step_permille as i64;

        let mut samples = Vec::with_capacity(self.symbols.len());
        for (idx, symbol) in self.symbols.iter().enumerate() {
            let step = self.rng.gen_range(-max_step..=max_step);
            let current = match self.prices[idx] {
                Some(price) => price,
                None => {
                    let offset = if self.config.base_spread > 0 {
                        self.rng.gen_range(0..self.config.base_spread)
                    } else {
                        0
                    };
                    Decimal::from(self.config.base_price) + Decimal::from(offset)
                }
            };

            let factor = Decimal::ONE + Decimal::new(step, 3);
            let next = (current * factor)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
                .max(Decimal::new(1, 2));
            self.prices[idx] = Some(next);

            samples.push(PriceSample {
                symbol: symbol.clone(),
                price: next,
                tick,
                time,
            });
        }
        samples
    }

    /// Last drawn price per instrument (instruments never drawn are omitted).
    pub fn last_prices(&self) -> Vec<(String, Decimal)> {
        self.symbols
            .iter()
            .zip(self.prices.iter())
            .filter_map(|(symbol, price)| price.map(|p| (symbol.clone(), p)))
            .collect()
    }
}
