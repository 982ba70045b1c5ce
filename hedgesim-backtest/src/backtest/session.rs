//! Session driver.
//!
//! Replays one trading session:
//! 1. Draw one price per instrument per tick from the feed
//! 2. Hand each sample to the engine in configured instrument order
//! 3. Settle everything at the last drawn prices
//! 4. Summarize the outcome

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::NaiveTime;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::data::{FeedConfig, PriceSample, RandomWalkFeed};
use crate::portfolio::PortfolioSnapshot;

use super::engine::{EngineConfig, EngineError, IntradayEngine};
use super::settlement::SettlementReport;
use super::trade::{ExitReason, TickReport, TradeAction, TradeEvent};

const MINUTES_PER_DAY: u64 = 24 * 60;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Everything needed to run one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Starting cash.
    pub initial_balance: Decimal,

    /// Instrument symbols, in processing order.
    pub instruments: Vec<String>,

    /// Ticks per session (72 = six hours of 5-minute ticks).
    pub ticks_per_session: u32,

    /// Minutes between ticks, for display.
    pub tick_interval_minutes: u32,

    /// Wall-clock time of tick 0.
    pub session_open: NaiveTime,

    /// Strategy parameters.
    pub engine: EngineConfig,

    /// Synthetic feed parameters.
    pub feed: FeedConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_balance: Decimal::from(100_000),
            instruments: ["AAPL", "GOOGL", "AMZN", "MSFT", "TSLA"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ticks_per_session: 72,
            tick_interval_minutes: 5,
            session_open: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(NaiveTime::MIN),
            engine: EngineConfig::default(),
            feed: FeedConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Load a config from a TOML file. Missing keys take their defaults.
    pub fn from_toml(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instruments.is_empty() {
            return Err(ConfigError::Invalid(
                "no instruments configured".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for symbol in &self.instruments {
            if symbol.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "empty instrument symbol".to_string(),
                ));
            }
            if !seen.insert(symbol.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate instrument {}",
                    symbol
                )));
            }
        }
        if self.initial_balance <= Decimal::ZERO {
            return Err(ConfigError::Invalid(
                "initial_balance must be positive".to_string(),
            ));
        }
        if self.ticks_per_session == 0 {
            return Err(ConfigError::Invalid(
                "ticks_per_session must be positive".to_string(),
            ));
        }
        let session_minutes =
            u64::from(self.tick_interval_minutes) * u64::from(self.ticks_per_session);
        if session_minutes > MINUTES_PER_DAY {
            return Err(ConfigError::Invalid(format!(
                "{} ticks of {} minutes do not fit in one day",
                self.ticks_per_session, self.tick_interval_minutes
            )));
        }
        let feed = &self.feed;
        if feed.base_price == 0 || feed.base_price.checked_add(feed.base_spread).is_none() {
            return Err(ConfigError::Invalid(format!(
                "feed base_price must be in 1..={} including base_spread",
                u32::MAX
            )));
        }
        if feed.max_step_permille >= 1000 {
            return Err(ConfigError::Invalid(
                "feed max_step_permille must be below 1000".to_string(),
            ));
        }
        self.engine
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.feed.seed = Some(seed);
        self
    }
}

/// Outcome of a completed session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResult {
    pub initial_balance: Decimal,
    pub final_balance: Decimal,
    pub ticks: u32,
    /// Tick reports that produced at least one event.
    pub trading_ticks: Vec<TickReport>,
    pub settlement: SettlementReport,
    pub final_prices: Vec<(String, Decimal)>,
    pub snapshot: PortfolioSnapshot,
}

impl SessionResult {
    pub fn profit_loss(&self) -> Decimal {
        self.final_balance - self.initial_balance
    }

    pub fn return_pct(&self) -> f64 {
        if self.initial_balance.is_zero() {
            return 0.0;
        }
        let pnl = self.profit_loss().to_f64().unwrap_or(0.0);
        let initial = self.initial_balance.to_f64().unwrap_or(1.0);
        pnl / initial * 100.0
    }

    /// Every event in order: intraday first, then settlement.
    pub fn events(&self) -> impl Iterator<Item = &TradeEvent> {
        self.trading_ticks
            .iter()
            .flat_map(|r| r.events.iter())
            .chain(self.settlement.events.iter())
    }

    fn count(&self, pred: impl Fn(&TradeAction) -> bool) -> usize {
        self.events().filter(|e| pred(&e.action)).count()
    }

    pub fn buys(&self) -> usize {
        self.count(|a| matches!(a, TradeAction::Buy { .. }))
    }

    pub fn sells(&self, reason: ExitReason) -> usize {
        self.count(|a| matches!(a, TradeAction::Sell { reason: r, .. } if *r == reason))
    }

    pub fn hedges_opened(&self) -> usize {
        self.count(|a| matches!(a, TradeAction::OptionOpened { .. }))
    }

    pub fn options_exercised(&self) -> usize {
        self.count(|a| matches!(a, TradeAction::OptionExercised { .. }))
    }

    pub fn options_expired(&self) -> usize {
        self.count(|a| matches!(a, TradeAction::OptionExpired { .. }))
    }

    /// Generate summary string.
    pub fn summary(&self) -> String {
        let pnl = self.profit_loss();
        let pnl_label = if pnl >= Decimal::ZERO { "Profit" } else { "Loss" };
        format!(
            "Session Results ({} ticks)\n\
             ----------------------------------------\n\
             Initial Balance: ${:.2}\n\
             Final Balance: ${:.2}\n\
             {}: ${:.2} ({:.2}%)\n\
             \n\
             Buys: {}\n\
             Profit Exits: {}\n\
             Drop Exits: {}\n\
             EOD Sells: {}\n\
             \n\
             Hedges Opened: {}\n\
             Options Exercised: {}\n\
             Options Expired: {}",
            self.ticks,
            self.initial_balance,
            self.final_balance,
            pnl_label,
            pnl.abs(),
            self.return_pct(),
            self.buys(),
            self.sells(ExitReason::ProfitTarget),
            self.sells(ExitReason::DropForecast),
            self.sells(ExitReason::EndOfSession),
            self.hedges_opened(),
            self.options_exercised(),
            self.options_expired(),
        )
    }
}

/// One configured session: feed plus engine.
pub struct Session {
    config: SessionConfig,
    feed: RandomWalkFeed,
    engine: IntradayEngine,
}

impl Session {
    pub fn new(config: SessionConfig) -> Result<Self, EngineError> {
        config
            .validate()
            .map_err(|e| EngineError::InvalidConfig(e.to_string()))?;

        let feed = RandomWalkFeed::new(
            config.feed.clone(),
            &config.instruments,
            config.session_open,
            config.tick_interval_minutes,
        );
        let engine = IntradayEngine::new(
            config.engine.clone(),
            config.initial_balance,
            &config.instruments,
        )?;
        Ok(Self {
            config,
            feed,
            engine,
        })
    }

    /// Run every tick, then settle. `on_sample` sees each sample and its
    /// report as they happen.
    pub fn run_with<F>(mut self, mut on_sample: F) -> Result<SessionResult, EngineError>
    where
        F: FnMut(&PriceSample, &TickReport),
    {
        info!(
            instruments = self.config.instruments.len(),
            ticks = self.config.ticks_per_session,
            balance = %self.config.initial_balance,
            "session starting"
        );

        let mut trading_ticks = Vec::new();
        for tick in 0..self.config.ticks_per_session {
            for sample in self.feed.next_tick(tick) {
                let report = self
                    .engine
                    .on_tick(&sample.symbol, sample.price, sample.tick)?;
                on_sample(&sample, &report);
                if !report.events.is_empty() {
                    trading_ticks.push(report);
                }
            }
        }

        let final_prices = self.feed.last_prices();
        let price_map: HashMap<String, Decimal> = final_prices.iter().cloned().collect();
        let settlement = self.engine.settle(&price_map)?;

        let result = SessionResult {
            initial_balance: self.config.initial_balance,
            final_balance: self.engine.cash(),
            ticks: self.config.ticks_per_session,
            trading_ticks,
            settlement,
            final_prices,
            snapshot: self.engine.snapshot(),
        };
        info!(
            final_balance = %result.final_balance,
            pnl = %result.profit_loss(),
            "session settled"
        );
        Ok(result)
    }

    pub fn run(self) -> Result<SessionResult, EngineError> {
        self.run_with(|_, _| {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_session_config() {
        let config = SessionConfig::default();
        assert_eq!(config.initial_balance, dec!(100000));
        assert_eq!(config.instruments.len(), 5);
        assert_eq!(config.ticks_per_session, 72);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = SessionConfig::from_toml_str(
            r#"
            initial_balance = 5000
            instruments = ["SPY", "QQQ"]

            [engine]
            window_size = 5

            [engine.hedge]
            enabled = false

            [feed]
            seed = 9
            "#,
        )
        .unwrap();

        assert_eq!(config.initial_balance, dec!(5000));
        assert_eq!(config.instruments, vec!["SPY", "QQQ"]);
        assert_eq!(config.ticks_per_session, 72);
        assert_eq!(config.engine.window_size, 5);
        assert_eq!(config.engine.slippage_pct, 0.01);
        assert!(!config.engine.hedge.enabled);
        assert_eq!(config.engine.hedge.volatility, 0.20);
        assert_eq!(config.feed.seed, Some(9));
        assert_eq!(config.feed.base_price, 100);
    }

    #[test]
    fn test_rejects_duplicate_instruments() {
        let result = SessionConfig::from_toml_str(r#"instruments = ["SPY", "SPY"]"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_zero_checkpoint_interval() {
        let result = SessionConfig::from_toml_str("[engine]\ncheckpoint_interval = 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_overflowing_feed_price() {
        let result = SessionConfig::from_toml_str("[feed]\nseed = 1\nbase_price = 4294967295\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let result =
            SessionConfig::from_toml_str("[feed]\nbase_price = 4294967200\nbase_spread = 50\n");
        assert!(result.is_ok());
    }

    #[test]
    fn test_rejects_session_longer_than_a_day() {
        let result = SessionConfig::from_toml_str("tick_interval_minutes = 4294967295\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let result =
            SessionConfig::from_toml_str("ticks_per_session = 289\ntick_interval_minutes = 5\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let result =
            SessionConfig::from_toml_str("ticks_per_session = 288\ntick_interval_minutes = 5\n");
        assert!(result.is_ok());
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let result = SessionConfig::from_toml_str("initial_balance = [");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_result_summary() {
        let result = SessionResult {
            initial_balance: dec!(100000),
            final_balance: dec!(98765.43),
            ticks: 72,
            trading_ticks: vec![],
            settlement: SettlementReport::default(),
            final_prices: vec![],
            snapshot: PortfolioSnapshot {
                cash: dec!(98765.43),
                positions: vec![],
            },
        };

        assert_eq!(result.profit_loss(), dec!(-1234.57));
        assert!((result.return_pct() + 1.23457).abs() < 1e-9);
        let summary = result.summary();
        assert!(summary.contains("Final Balance: $98765.43"));
        assert!(summary.contains("Loss: $1234.57"));
    }

    #[test]
    fn test_seeded_session_settles_flat() {
        let config = SessionConfig::default().with_seed(42);
        let result = Session::new(config).unwrap().run().unwrap();

        assert_eq!(result.ticks, 72);
        assert_eq!(result.final_prices.len(), 5);
        assert!(result
            .snapshot
            .positions
            .iter()
            .all(|p| p.shares == 0 && p.open_options == 0));
        assert_eq!(result.final_balance, result.settlement.final_cash);
    }
}
