//! Intraday trading engine.
//!
//! This module drives one simulated trading session:
//! - Moving-average entry and exit rules (engine)
//! - Limit-price slippage
//! - Protective option hedges priced with Black-Scholes
//! - End-of-session settlement
//! - Session replay over the synthetic feed

pub mod engine;
pub mod session;
pub mod settlement;
pub mod slippage;
pub mod trade;

pub use engine::{EngineConfig, EngineError, HedgeConfig, IntradayEngine};
pub use session::{ConfigError, Session, SessionConfig, SessionResult};
pub use settlement::{settle_portfolio, SettlementReport};
pub use slippage::LimitSlippage;
pub use trade::{ExitReason, TickReport, TradeAction, TradeEvent};
