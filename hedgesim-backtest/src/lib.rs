pub mod backtest;
pub mod data;
pub mod portfolio;
pub mod pricing;
pub mod signal;

// Re-export commonly used types
pub use backtest::{
    EngineConfig, EngineError, HedgeConfig, IntradayEngine, Session, SessionConfig,
    SessionResult, SettlementReport, TickReport, TradeEvent,
};
pub use data::{FeedConfig, OptionType, PriceSample, RandomWalkFeed};
pub use portfolio::{OptionContract, Portfolio, PortfolioSnapshot, Position};
pub use pricing::BlackScholes;
pub use signal::{SignalBook, SignalWindow};
