//! Trade events produced by the engine.
//!
//! Every cash movement the engine makes is reported as one event:
//! - Share entries and exits (profit target, drop forecast, end of session)
//! - Hedge contracts opened
//! - Hedge contracts exercised or expired

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::portfolio::OptionContract;

/// Reason for liquidating shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    /// Price above the moving average and the cost basis margin.
    ProfitTarget,
    /// Price fell far enough below the moving average at a checkpoint.
    DropForecast,
    /// Forced liquidation at settlement.
    EndOfSession,
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TradeAction {
    /// Shares bought at the buy limit.
    Buy { qty: u64, price: Decimal },
    /// All shares sold.
    Sell {
        qty: u64,
        price: Decimal,
        reason: ExitReason,
    },
    /// Hedge contract bought for its premium.
    OptionOpened { contract: OptionContract },
    /// Hedge contract paid out.
    OptionExercised {
        contract: OptionContract,
        payout: Decimal,
        at_settlement: bool,
    },
    /// Hedge contract cleared worthless at settlement.
    OptionExpired { contract: OptionContract },
}

/// A single event on one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub symbol: String,
    pub action: TradeAction,
}

impl TradeEvent {
    pub fn new(symbol: &str, action: TradeAction) -> Self {
        Self {
            symbol: symbol.to_string(),
            action,
        }
    }

    /// Signed effect of this event on the cash balance.
    pub fn cash_delta(&self) -> Decimal {
        match &self.action {
            TradeAction::Buy { qty, price } => -(Decimal::from(*qty) * *price),
            TradeAction::Sell { qty, price, .. } => Decimal::from(*qty) * *price,
            TradeAction::OptionOpened { contract } => -contract.premium,
            TradeAction::OptionExercised { payout, .. } => *payout,
            TradeAction::OptionExpired { .. } => Decimal::ZERO,
        }
    }
}

impl fmt::Display for TradeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = &self.symbol;
        match &self.action {
            TradeAction::Buy { qty, price } => {
                write!(f, "BUY {} shares of {} at ${:.2}", qty, symbol, price)
            }
            TradeAction::Sell { qty, price, reason } => match reason {
                ExitReason::ProfitTarget => {
                    write!(f, "SELL {} shares of {} at ${:.2}", qty, symbol, price)
                }
                ExitReason::DropForecast => write!(
                    f,
                    "ALERT SELL {} shares of {} at ${:.2} due to drop forecast",
                    qty, symbol, price
                ),
                ExitReason::EndOfSession => {
                    write!(f, "EOD SELL {} shares of {} at ${:.2}", qty, symbol, price)
                }
            },
            TradeAction::OptionOpened { contract } => write!(
                f,
                "BUY {} OPTION on {} strike: ${:.2} premium: ${:.2}",
                contract.option_type, symbol, contract.strike, contract.premium
            ),
            TradeAction::OptionExercised {
                contract,
                payout,
                at_settlement: false,
            } => write!(
                f,
                "ALERT EXIT {} OPTION on {} payout: ${:.2}",
                contract.option_type, symbol, payout
            ),
            TradeAction::OptionExercised {
                contract,
                payout,
                at_settlement: true,
            } => write!(
                f,
                "OPTION PAYOUT for {} strike ${:.2}: ${:.2}",
                symbol, contract.strike, payout
            ),
            TradeAction::OptionExpired { contract } => write!(
                f,
                "{} OPTION on {} strike ${:.2} expired worthless",
                contract.option_type, symbol, contract.strike
            ),
        }
    }
}

/// Outcome of one `on_tick` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub symbol: String,
    pub tick: u32,
    pub price: Decimal,
    /// Moving average, `None` while the window is cold.
    pub sma: Option<Decimal>,
    pub events: Vec<TradeEvent>,
}

impl TickReport {
    pub fn is_warm(&self) -> bool {
        self.sma.is_some()
    }

    pub fn cash_delta(&self) -> Decimal {
        self.events.iter().map(TradeEvent::cash_delta).sum()
    }
}
