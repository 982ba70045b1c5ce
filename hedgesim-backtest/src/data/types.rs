//! Core data types shared by the feed, the pricing model and the engine.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Option type (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "CALL",
            Self::Put => "PUT",
        }
    }

    /// Whether an option of this type with `strike` is exercisable at `price`.
    ///
    /// Strict inequality: an at-the-money contract is not exercised.
    pub fn is_exercisable(&self, price: Decimal, strike: Decimal) -> bool {
        match self {
            Self::Call => price > strike,
            Self::Put => price < strike,
        }
    }

    /// Intrinsic payout at `price`, zero when not exercisable.
    pub fn payout(&self, price: Decimal, strike: Decimal) -> Decimal {
        if !self.is_exercisable(price, strike) {
            return Decimal::ZERO;
        }
        match self {
            Self::Call => price - strike,
            Self::Put => strike - price,
        }
    }
}

impl FromStr for OptionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "C" | "CALL" => Ok(Self::Call),
            "P" | "PUT" => Ok(Self::Put),
            other => Err(format!("unknown option type '{}'", other)),
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One price observation handed to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    /// Instrument symbol (e.g., "AAPL")
    pub symbol: String,

    /// Price rounded to cents, always positive
    pub price: Decimal,

    /// Tick index within the session, starting at 0
    pub tick: u32,

    /// Wall-clock time of the tick
    pub time: NaiveTime,
}
