//! Per-instrument holdings: shares, cost basis and open option hedges.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data::OptionType;

/// A hedge contract bought alongside a share purchase.
///
/// Immutable once opened; removed the first time its exercise condition
/// is observed to hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    /// Option type (call/put).
    pub option_type: OptionType,
    /// Strike price.
    pub strike: Decimal,
    /// Premium paid at open.
    pub premium: Decimal,
    /// Time to maturity at open, in rate units.
    pub time_to_maturity: f64,
}

impl OptionContract {
    pub fn is_exercisable(&self, price: Decimal) -> bool {
        self.option_type.is_exercisable(price, self.strike)
    }

    pub fn payout(&self, price: Decimal) -> Decimal {
        self.option_type.payout(price, self.strike)
    }
}

/// A contract removed by a sweep, with its realized payout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExercisedOption {
    pub contract: OptionContract,
    pub payout: Decimal,
}

/// Holdings for one instrument.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Position {
    /// Shares held.
    pub shares: u64,
    /// Weighted average cost, zero whenever `shares == 0`.
    pub avg_cost: Decimal,
    /// Open hedge contracts.
    pub options: Vec<OptionContract>,
}

impl Position {
    pub fn has_shares(&self) -> bool {
        self.shares > 0
    }

    pub fn is_flat(&self) -> bool {
        self.shares == 0 && self.options.is_empty()
    }

    /// Add shares, re-weighting the average cost.
    pub fn open_or_add(&mut self, qty: u64, price: Decimal) {
        debug_assert!(qty > 0, "open_or_add requires a positive quantity");
        if qty == 0 {
            return;
        }
        let old_qty = Decimal::from(self.shares);
        let add_qty = Decimal::from(qty);
        self.avg_cost = (self.avg_cost * old_qty + price * add_qty) / (old_qty + add_qty);
        self.shares += qty;
    }

    /// Zero the share count and cost basis, returning what was held.
    pub fn close_all(&mut self) -> u64 {
        let qty = self.shares;
        self.shares = 0;
        self.avg_cost = Decimal::ZERO;
        qty
    }

    pub fn add_option(&mut self, contract: OptionContract) {
        self.options.push(contract);
    }

    /// Remove and return every contract exercisable at `price`.
    ///
    /// Contracts that do not qualify stay in place, so a second sweep at the
    /// same price returns nothing.
    pub fn sweep_options(&mut self, price: Decimal) -> Vec<ExercisedOption> {
        let (exercised, remaining): (Vec<_>, Vec<_>) = self
            .options
            .drain(..)
            .partition(|c| c.is_exercisable(price));
        self.options = remaining;

        exercised
            .into_iter()
            .map(|contract| {
                let payout = contract.payout(price);
                ExercisedOption { contract, payout }
            })
            .collect()
    }

    /// Remove every contract regardless of moneyness.
    pub fn take_options(&mut self) -> Vec<OptionContract> {
        std::mem::take(&mut self.options)
    }
}
