//! Portfolio state: one shared cash balance and a position per instrument.
//!
//! Owned exclusively by the engine. Every debit goes through
//! [`Portfolio::try_debit`], so the engine can never overdraw the account.

pub mod position;

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use position::{ExercisedOption, OptionContract, Position};

/// Read-only view of one position for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub symbol: String,
    pub shares: u64,
    pub avg_cost: Decimal,
    pub open_options: usize,
}

/// Read-only view of the whole portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub cash: Decimal,
    pub positions: Vec<PositionSnapshot>,
}

/// Cash plus per-instrument positions for a fixed instrument set.
#[derive(Debug, Clone)]
pub struct Portfolio {
    cash: Decimal,
    symbols: Vec<String>,
    positions: HashMap<String, Position>,
}

impl Portfolio {
    pub fn new(initial_cash: Decimal, symbols: &[String]) -> Self {
        let positions = symbols
            .iter()
            .map(|s| (s.clone(), Position::default()))
            .collect();
        Self {
            cash: initial_cash,
            symbols: symbols.to_vec(),
            positions,
        }
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    /// Instruments in configured order.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn instrument_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn can_afford(&self, amount: Decimal) -> bool {
        self.cash >= amount
    }

    /// Debit `amount` if the balance covers it. Returns whether it was applied.
    pub fn try_debit(&mut self, amount: Decimal) -> bool {
        if !self.can_afford(amount) {
            return false;
        }
        self.cash -= amount;
        true
    }

    pub fn credit(&mut self, amount: Decimal) {
        self.cash += amount;
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn position_mut(&mut self, symbol: &str) -> Option<&mut Position> {
        self.positions.get_mut(symbol)
    }

    /// Positions in configured order.
    pub fn positions(&self) -> impl Iterator<Item = (&str, &Position)> {
        self.symbols
            .iter()
            .filter_map(|s| self.positions.get(s).map(|p| (s.as_str(), p)))
    }

    /// True once no instrument holds shares or contracts.
    pub fn is_flat(&self) -> bool {
        self.positions.values().all(Position::is_flat)
    }

    pub fn snapshot(&self) -> PortfolioSnapshot {
        PortfolioSnapshot {
            cash: self.cash,
            positions: self
                .positions()
                .map(|(symbol, p)| PositionSnapshot {
                    symbol: symbol.to_string(),
                    shares: p.shares,
                    avg_cost: p.avg_cost,
                    open_options: p.options.len(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn symbols() -> Vec<String> {
        vec!["TSLA".to_string(), "AAPL".to_string()]
    }

    #[test]
    fn test_debit_requires_funds() {
        let mut portfolio = Portfolio::new(dec!(100), &symbols());
        assert!(!portfolio.try_debit(dec!(100.01)));
        assert_eq!(portfolio.cash(), dec!(100));

        assert!(portfolio.try_debit(dec!(100)));
        assert_eq!(portfolio.cash(), Decimal::ZERO);
    }

    #[test]
    fn test_credit() {
        let mut portfolio = Portfolio::new(dec!(10), &symbols());
        portfolio.credit(dec!(2.50));
        assert_eq!(portfolio.cash(), dec!(12.50));
    }

    #[test]
    fn test_snapshot_in_configured_order() {
        let mut portfolio = Portfolio::new(dec!(1000), &symbols());
        portfolio
            .position_mut("AAPL")
            .unwrap()
            .open_or_add(3, dec!(150));

        let snapshot = portfolio.snapshot();
        assert_eq!(snapshot.cash, dec!(1000));
        assert_eq!(snapshot.positions[0].symbol, "TSLA");
        assert_eq!(snapshot.positions[1].shares, 3);
        assert_eq!(snapshot.positions[1].avg_cost, dec!(150));
        assert_eq!(snapshot.positions[0].shares, 0);
    }

    #[test]
    fn test_unknown_instrument() {
        let portfolio = Portfolio::new(dec!(1000), &symbols());
        assert!(portfolio.position("GOOGL").is_none());
        assert!(!portfolio.contains("GOOGL"));
        assert!(portfolio.is_flat());
    }
}
