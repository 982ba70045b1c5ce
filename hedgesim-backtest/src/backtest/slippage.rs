//! Limit prices derived from the observed price.
//!
//! | Side | Limit                    |
//! |------|--------------------------|
//! | Buy  | `price * (1 - slippage)` |
//! | Sell | `price * (1 + slippage)` |
//!
//! Entries fill at the buy limit, profit exits at the sell limit. Risk exits
//! and settlement ignore slippage and fill at the raw price.

use rust_decimal::Decimal;

/// Fixed-percentage limit model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimitSlippage {
    pub pct: Decimal,
}

impl Default for LimitSlippage {
    fn default() -> Self {
        Self {
            pct: Decimal::new(1, 2),
        }
    }
}

impl LimitSlippage {
    pub fn new(pct: Decimal) -> Self {
        Self { pct }
    }

    pub fn buy_limit(&self, price: Decimal) -> Decimal {
        price * (Decimal::ONE - self.pct)
    }

    pub fn sell_limit(&self, price: Decimal) -> Decimal {
        price * (Decimal::ONE + self.pct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_limits() {
        let slippage = LimitSlippage::default();
        assert_eq!(slippage.buy_limit(dec!(90)), dec!(89.10));
        assert_eq!(slippage.sell_limit(dec!(105)), dec!(106.05));
    }
}
