//! Black-Scholes valuation for European options.
//!
//! Prices the protective hedges opened next to every share purchase.
//! No dividend term: the hedged instruments are treated as non-paying
//! over an intraday horizon.
//!
//! Degenerate input:
//! - volatility == 0 -> intrinsic value, no division by zero

use std::f64::consts::SQRT_2;

use statrs::function::erf::erfc;

use crate::data::OptionType;

/// Standard normal CDF, `0.5 * erfc(-x / sqrt(2))`.
///
/// Stable in both tails, exactly 0.5 at the origin.
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Value a European option.
///
/// Caller guarantees `spot > 0`, `strike > 0` and `time > 0`.
pub fn value(
    opt_type: OptionType,
    spot: f64,
    strike: f64,
    time: f64,
    rate: f64,
    vol: f64,
) -> f64 {
    BlackScholes::new(rate).price(spot, strike, time, vol, opt_type)
}

/// Black-Scholes calculator at a fixed risk-free rate.
#[derive(Debug, Clone, Copy)]
pub struct BlackScholes {
    /// Risk-free interest rate, in the same time unit as maturity.
    pub rate: f64,
}

impl Default for BlackScholes {
    fn default() -> Self {
        Self { rate: 0.01 }
    }
}

impl BlackScholes {
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }

    fn d1(&self, spot: f64, strike: f64, time: f64, vol: f64) -> f64 {
        let numerator = (spot / strike).ln() + (self.rate + 0.5 * vol * vol) * time;
        numerator / (vol * time.sqrt())
    }

    fn d2(&self, spot: f64, strike: f64, time: f64, vol: f64) -> f64 {
        self.d1(spot, strike, time, vol) - vol * time.sqrt()
    }

    /// Calculate call option price.
    pub fn call_price(&self, spot: f64, strike: f64, time: f64, vol: f64) -> f64 {
        if vol == 0.0 {
            return (spot - strike).max(0.0);
        }

        let d1 = self.d1(spot, strike, time, vol);
        let d2 = self.d2(spot, strike, time, vol);

        spot * norm_cdf(d1) - strike * (-self.rate * time).exp() * norm_cdf(d2)
    }

    /// Calculate put option price.
    pub fn put_price(&self, spot: f64, strike: f64, time: f64, vol: f64) -> f64 {
        if vol == 0.0 {
            return (strike - spot).max(0.0);
        }

        let d1 = self.d1(spot, strike, time, vol);
        let d2 = self.d2(spot, strike, time, vol);

        strike * (-self.rate * time).exp() * norm_cdf(-d2) - spot * norm_cdf(-d1)
    }

    /// Calculate option price based on type.
    pub fn price(&self, spot: f64, strike: f64, time: f64, vol: f64, opt_type: OptionType) -> f64 {
        match opt_type {
            OptionType::Call => self.call_price(spot, strike, time, vol),
            OptionType::Put => self.put_price(spot, strike, time, vol),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_norm_cdf_midpoint() {
        assert_eq!(norm_cdf(0.0), 0.5);
    }

    #[test]
    fn test_norm_cdf_monotonic() {
        let mut prev = norm_cdf(-8.0);
        let mut x = -8.0;
        while x <= 8.0 {
            let current = norm_cdf(x);
            assert!(current >= prev, "cdf decreased at x={}", x);
            assert!((0.0..=1.0).contains(&current));
            prev = current;
            x += 0.05;
        }
    }

    #[test]
    fn test_norm_cdf_known_values() {
        assert_relative_eq!(norm_cdf(1.0), 0.841_344_746, epsilon = 1e-8);
        assert_relative_eq!(norm_cdf(-1.96), 0.024_997_895, epsilon = 1e-8);
    }

    #[test]
    fn test_zero_vol_is_intrinsic() {
        let cases = [(100.0, 90.0), (90.0, 100.0), (100.0, 100.0), (57.31, 61.2)];
        for (spot, strike) in cases {
            let call = value(OptionType::Call, spot, strike, 0.1, 0.01, 0.0);
            let put = value(OptionType::Put, spot, strike, 0.1, 0.01, 0.0);
            assert_eq!(call, (spot - strike).max(0.0));
            assert_eq!(put, (strike - spot).max(0.0));
        }
    }

    #[test]
    fn test_black_scholes_call_price() {
        let bs = BlackScholes::new(0.05);
        // S=100, K=100, T=1, vol=0.20 -> textbook value 10.4506
        let price = bs.call_price(100.0, 100.0, 1.0, 0.20);
        assert_relative_eq!(price, 10.4506, epsilon = 1e-3);
    }

    #[test]
    fn test_black_scholes_put_price() {
        let bs = BlackScholes::new(0.05);
        let price = bs.put_price(100.0, 100.0, 1.0, 0.20);
        assert_relative_eq!(price, 5.5735, epsilon = 1e-3);
    }

    #[test]
    fn test_put_call_parity() {
        let bs = BlackScholes::new(0.01);
        let (spot, strike, time, vol) = (90.0, 94.5, 0.1, 0.20);

        let call = bs.call_price(spot, strike, time, vol);
        let put = bs.put_price(spot, strike, time, vol);

        // C - P = S - K*e^(-rT)
        let parity_rhs = spot - strike * (-bs.rate * time).exp();
        assert_relative_eq!(call - put, parity_rhs, epsilon = 1e-9);
    }

    #[test]
    fn test_hedge_premiums_out_of_the_money() {
        // The strategy's hedge pair: 5% OTM either side, short maturity
        let call = value(OptionType::Call, 90.0, 94.5, 0.1, 0.01, 0.20);
        let put = value(OptionType::Put, 90.0, 85.5, 0.1, 0.01, 0.20);
        assert!(call > 0.0 && call < 4.5);
        assert!(put > 0.0 && put < 4.5);
    }
}
