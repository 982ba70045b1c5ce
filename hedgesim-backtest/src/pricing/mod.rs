//! Option valuation.
//!
//! Provides:
//! - Closed-form Black-Scholes values for European calls and puts
//! - Standard normal CDF via the complementary error function

pub mod black_scholes;

pub use black_scholes::{norm_cdf, value, BlackScholes};
