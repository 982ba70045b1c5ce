//! Moving-average signal state.

pub mod window;

pub use window::{SignalBook, SignalWindow};
