//! Market data: shared types and the synthetic intraday feed.

pub mod feed;
pub mod types;

pub use feed::{FeedConfig, RandomWalkFeed};
pub use types::{OptionType, PriceSample};
