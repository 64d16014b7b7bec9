// Domain types and value objects
mod candle;
mod pair_interval;
mod time_range;

// Re-export commonly used types to the world
pub use candle::Candle;
pub use pair_interval::PairInterval;
pub use time_range::{RangePreset, TimeRange};
