mod core;
mod messages;

pub use self::core::BetaEngine;
pub use messages::{MarketRequest, PatternRequest};
