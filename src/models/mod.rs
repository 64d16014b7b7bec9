mod beta;
mod series;

pub use beta::{
    BetaSample, BetaSummary, DAY_NAMES, MarketEntry, MarketFailure, MarketReport, PatternReport,
    RankedEntry, RankedResult, WindowAggregate, WindowKey,
};
pub use series::{PriceSeries, ReturnSeries};
