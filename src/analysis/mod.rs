mod beta_estimator;
mod market_scan;
mod pattern_aggregator;
mod pattern_analysis;
mod returns;
mod session;
mod window_bucketer;

pub use beta_estimator::estimate_betas;
pub use market_scan::{SymbolBeta, rank_market, symbol_beta_pure};
pub use pattern_aggregator::{
    AggregationSettings, aggregate_windows, build_ranked_result, current_window, rank_windows,
};
pub use pattern_analysis::pattern_analysis_pure;
pub use returns::compute_returns;
pub use session::TradingSession;
pub use window_bucketer::WindowBucketer;
