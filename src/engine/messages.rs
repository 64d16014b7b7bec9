use crate::analysis::TradingSession;
use crate::domain::TimeRange;

/// A cross-symbol beta ranking over one range.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketRequest {
    pub symbols: Vec<String>,
    pub range: TimeRange,
    pub session: TradingSession,
    pub top_k: usize,
}

/// Recurring-window pattern analysis for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternRequest {
    pub symbol: String,
    pub range: TimeRange,
    pub session: TradingSession,
}
