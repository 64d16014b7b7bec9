//! Debugging feature flags.

pub struct LogFlags {
    /// Log every provider page request and retry.
    pub log_fetcher: bool,

    /// Log cache coverage decisions (hit, partial, miss) and merges.
    pub log_cache: bool,

    /// Activate trace_time macro (for cool scope-level timing)
    pub log_performance: bool,

    /// Log per-symbol outcomes during market scans.
    pub log_market_scan: bool,
}

pub const DF: LogFlags = LogFlags {
    log_fetcher: false,
    log_cache: true,
    log_performance: false,
    log_market_scan: false,
};
