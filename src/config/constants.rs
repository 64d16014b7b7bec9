use std::time::Duration;

// Top Level Constants
pub const BASE_INTERVAL: Duration = Duration::from_secs(5 * 60); // 5 minutes. Every series is sampled at this rate.

pub mod pattern {
    use crate::config::AggregateMethod;

    /// Width of one recurring time-of-day slot.
    pub const SLOT_MINUTES: u32 = 60;
    pub const UTC_OFFSET_MINUTES: i32 = 0;
    /// Buckets with fewer samples than this report "insufficient data".
    pub const MIN_SAMPLES: usize = 5;
    pub const TOP_K: usize = 50;
    pub const AGGREGATE: AggregateMethod = AggregateMethod::Mean;
    pub const OUTLIER_SIGMA: f64 = 3.0;
}

pub mod window {
    use std::time::Duration;

    // Automatic rolling window, chosen from the length of the requested range.
    pub const SHORT_RANGE: Duration = Duration::from_secs(86_400);
    pub const MEDIUM_RANGE: Duration = Duration::from_secs(7 * 86_400);

    pub const SHORT_WINDOW: Duration = Duration::from_secs(3_600);
    pub const MEDIUM_WINDOW: Duration = Duration::from_secs(4 * 3_600);
    pub const LONG_WINDOW: Duration = Duration::from_secs(86_400);
}

pub mod market {
    /// Maximum symbols analysed at once during a market-wide scan.
    pub const SCAN_CONCURRENCY: usize = 8;
    pub const TOP_K: usize = 50;
}
