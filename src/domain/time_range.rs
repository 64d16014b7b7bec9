use serde::{Deserialize, Serialize};

use crate::error::BetaError;
use crate::utils::{TimeUtils, epoch_ms_to_utc};

/// Inclusive millisecond range `[start_ms, end_ms]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl TimeRange {
    pub fn new(start_ms: i64, end_ms: i64) -> Result<Self, BetaError> {
        if start_ms >= end_ms {
            return Err(BetaError::InvalidConfiguration(format!(
                "range start {} must be before end {}",
                epoch_ms_to_utc(start_ms),
                epoch_ms_to_utc(end_ms)
            )));
        }
        Ok(Self { start_ms, end_ms })
    }

    pub fn duration_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }

    pub fn contains(&self, ts_ms: i64) -> bool {
        (self.start_ms..=self.end_ms).contains(&ts_ms)
    }

    pub fn covers(&self, other: &TimeRange) -> bool {
        self.start_ms <= other.start_ms && other.end_ms <= self.end_ms
    }

    /// Smallest range spanning both.
    pub fn union(&self, other: &TimeRange) -> TimeRange {
        TimeRange {
            start_ms: self.start_ms.min(other.start_ms),
            end_ms: self.end_ms.max(other.end_ms),
        }
    }

    /// Sub-ranges of `self` that `coverage` does not hold.
    ///
    /// The pieces always touch the coverage, so fetching them and taking the
    /// union keeps a single contiguous range even when `self` is disjoint.
    pub fn missing_from(&self, coverage: Option<&TimeRange>) -> Vec<TimeRange> {
        let Some(cov) = coverage else {
            return vec![*self];
        };
        let mut missing = Vec::with_capacity(2);
        if self.start_ms < cov.start_ms {
            missing.push(TimeRange {
                start_ms: self.start_ms,
                end_ms: cov.start_ms - 1,
            });
        }
        if self.end_ms > cov.end_ms {
            missing.push(TimeRange {
                start_ms: cov.end_ms + 1,
                end_ms: self.end_ms,
            });
        }
        missing
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{} .. {}]",
            epoch_ms_to_utc(self.start_ms),
            epoch_ms_to_utc(self.end_ms)
        )
    }
}

/// Named look-back windows for market-wide requests.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum RangePreset {
    #[value(name = "24h")]
    #[default]
    Day,
    #[value(name = "7d")]
    Week,
    #[value(name = "30d")]
    Month,
}

impl RangePreset {
    pub fn duration_ms(self) -> i64 {
        match self {
            RangePreset::Day => TimeUtils::MS_IN_D,
            RangePreset::Week => TimeUtils::MS_IN_W,
            RangePreset::Month => TimeUtils::MS_IN_1_M,
        }
    }

    /// The preset's window ending at `now_ms`.
    pub fn ending_at(self, now_ms: i64) -> TimeRange {
        TimeRange {
            start_ms: now_ms - self.duration_ms(),
            end_ms: now_ms,
        }
    }
}

impl std::fmt::Display for RangePreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RangePreset::Day => "24h",
            RangePreset::Week => "7d",
            RangePreset::Month => "30d",
        };
        write!(f, "{}", label)
    }
}
