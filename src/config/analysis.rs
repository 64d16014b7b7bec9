//! Runtime analysis settings (defaults come from `constants`)

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::AggregateMethod;
use crate::config::constants::{self, pattern, window};
use crate::config::universe::UNIVERSE;
use crate::error::BetaError;
use crate::utils::{TimeUtils, duration_to_candles};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub interval_ms: i64,
    pub benchmark: String,
    /// Rolling window in returns. `None` derives it from the range length.
    pub window_len: Option<usize>,
    pub slot_minutes: u32,
    /// Fixed offset applied to every timestamp before bucketing.
    pub utc_offset_minutes: i32,
    pub min_samples: usize,
    pub top_k: usize,
    pub aggregate: AggregateMethod,
    /// Clip betas at mean +- k sigma before summarising. `None` disables.
    pub outlier_sigma: Option<f64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            interval_ms: constants::BASE_INTERVAL.as_millis() as i64,
            benchmark: UNIVERSE.benchmark.to_string(),
            window_len: None,
            slot_minutes: pattern::SLOT_MINUTES,
            utc_offset_minutes: pattern::UTC_OFFSET_MINUTES,
            min_samples: pattern::MIN_SAMPLES,
            top_k: pattern::TOP_K,
            aggregate: pattern::AGGREGATE,
            outlier_sigma: Some(pattern::OUTLIER_SIGMA),
        }
    }
}

impl AnalysisConfig {
    /// Rejects settings that would make any later stage meaningless.
    pub fn validate(&self) -> Result<(), BetaError> {
        if self.interval_ms <= 0 {
            return Err(BetaError::InvalidConfiguration(format!(
                "sampling interval must be positive, got {}ms",
                self.interval_ms
            )));
        }
        if self.window_len == Some(0) {
            return Err(BetaError::InvalidConfiguration(
                "rolling window must be at least 1 return".to_string(),
            ));
        }
        let minutes_per_day = (TimeUtils::MS_IN_D / TimeUtils::MS_IN_MIN) as u32;
        if self.slot_minutes == 0 || minutes_per_day % self.slot_minutes != 0 {
            return Err(BetaError::InvalidConfiguration(format!(
                "slot duration must be positive and divide 24h evenly, got {} minutes",
                self.slot_minutes
            )));
        }
        if self.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(BetaError::InvalidConfiguration(format!(
                "utc offset out of range: {} minutes",
                self.utc_offset_minutes
            )));
        }
        if self.top_k == 0 {
            return Err(BetaError::InvalidConfiguration(
                "top-k must be at least 1".to_string(),
            ));
        }
        if let Some(k) = self.outlier_sigma
            && !(k.is_finite() && k > 0.0)
        {
            return Err(BetaError::InvalidConfiguration(format!(
                "outlier sigma must be positive, got {}",
                k
            )));
        }
        if self.benchmark.trim().is_empty() {
            return Err(BetaError::InvalidConfiguration(
                "benchmark symbol is empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Window length in returns for a range of `range_ms`.
    pub fn resolve_window(&self, range_ms: i64) -> usize {
        if let Some(w) = self.window_len {
            return w;
        }
        let range = Duration::from_millis(range_ms.max(0) as u64);
        let span = if range <= window::SHORT_RANGE {
            window::SHORT_WINDOW
        } else if range <= window::MEDIUM_RANGE {
            window::MEDIUM_WINDOW
        } else {
            window::LONG_WINDOW
        };
        duration_to_candles(span, self.interval_ms).max(1)
    }
}
