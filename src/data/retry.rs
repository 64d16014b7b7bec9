use std::time::Duration;

use crate::config::BinanceApiConfig;

/// Bounds for provider calls: each call gets `call_timeout`, transient
/// failures are retried `max_retries` times with a doubling, capped backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&BinanceApiConfig::default())
    }
}

impl From<&BinanceApiConfig> for RetryPolicy {
    fn from(config: &BinanceApiConfig) -> Self {
        Self {
            max_retries: config.retries,
            initial_backoff: Duration::from_millis(config.backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            call_timeout: config.call_timeout(),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based): 1s, 2s, 4s, ... capped.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1_u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}
