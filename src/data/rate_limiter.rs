use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::utils::{TimeUtils, now_timestamp_ms};

/// Shared request-weight budget, reset at every wall-clock minute.
#[derive(Clone)]
pub struct GlobalRateLimiter {
    inner: Arc<Mutex<WeightWindow>>,
}

struct WeightWindow {
    used_weight: u32,
    // Minutes since epoch that `used_weight` belongs to
    minute_idx: i64,
    limit: u32,
}

impl WeightWindow {
    /// Takes `cost` if the current minute has room, otherwise returns how
    /// long to wait for the next minute to start.
    fn try_take(&mut self, cost: u32, now_ms: i64) -> Option<Duration> {
        let now_idx = now_ms.div_euclid(TimeUtils::MS_IN_MIN);
        if now_idx > self.minute_idx {
            self.used_weight = 0;
            self.minute_idx = now_idx;
        }

        // A single call heavier than the whole budget still goes through on an empty minute
        if self.used_weight == 0 || self.used_weight + cost <= self.limit {
            self.used_weight += cost;
            return None;
        }

        let into_minute = now_ms.rem_euclid(TimeUtils::MS_IN_MIN);
        // land safely inside the next minute
        let wait_ms = TimeUtils::MS_IN_MIN - into_minute + 100;
        Some(Duration::from_millis(wait_ms as u64))
    }
}

impl GlobalRateLimiter {
    pub fn new(limit: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(WeightWindow {
                used_weight: 0,
                minute_idx: now_timestamp_ms().div_euclid(TimeUtils::MS_IN_MIN),
                limit,
            })),
        }
    }

    /// Waits until `cost` weight is available, then spends it.
    pub async fn acquire(&self, cost: u32, context: &str) {
        loop {
            let (wait, used, limit) = {
                let mut guard = self.inner.lock().await;
                match guard.try_take(cost, now_timestamp_ms()) {
                    None => return,
                    Some(wait) => (wait, guard.used_weight, guard.limit),
                }
            };

            log::warn!(
                "🛑 Rate limit saturated for [{}]. Used: {}/{}. Waiting {:.1}s...",
                context,
                used,
                limit,
                wait.as_secs_f64()
            );

            tokio::time::sleep(wait).await;
        }
    }
}
