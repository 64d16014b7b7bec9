use crate::config::AnalysisConfig;
use crate::error::BetaError;
use crate::models::WindowKey;
use crate::utils::TimeUtils;

// 1970-01-01 was a Thursday; with Monday = 0 that is day 3.
const EPOCH_WEEKDAY: i64 = 3;

/// Maps timestamps onto recurring (day-of-week, time-of-day slot) keys.
///
/// Pure epoch arithmetic at a fixed UTC offset, so every timestamp in a run
/// (history and "now" alike) goes through the same mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBucketer {
    slot_minutes: u32,
    slot_ms: i64,
    offset_ms: i64,
}

impl WindowBucketer {
    pub fn new(slot_minutes: u32, utc_offset_minutes: i32) -> Result<Self, BetaError> {
        let minutes_per_day = (TimeUtils::MS_IN_D / TimeUtils::MS_IN_MIN) as u32;
        if slot_minutes == 0 || minutes_per_day % slot_minutes != 0 {
            return Err(BetaError::InvalidConfiguration(format!(
                "slot duration must be positive and divide 24h evenly, got {} minutes",
                slot_minutes
            )));
        }
        Ok(Self {
            slot_minutes,
            slot_ms: slot_minutes as i64 * TimeUtils::MS_IN_MIN,
            offset_ms: utc_offset_minutes as i64 * TimeUtils::MS_IN_MIN,
        })
    }

    pub fn from_config(config: &AnalysisConfig) -> Result<Self, BetaError> {
        Self::new(config.slot_minutes, config.utc_offset_minutes)
    }

    pub fn slot_minutes(&self) -> u32 {
        self.slot_minutes
    }

    pub fn slots_per_day(&self) -> u16 {
        (TimeUtils::MS_IN_D / self.slot_ms) as u16
    }

    pub fn key_for(&self, ts_ms: i64) -> WindowKey {
        let local = ts_ms + self.offset_ms;
        let day_index = local.div_euclid(TimeUtils::MS_IN_D);
        let ms_of_day = local.rem_euclid(TimeUtils::MS_IN_D);
        WindowKey {
            day: (day_index + EPOCH_WEEKDAY).rem_euclid(7) as u8,
            slot: (ms_of_day / self.slot_ms) as u16,
        }
    }
}
