use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::utils::TimeUtils;

/// Trading-session filter applied to aligned series before returns.
/// Bounds are UTC and inclusive at both ends.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    clap::ValueEnum,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TradingSession {
    #[default]
    All,
    Us,
    Eu,
    Apac,
}

impl TradingSession {
    /// (start, end) as minutes after UTC midnight.
    pub fn bounds_minutes(self) -> Option<(i64, i64)> {
        match self {
            TradingSession::All => None,
            TradingSession::Us => Some((13 * 60 + 30, 20 * 60)),
            TradingSession::Eu => Some((7 * 60, 15 * 60 + 30)),
            TradingSession::Apac => Some((0, 7 * 60)),
        }
    }

    pub fn contains(self, ts_ms: i64) -> bool {
        let Some((start, end)) = self.bounds_minutes() else {
            return true;
        };
        let ms_of_day = ts_ms.rem_euclid(TimeUtils::MS_IN_D);
        (start * TimeUtils::MS_IN_MIN..=end * TimeUtils::MS_IN_MIN).contains(&ms_of_day)
    }
}
