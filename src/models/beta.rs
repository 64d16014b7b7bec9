use {
    crate::{
        analysis::TradingSession,
        config::{AggregateMethod, Beta, ChangePct, RiskLevel},
        domain::TimeRange,
    },
    serde::{Deserialize, Serialize},
};

pub const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// One rolling-window beta, stamped with the timestamp of its last return.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetaSample {
    pub timestamp_ms: i64,
    pub beta: f64,
    pub window_len: usize,
    pub sample_count: usize,
}

/// Recurring calendar slot. Orders Monday first, then by slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WindowKey {
    /// 0 = Monday .. 6 = Sunday
    pub day: u8,
    pub slot: u16,
}

impl WindowKey {
    pub fn day_name(&self) -> &'static str {
        DAY_NAMES[(self.day % 7) as usize]
    }

    /// "HH:MM-HH:MM" for a slot of `slot_minutes`.
    pub fn time_label(&self, slot_minutes: u32) -> String {
        let start = self.slot as u32 * slot_minutes;
        let end = (start + slot_minutes) % (24 * 60);
        format!(
            "{:02}:{:02}-{:02}:{:02}",
            start / 60,
            start % 60,
            end / 60,
            end % 60
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum BetaSummary {
    Value(f64),
    InsufficientData,
}

impl BetaSummary {
    pub fn value(&self) -> Option<f64> {
        match self {
            BetaSummary::Value(v) => Some(*v),
            BetaSummary::InsufficientData => None,
        }
    }
}

impl std::fmt::Display for BetaSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BetaSummary::Value(v) => write!(f, "{}", Beta::new(*v)),
            BetaSummary::InsufficientData => write!(f, "insufficient data"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowAggregate {
    pub key: WindowKey,
    pub sample_count: usize,
    pub summary: BetaSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    /// 1-based
    pub rank: usize,
    pub aggregate: WindowAggregate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub top: Vec<RankedEntry>,
    pub bottom: Vec<RankedEntry>,
    pub current: WindowAggregate,
}

/// Everything a single-symbol pattern request produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternReport {
    pub symbol: String,
    pub benchmark: String,
    pub range: TimeRange,
    pub session: TradingSession,
    pub window_len: usize,
    pub slot_minutes: u32,
    pub utc_offset_minutes: i32,
    pub method: AggregateMethod,
    pub min_samples: usize,
    pub beta_samples: usize,
    pub incomplete: bool,
    pub aggregates: Vec<WindowAggregate>,
    pub ranked: RankedResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketEntry {
    pub rank: usize,
    pub symbol: String,
    pub beta: Beta,
    pub sample_count: usize,
    pub price_change: ChangePct,
    pub last_close: f64,
    pub risk_level: RiskLevel,
    pub incomplete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketFailure {
    pub symbol: String,
    pub reason: String,
}

/// Cross-symbol ranking plus every symbol that could not be analysed.
/// `entries` holds every ranked symbol, highest beta first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketReport {
    pub benchmark: String,
    pub range: TimeRange,
    pub session: TradingSession,
    pub top_k: usize,
    pub entries: Vec<MarketEntry>,
    pub failures: Vec<MarketFailure>,
}

impl MarketReport {
    /// Up to `top_k` entries with the highest beta.
    pub fn highest(&self) -> &[MarketEntry] {
        &self.entries[..self.top_k.min(self.entries.len())]
    }

    /// Up to `top_k` entries with the lowest beta, lowest first.
    pub fn lowest(&self) -> Vec<&MarketEntry> {
        self.entries.iter().rev().take(self.top_k).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_order_monday_first_then_slot() {
        let mut keys = vec![
            WindowKey { day: 6, slot: 0 },
            WindowKey { day: 0, slot: 23 },
            WindowKey { day: 0, slot: 2 },
            WindowKey { day: 1, slot: 0 },
        ];
        keys.sort();
        assert_eq!(keys[0], WindowKey { day: 0, slot: 2 });
        assert_eq!(keys[3].day_name(), "Sunday");
    }

    #[test]
    fn labels_wrap_at_midnight() {
        let key = WindowKey { day: 1, slot: 14 };
        assert_eq!(key.day_name(), "Tuesday");
        assert_eq!(key.time_label(60), "14:00-15:00");
        assert_eq!(WindowKey { day: 0, slot: 23 }.time_label(60), "23:00-00:00");
        assert_eq!(WindowKey { day: 0, slot: 3 }.time_label(30), "01:30-02:00");
    }

    #[test]
    fn insufficient_summary_has_no_value() {
        assert_eq!(BetaSummary::InsufficientData.value(), None);
        assert_eq!(BetaSummary::InsufficientData.to_string(), "insufficient data");
        assert_eq!(BetaSummary::Value(1.23456).to_string(), "1.235");
    }

    fn market_entry(rank: usize, symbol: &str, beta: f64) -> MarketEntry {
        MarketEntry {
            rank,
            symbol: symbol.to_string(),
            beta: Beta::new(beta),
            sample_count: 10,
            price_change: ChangePct::new(0.0),
            last_close: 1.0,
            risk_level: RiskLevel::from_beta(Beta::new(beta)),
            incomplete: false,
        }
    }

    #[test]
    fn market_report_exposes_both_ends_of_the_ranking() {
        let report = MarketReport {
            benchmark: "BTCUSDT".into(),
            range: TimeRange::new(0, 1_000).unwrap(),
            session: TradingSession::All,
            top_k: 2,
            entries: vec![
                market_entry(1, "AUSDT", 2.0),
                market_entry(2, "BUSDT", 1.0),
                market_entry(3, "CUSDT", 0.5),
                market_entry(4, "DUSDT", 0.1),
            ],
            failures: vec![],
        };
        let high: Vec<_> = report.highest().iter().map(|e| e.symbol.as_str()).collect();
        let low: Vec<_> = report.lowest().iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(high, vec!["AUSDT", "BUSDT"]);
        assert_eq!(low, vec!["DUSDT", "CUSDT"]);
        assert_eq!(report.lowest()[0].rank, 4);
    }
}
