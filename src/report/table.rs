use tabled::{Table, Tabled, settings::Style};

use crate::data::CachedKey;
use crate::models::{MarketEntry, MarketReport, PatternReport, RankedEntry, WindowAggregate};
use crate::utils::{epoch_ms_to_utc, format_duration};

#[derive(Tabled)]
struct MarketRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Beta")]
    beta: String,
    #[tabled(rename = "Samples")]
    samples: usize,
    #[tabled(rename = "Change")]
    change: String,
    #[tabled(rename = "Last")]
    last: String,
    #[tabled(rename = "Risk")]
    risk: String,
    #[tabled(rename = "")]
    note: &'static str,
}

#[derive(Tabled)]
struct FailureRow {
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

#[derive(Tabled)]
struct WindowRow {
    #[tabled(rename = "#")]
    rank: String,
    #[tabled(rename = "Day")]
    day: &'static str,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Beta")]
    beta: String,
    #[tabled(rename = "Samples")]
    samples: usize,
}

#[derive(Tabled)]
struct CacheRow {
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Interval")]
    interval: String,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
    #[tabled(rename = "Span")]
    span: String,
    #[tabled(rename = "Candles")]
    candles: i64,
}

fn render<T: Tabled>(rows: Vec<T>) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn market_rows<'a>(entries: impl Iterator<Item = &'a MarketEntry>) -> Vec<MarketRow> {
    entries
        .map(|e| MarketRow {
            rank: e.rank,
            symbol: e.symbol.clone(),
            beta: e.beta.to_string(),
            samples: e.sample_count,
            change: e.price_change.to_string(),
            last: format!("{:.6}", e.last_close),
            risk: e.risk_level.to_string(),
            note: if e.incomplete { "partial" } else { "" },
        })
        .collect()
}

pub fn market_table(report: &MarketReport) -> String {
    let mut out = format!(
        "Beta vs {} over {} (session: {})\n",
        report.benchmark, report.range, report.session
    );

    // Short rankings are shown whole, long ones as both ends
    if report.entries.len() <= 2 * report.top_k {
        out.push_str(&render(market_rows(report.entries.iter())));
    } else {
        out.push_str(&format!("Highest beta (top {})\n", report.top_k));
        out.push_str(&render(market_rows(report.highest().iter())));
        out.push_str(&format!("\n\nLowest beta (bottom {})\n", report.top_k));
        out.push_str(&render(market_rows(report.lowest().into_iter())));
    }

    if !report.failures.is_empty() {
        out.push_str("\n\nFailed symbols\n");
        let rows: Vec<FailureRow> = report
            .failures
            .iter()
            .map(|f| FailureRow {
                symbol: f.symbol.clone(),
                reason: f.reason.clone(),
            })
            .collect();
        out.push_str(&render(rows));
    }
    out
}

fn window_row(rank: String, agg: &WindowAggregate, slot_minutes: u32) -> WindowRow {
    WindowRow {
        rank,
        day: agg.key.day_name(),
        time: agg.key.time_label(slot_minutes),
        beta: agg.summary.to_string(),
        samples: agg.sample_count,
    }
}

fn ranked_rows(entries: &[RankedEntry], slot_minutes: u32) -> Vec<WindowRow> {
    entries
        .iter()
        .map(|e| window_row(e.rank.to_string(), &e.aggregate, slot_minutes))
        .collect()
}

pub fn pattern_table(report: &PatternReport) -> String {
    let slot = report.slot_minutes;
    let mut out = format!(
        "{} vs {} over {} (window {} returns, {} of {}-minute slots, UTC{:+}m, min {} samples)\n",
        report.symbol,
        report.benchmark,
        report.range,
        report.window_len,
        report.method,
        slot,
        report.utc_offset_minutes,
        report.min_samples
    );
    if report.incomplete {
        out.push_str("warning: provider data was partial for this range\n");
    }

    out.push_str("\nHighest beta windows\n");
    out.push_str(&render(ranked_rows(&report.ranked.top, slot)));
    out.push_str("\n\nLowest beta windows\n");
    out.push_str(&render(ranked_rows(&report.ranked.bottom, slot)));
    out.push_str("\n\nCurrent window\n");
    out.push_str(&render(vec![window_row(
        "now".to_string(),
        &report.ranked.current,
        slot,
    )]));
    out
}

pub fn cache_table(keys: &[CachedKey]) -> String {
    let rows: Vec<CacheRow> = keys
        .iter()
        .map(|k| CacheRow {
            symbol: k.symbol.clone(),
            interval: k.interval.clone(),
            from: epoch_ms_to_utc(k.coverage.start_ms),
            to: epoch_ms_to_utc(k.coverage.end_ms),
            span: format_duration(k.coverage.duration_ms()),
            candles: k.candles,
        })
        .collect();
    render(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::TradingSession;
    use crate::config::{AggregateMethod, Beta, ChangePct, RiskLevel};
    use crate::domain::TimeRange;
    use crate::models::{BetaSummary, MarketFailure, RankedResult, WindowKey};

    #[test]
    fn market_table_lists_entries_and_failures() {
        let report = MarketReport {
            benchmark: "BTCUSDT".into(),
            range: TimeRange::new(0, 86_400_000).unwrap(),
            session: TradingSession::Us,
            top_k: 50,
            entries: vec![MarketEntry {
                rank: 1,
                symbol: "SOLUSDT".into(),
                beta: Beta::new(1.8),
                sample_count: 288,
                price_change: ChangePct::new(0.031),
                last_close: 101.5,
                risk_level: RiskLevel::High,
                incomplete: true,
            }],
            failures: vec![MarketFailure {
                symbol: "BADUSDT".into(),
                reason: "rejected".into(),
            }],
        };
        let text = market_table(&report);
        assert!(text.contains("SOLUSDT"));
        assert!(text.contains("1.800"));
        assert!(text.contains("+3.10%"));
        assert!(text.contains("partial"));
        assert!(text.contains("BADUSDT"));
        assert!(text.contains("session: us"));
    }

    #[test]
    fn long_market_table_shows_both_ends() {
        let entry = |rank: usize, symbol: &str, beta: f64| MarketEntry {
            rank,
            symbol: symbol.into(),
            beta: Beta::new(beta),
            sample_count: 288,
            price_change: ChangePct::new(0.0),
            last_close: 1.0,
            risk_level: RiskLevel::from_beta(Beta::new(beta)),
            incomplete: false,
        };
        let report = MarketReport {
            benchmark: "BTCUSDT".into(),
            range: TimeRange::new(0, 86_400_000).unwrap(),
            session: TradingSession::All,
            top_k: 1,
            entries: vec![
                entry(1, "SOLUSDT", 1.8),
                entry(2, "ETHUSDT", 1.2),
                entry(3, "PAXGUSDT", 0.1),
            ],
            failures: vec![],
        };
        let text = market_table(&report);
        assert!(text.contains("Highest beta (top 1)"));
        assert!(text.contains("Lowest beta (bottom 1)"));
        assert!(text.contains("SOLUSDT"));
        assert!(text.contains("PAXGUSDT"));
        assert!(!text.contains("ETHUSDT"));
    }

    #[test]
    fn pattern_table_marks_insufficient_current_window() {
        let key = WindowKey { day: 1, slot: 14 };
        let agg = WindowAggregate {
            key,
            sample_count: 9,
            summary: BetaSummary::Value(1.42),
        };
        let report = PatternReport {
            symbol: "ETHUSDT".into(),
            benchmark: "BTCUSDT".into(),
            range: TimeRange::new(0, 86_400_000).unwrap(),
            session: TradingSession::All,
            window_len: 12,
            slot_minutes: 60,
            utc_offset_minutes: 0,
            method: AggregateMethod::Mean,
            min_samples: 5,
            beta_samples: 9,
            incomplete: false,
            aggregates: vec![agg],
            ranked: RankedResult {
                top: vec![RankedEntry {
                    rank: 1,
                    aggregate: agg,
                }],
                bottom: vec![RankedEntry {
                    rank: 1,
                    aggregate: agg,
                }],
                current: WindowAggregate {
                    key: WindowKey { day: 3, slot: 2 },
                    sample_count: 0,
                    summary: BetaSummary::InsufficientData,
                },
            },
        };
        let text = pattern_table(&report);
        assert!(text.contains("Tuesday"));
        assert!(text.contains("14:00-15:00"));
        assert!(text.contains("1.420"));
        assert!(text.contains("Thursday"));
        assert!(text.contains("insufficient data"));
    }
}
