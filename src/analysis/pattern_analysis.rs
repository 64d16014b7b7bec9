use crate::analysis::{
    AggregationSettings, TradingSession, WindowBucketer, aggregate_windows, build_ranked_result,
    compute_returns, estimate_betas,
};
use crate::config::AnalysisConfig;
use crate::domain::TimeRange;
use crate::error::BetaError;
use crate::models::{PatternReport, PriceSeries};
use crate::trace_time;

/// Runs the whole single-symbol pipeline on already fetched series.
/// CPU only; callers put it on the blocking pool.
pub fn pattern_analysis_pure(
    asset: &PriceSeries,
    bench: &PriceSeries,
    range: TimeRange,
    session: TradingSession,
    config: &AnalysisConfig,
    now_ms: i64,
) -> Result<PatternReport, BetaError> {
    trace_time!("pattern_analysis_pure", 200, {
        config.validate()?;
        let bucketer = WindowBucketer::from_config(config)?;
        let settings = AggregationSettings::from(config);

        // 1. Align and filter
        let (asset, bench) = PriceSeries::align(asset, bench);
        let asset = asset.filtered(|ts| session.contains(ts));
        let bench = bench.filtered(|ts| session.contains(ts));

        // 2. Returns and rolling betas
        let asset_returns = compute_returns(&asset)?;
        let bench_returns = compute_returns(&bench)?;
        let window_len = config.resolve_window(range.duration_ms());
        let samples = estimate_betas(&asset_returns, &bench_returns, window_len)?;

        // 3. Bucket, summarise, rank
        let aggregates = aggregate_windows(&samples, &bucketer, &settings);
        let ranked = build_ranked_result(&aggregates, &bucketer, &settings, now_ms);

        Ok(PatternReport {
            symbol: asset.symbol().to_string(),
            benchmark: bench.symbol().to_string(),
            range,
            session,
            window_len,
            slot_minutes: bucketer.slot_minutes(),
            utc_offset_minutes: config.utc_offset_minutes,
            method: config.aggregate,
            min_samples: config.min_samples,
            beta_samples: samples.len(),
            incomplete: asset.incomplete || bench.incomplete,
            aggregates,
            ranked,
        })
    })
}
