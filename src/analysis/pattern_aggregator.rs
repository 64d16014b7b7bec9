use std::collections::BTreeMap;

use crate::analysis::WindowBucketer;
use crate::config::{AggregateMethod, AnalysisConfig};
use crate::models::{
    BetaSample, BetaSummary, RankedEntry, RankedResult, WindowAggregate, WindowKey,
};
use crate::utils::{mean_and_stddev, median};

/// Summary settings, lifted out of `AnalysisConfig` so callers can aggregate
/// without a full config.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregationSettings {
    pub method: AggregateMethod,
    pub min_samples: usize,
    pub top_k: usize,
    pub outlier_sigma: Option<f64>,
}

impl From<&AnalysisConfig> for AggregationSettings {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            method: config.aggregate,
            min_samples: config.min_samples,
            top_k: config.top_k,
            outlier_sigma: config.outlier_sigma,
        }
    }
}

/// Groups defined samples by window key and summarises each bucket.
/// Output is in natural key order.
///
/// Outlier clipping uses the mean and sigma of every defined sample, so a
/// spike is judged against the whole series rather than its own bucket.
pub fn aggregate_windows(
    samples: &[BetaSample],
    bucketer: &WindowBucketer,
    settings: &AggregationSettings,
) -> Vec<WindowAggregate> {
    let defined: Vec<&BetaSample> = samples.iter().filter(|s| s.beta.is_finite()).collect();
    let bounds = settings.outlier_sigma.and_then(|k| {
        let betas: Vec<f64> = defined.iter().map(|s| s.beta).collect();
        clip_bounds(&betas, k)
    });

    let mut buckets: BTreeMap<WindowKey, Vec<f64>> = BTreeMap::new();
    for sample in defined {
        let beta = match bounds {
            Some((lo, hi)) => sample.beta.clamp(lo, hi),
            None => sample.beta,
        };
        buckets
            .entry(bucketer.key_for(sample.timestamp_ms))
            .or_default()
            .push(beta);
    }

    buckets
        .into_iter()
        .map(|(key, mut values)| {
            // Sorting first makes the float sums independent of input order.
            values.sort_by(f64::total_cmp);
            WindowAggregate {
                key,
                sample_count: values.len(),
                summary: summarise(&values, settings),
            }
        })
        .collect()
}

fn summarise(sorted: &[f64], settings: &AggregationSettings) -> BetaSummary {
    if sorted.is_empty() || sorted.len() < settings.min_samples {
        return BetaSummary::InsufficientData;
    }

    let value = match settings.method {
        AggregateMethod::Mean => sorted.iter().sum::<f64>() / sorted.len() as f64,
        AggregateMethod::Median => median(sorted),
    };
    BetaSummary::Value(value)
}

/// `mean +- k sigma` over `values`, or `None` when there is nothing to clip.
pub(crate) fn clip_bounds(values: &[f64], k: f64) -> Option<(f64, f64)> {
    if values.len() < 2 {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let (mean, sd) = mean_and_stddev(&sorted);
    if sd <= 0.0 || !sd.is_finite() {
        return None;
    }
    Some((mean - k * sd, mean + k * sd))
}

/// Highest and lowest `top_k` numeric aggregates.
///
/// Ties on the summary go to the larger sample count, then the earlier key.
pub fn rank_windows(
    aggregates: &[WindowAggregate],
    top_k: usize,
) -> (Vec<RankedEntry>, Vec<RankedEntry>) {
    let ranked: Vec<(f64, &WindowAggregate)> = aggregates
        .iter()
        .filter_map(|agg| agg.summary.value().map(|v| (v, agg)))
        .collect();

    let tie_break = |a: &WindowAggregate, b: &WindowAggregate| {
        b.sample_count
            .cmp(&a.sample_count)
            .then_with(|| a.key.cmp(&b.key))
    };

    let mut top = ranked.clone();
    top.sort_by(|(va, a), (vb, b)| vb.total_cmp(va).then_with(|| tie_break(a, b)));

    let mut bottom = ranked;
    bottom.sort_by(|(va, a), (vb, b)| va.total_cmp(vb).then_with(|| tie_break(a, b)));

    (to_entries(&top, top_k), to_entries(&bottom, top_k))
}

fn to_entries(sorted: &[(f64, &WindowAggregate)], top_k: usize) -> Vec<RankedEntry> {
    sorted
        .iter()
        .take(top_k)
        .enumerate()
        .map(|(i, (_, agg))| RankedEntry {
            rank: i + 1,
            aggregate: **agg,
        })
        .collect()
}

/// Aggregate for the bucket containing `now_ms`; an empty bucket reports
/// insufficient data with a zero count.
pub fn current_window(
    aggregates: &[WindowAggregate],
    bucketer: &WindowBucketer,
    now_ms: i64,
) -> WindowAggregate {
    let key = bucketer.key_for(now_ms);
    aggregates
        .iter()
        .find(|agg| agg.key == key)
        .copied()
        .unwrap_or(WindowAggregate {
            key,
            sample_count: 0,
            summary: BetaSummary::InsufficientData,
        })
}

pub fn build_ranked_result(
    aggregates: &[WindowAggregate],
    bucketer: &WindowBucketer,
    settings: &AggregationSettings,
    now_ms: i64,
) -> RankedResult {
    let (top, bottom) = rank_windows(aggregates, settings.top_k);
    RankedResult {
        top,
        bottom,
        current: current_window(aggregates, bucketer, now_ms),
    }
}
