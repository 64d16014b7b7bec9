use statrs::statistics::{Data, Median, Statistics};
use std::time::Duration;

/// Converts a Duration into a specific number of candles based on the interval.
pub(crate) fn duration_to_candles(duration: Duration, interval_ms: i64) -> usize {
    if interval_ms <= 0 {
        return 0;
    }
    (duration.as_millis() as i64 / interval_ms) as usize
}

/// Population beta of `asset` against `bench`: cov(asset, bench) / var(bench).
///
/// Returns `None` when the benchmark slice is flat (every value identical),
/// when the slices differ in length or are empty, or when anything non-finite
/// sneaks into the result.
pub(crate) fn population_beta(asset: &[f64], bench: &[f64]) -> Option<f64> {
    if asset.is_empty() || asset.len() != bench.len() {
        return None;
    }
    // Identical returns can still leave rounding residue in the computed
    // variance, which would turn an undefined beta into a huge finite one.
    let first = bench[0];
    if bench.iter().all(|&r| r == first) {
        return None;
    }

    let variance = bench.iter().population_variance();
    let covariance = asset.iter().population_covariance(bench.iter());
    let beta = covariance / variance;
    beta.is_finite().then_some(beta)
}

#[inline]
pub fn mean_and_stddev(data: &[f64]) -> (f64, f64) {
    let count = data.len();
    if count == 0 {
        return (0.0, 0.0);
    }

    let sum: f64 = data.iter().sum();
    let mean = sum / count as f64;

    let variance: f64 = data
        .iter()
        .map(|value| {
            let diff = mean - *value;
            diff * diff
        })
        .sum::<f64>()
        / count as f64;

    (mean, variance.sqrt())
}

/// Median of an arbitrary slice (copies, so the caller's ordering is untouched).
pub(crate) fn median(data: &[f64]) -> f64 {
    Data::new(data.to_vec()).median()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beta_of_scaled_series_is_the_scale() {
        let bench = [0.01, -0.02, 0.015, 0.003];
        let asset: Vec<f64> = bench.iter().map(|r| r * 2.5).collect();
        let beta = population_beta(&asset, &bench).unwrap();
        assert!((beta - 2.5).abs() < 1e-12);
    }

    #[test]
    fn flat_benchmark_has_no_beta() {
        assert_eq!(population_beta(&[0.1, 0.2, 0.3], &[0.0, 0.0, 0.0]), None);
        assert_eq!(population_beta(&[0.1, 0.2], &[0.01, 0.01]), None);
    }

    #[test]
    fn tiny_but_real_benchmark_moves_still_have_a_beta() {
        let bench = [1e-100, -1e-100, 2e-100];
        let asset: Vec<f64> = bench.iter().map(|r| r * 3.0).collect();
        let beta = population_beta(&asset, &bench).unwrap();
        assert!((beta - 3.0).abs() < 1e-9);
    }

    #[test]
    fn nan_returns_have_no_beta() {
        assert_eq!(population_beta(&[0.1, f64::NAN], &[0.01, 0.02]), None);
    }

    #[test]
    fn mismatched_lengths_have_no_beta() {
        assert_eq!(population_beta(&[0.1, 0.2], &[0.01]), None);
        assert_eq!(population_beta(&[], &[]), None);
    }

    #[test]
    fn median_and_moments() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
        let (mean, sd) = mean_and_stddev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(mean, 5.0);
        assert_eq!(sd, 2.0);
    }

    #[test]
    fn candles_in_a_day() {
        assert_eq!(duration_to_candles(Duration::from_secs(86_400), 300_000), 288);
        assert_eq!(duration_to_candles(Duration::from_secs(60), 0), 0);
    }
}
