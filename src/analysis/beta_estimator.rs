use rayon::prelude::*;

use crate::error::BetaError;
use crate::models::{BetaSample, ReturnSeries};
use crate::utils::population_beta;

/// Rolling population beta of `asset` against `bench` over the trailing
/// `window_len` returns, one sample per return index `>= window_len - 1`.
///
/// Windows with a flat benchmark or any non-finite return are skipped.
/// The output is in timestamp order regardless of how rayon splits the work.
pub fn estimate_betas(
    asset: &ReturnSeries,
    bench: &ReturnSeries,
    window_len: usize,
) -> Result<Vec<BetaSample>, BetaError> {
    if window_len == 0 {
        return Err(BetaError::InvalidConfiguration(
            "rolling window must be at least 1 return".to_string(),
        ));
    }
    if asset.len() != bench.len() {
        return Err(BetaError::InvalidConfiguration(format!(
            "{} has {} returns but {} has {}",
            asset.symbol,
            asset.len(),
            bench.symbol,
            bench.len()
        )));
    }
    if asset.timestamps != bench.timestamps {
        return Err(BetaError::InvalidConfiguration(format!(
            "{} and {} returns are not aligned",
            asset.symbol, bench.symbol
        )));
    }
    let n = asset.len();
    if n < window_len {
        return Err(BetaError::InsufficientData {
            stage: "beta estimation",
            needed: window_len,
            got: n,
        });
    }

    let samples = (window_len - 1..n)
        .into_par_iter()
        .filter_map(|end| {
            let start = end + 1 - window_len;
            let a = &asset.returns[start..=end];
            let b = &bench.returns[start..=end];
            if a.iter().chain(b).any(|r| !r.is_finite()) {
                return None;
            }
            population_beta(a, b).map(|beta| BetaSample {
                timestamp_ms: asset.timestamps[end],
                beta,
                window_len,
                sample_count: a.len(),
            })
        })
        .collect();

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::compute_returns;
    use crate::domain::{Candle, PairInterval};
    use crate::models::PriceSeries;

    const T: i64 = 300_000;

    fn series(name: &str, prices: &[f64]) -> PriceSeries {
        let candles = prices
            .iter()
            .enumerate()
            .map(|(i, &p)| Candle::flat(i as i64 * T, p))
            .collect();
        PriceSeries::from_candles(PairInterval::new(name, T), candles)
    }

    fn returns(name: &str, prices: &[f64]) -> ReturnSeries {
        compute_returns(&series(name, prices)).unwrap()
    }

    #[test]
    fn five_prices_window_three_gives_two_samples() {
        let asset = returns("ETHUSDT", &[100.0, 102.0, 101.0, 105.0, 107.0]);
        let bench = returns("BTCUSDT", &[50.0, 50.5, 50.2, 51.0, 51.5]);
        assert_eq!(asset.len(), 4);

        let samples = estimate_betas(&asset, &bench, 3).unwrap();
        assert_eq!(samples.len(), 2);
        // stamped at price indices 3 and 4
        assert_eq!(samples[0].timestamp_ms, 3 * T);
        assert_eq!(samples[1].timestamp_ms, 4 * T);
        assert!(samples.iter().all(|s| s.window_len == 3 && s.sample_count == 3));
        assert!(samples.iter().all(|s| s.beta.is_finite()));
    }

    #[test]
    fn scaled_asset_has_constant_beta() {
        let bench = returns("BTCUSDT", &[50.0, 50.5, 50.2, 51.0, 51.5, 50.9, 51.7]);
        let asset = ReturnSeries {
            symbol: "ETHUSDT".into(),
            timestamps: bench.timestamps.clone(),
            returns: bench.returns.iter().map(|r| r * 2.5).collect(),
        };
        let samples = estimate_betas(&asset, &bench, 4).unwrap();
        assert_eq!(samples.len(), 3);
        for s in samples {
            assert!((s.beta - 2.5).abs() < 1e-9);
        }
    }

    #[test]
    fn flat_benchmark_window_is_excluded_not_zero() {
        // first three benchmark returns are all zero
        let bench = returns("BTCUSDT", &[50.0, 50.0, 50.0, 50.0, 51.0]);
        let asset = returns("ETHUSDT", &[100.0, 101.0, 99.0, 100.0, 102.0]);
        let samples = estimate_betas(&asset, &bench, 3).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].timestamp_ms, 4 * T);
        assert!(samples.iter().all(|s| s.beta != 0.0));
    }

    #[test]
    fn deterministic_across_runs() {
        let prices: Vec<f64> = (0..400).map(|i| 100.0 + ((i * 37) % 11) as f64).collect();
        let bench_prices: Vec<f64> = (0..400).map(|i| 50.0 + ((i * 13) % 7) as f64).collect();
        let asset = returns("ETHUSDT", &prices);
        let bench = returns("BTCUSDT", &bench_prices);
        let first = estimate_betas(&asset, &bench, 24).unwrap();
        let second = estimate_betas(&asset, &bench, 24).unwrap();
        assert_eq!(first, second);
        assert!(first.windows(2).all(|w| w[0].timestamp_ms < w[1].timestamp_ms));
    }

    #[test]
    fn too_few_returns_is_insufficient() {
        let asset = returns("ETHUSDT", &[1.0, 2.0, 3.0]);
        let bench = returns("BTCUSDT", &[1.0, 1.5, 1.2]);
        assert_eq!(
            estimate_betas(&asset, &bench, 5),
            Err(BetaError::InsufficientData {
                stage: "beta estimation",
                needed: 5,
                got: 2
            })
        );
    }

    #[test]
    fn mismatched_series_are_rejected() {
        let asset = returns("ETHUSDT", &[1.0, 2.0, 3.0, 4.0]);
        let bench = returns("BTCUSDT", &[1.0, 1.5, 1.2]);
        assert!(matches!(
            estimate_betas(&asset, &bench, 2),
            Err(BetaError::InvalidConfiguration(_))
        ));

        let mut shifted = returns("BTCUSDT", &[1.0, 1.5, 1.2, 1.3]);
        shifted.timestamps[1] += 1;
        assert!(matches!(
            estimate_betas(&asset, &shifted, 2),
            Err(BetaError::InvalidConfiguration(_))
        ));
    }
}
