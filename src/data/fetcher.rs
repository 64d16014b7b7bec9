use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::DF;
use crate::data::{MarketDataProvider, MarketDataStorage, RetryPolicy};
use crate::domain::{Candle, PairInterval, TimeRange};
use crate::error::{BetaError, FetchError};
use crate::models::PriceSeries;
use crate::utils::{TimeUtils, now_timestamp_ms};

pub const PAGE_SIZE: usize = 1000;

type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Result of bringing one key's cache up to date for a request.
#[derive(Debug, Clone, Default, PartialEq)]
struct FillOutcome {
    fetched: usize,
    /// Last provider failure, if any sub-range could not be completed.
    failure: Option<FetchError>,
}

/// Cache-first access to aligned price series.
///
/// Fills for the same (symbol, interval) are serialised; reads go straight
/// to the store. A fill runs as its own task, so dropping the caller still
/// leaves the cache populated.
#[derive(Clone)]
pub struct DataFetcher {
    provider: Arc<dyn MarketDataProvider>,
    storage: Arc<dyn MarketDataStorage>,
    policy: RetryPolicy,
    interval_ms: i64,
    page_size: usize,
    // One entry per key touched; pruned by `invalidate` once idle.
    key_locks: Arc<Mutex<HashMap<PairInterval, Arc<Mutex<()>>>>>,
    clock: Clock,
}

impl DataFetcher {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        storage: Arc<dyn MarketDataStorage>,
        policy: RetryPolicy,
        interval_ms: i64,
    ) -> Self {
        Self {
            provider,
            storage,
            policy,
            interval_ms,
            page_size: PAGE_SIZE,
            key_locks: Arc::new(Mutex::new(HashMap::new())),
            clock: Arc::new(now_timestamp_ms),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn interval_ms(&self) -> i64 {
        self.interval_ms
    }

    pub fn now_ms(&self) -> i64 {
        (self.clock)()
    }

    pub fn storage(&self) -> &Arc<dyn MarketDataStorage> {
        &self.storage
    }

    /// Symbol and benchmark over `range`, truncated to shared timestamps.
    pub async fn fetch_aligned(
        &self,
        symbol: &str,
        benchmark: &str,
        range: TimeRange,
    ) -> Result<(PriceSeries, PriceSeries), BetaError> {
        let (asset, bench) = tokio::try_join!(
            self.fetch_series(symbol, range),
            self.fetch_series(benchmark, range)
        )?;
        Ok(PriceSeries::align(&asset, &bench))
    }

    /// Cached series for `symbol` over `range`, filling gaps from the provider first.
    pub async fn fetch_series(
        &self,
        symbol: &str,
        range: TimeRange,
    ) -> Result<PriceSeries, BetaError> {
        let pair = PairInterval::new(symbol, self.interval_ms);

        let this = self.clone();
        let fill_pair = pair.clone();
        let outcome = tokio::spawn(async move { this.fill(&fill_pair, range).await })
            .await
            .map_err(|e| BetaError::Cache(format!("cache fill for {} failed: {}", symbol, e)))??;

        let candles = self
            .storage
            .load_candles(pair.name(), pair.interval_label(), range)
            .await?;

        if candles.is_empty() {
            let reason = match &outcome.failure {
                Some(e) => e.to_string(),
                None => "provider returned no closed candles".to_string(),
            };
            return Err(BetaError::DataUnavailable {
                symbol: pair.name().to_string(),
                range,
                reason,
            });
        }

        let series =
            PriceSeries::from_candles(pair, candles).with_incomplete(outcome.failure.is_some());
        if series.incomplete {
            log::warn!(
                "{}: returning partial data over {} ({} points)",
                series.symbol(),
                range,
                series.len()
            );
        }
        if DF.log_cache && series.gap_count() > 0 {
            log::info!(
                "{}: {} gap(s) in cached series over {}",
                series.symbol(),
                series.gap_count(),
                range
            );
        }
        Ok(series)
    }

    /// Drops everything cached for `symbol`.
    pub async fn invalidate(&self, symbol: &str) -> Result<u64, BetaError> {
        let pair = PairInterval::new(symbol, self.interval_ms);
        let lock = self.key_lock(&pair).await;
        let removed = {
            let _guard = lock.lock().await;
            self.storage.invalidate(pair.name()).await?
        };
        self.release_key_lock(&pair, lock).await;
        Ok(removed)
    }

    async fn key_lock(&self, pair: &PairInterval) -> Arc<Mutex<()>> {
        let mut locks = self.key_locks.lock().await;
        locks.entry(pair.clone()).or_default().clone()
    }

    /// Drops the map entry when `lock` is the only handle outside the map.
    /// Handles are cloned under the map lock, so nobody can pick it up meanwhile.
    async fn release_key_lock(&self, pair: &PairInterval, lock: Arc<Mutex<()>>) {
        let mut locks = self.key_locks.lock().await;
        if Arc::strong_count(&lock) == 2 {
            locks.remove(pair);
        }
    }

    /// Open time of the newest candle that has closed by `now_ms`.
    fn last_closed_open_time(&self, now_ms: i64) -> i64 {
        TimeUtils::floor_to_interval(now_ms - self.interval_ms, self.interval_ms)
    }

    async fn fill(&self, pair: &PairInterval, range: TimeRange) -> Result<FillOutcome, BetaError> {
        let lock = self.key_lock(pair).await;
        let _guard = lock.lock().await;

        let interval = pair.interval_label();
        let now_ms = self.now_ms();
        let closed_end = self.last_closed_open_time(now_ms);
        if closed_end < range.start_ms {
            if DF.log_cache {
                log::info!("{}: nothing closed yet in {}", pair, range);
            }
            return Ok(FillOutcome::default());
        }
        let target = TimeRange {
            start_ms: range.start_ms,
            end_ms: range.end_ms.min(closed_end),
        };

        let coverage = self.storage.get_coverage(pair.name(), interval).await?;
        let missing = target.missing_from(coverage.as_ref());
        if missing.is_empty() {
            if DF.log_cache {
                log::info!("{}: cache hit for {}", pair, target);
            }
            return Ok(FillOutcome::default());
        }
        if DF.log_cache {
            log::info!(
                "{}: fetching {} missing sub-range(s) of {}",
                pair,
                missing.len(),
                target
            );
        }

        let mut outcome = FillOutcome::default();
        let mut merged = coverage;
        let mut candles: Vec<Candle> = Vec::new();

        for gap in missing {
            let (page_candles, covered, failure) = self.fetch_gap(pair, gap, now_ms).await;
            outcome.fetched += page_candles.len();
            candles.extend(page_candles);
            if let Some(e) = failure {
                outcome.failure = Some(e);
            }
            // Only ranges touching the current coverage may extend it.
            if let Some(covered) = covered {
                merged = match merged {
                    None => Some(covered),
                    Some(m)
                        if covered.start_ms <= m.end_ms + 1 && covered.end_ms + 1 >= m.start_ms =>
                    {
                        Some(m.union(&covered))
                    }
                    Some(m) => Some(m),
                };
            }
        }

        if let Some(new_coverage) = merged {
            let inserted = self
                .storage
                .merge_range(pair.name(), interval, &candles, new_coverage)
                .await?;
            if DF.log_cache {
                log::info!(
                    "{}: merged {} new of {} fetched candle(s), coverage now {}",
                    pair,
                    inserted,
                    outcome.fetched,
                    new_coverage
                );
            }
        }

        Ok(outcome)
    }

    /// Pages forward through `gap`. Returns the closed candles received, the
    /// prefix of `gap` known complete, and the error that stopped paging.
    async fn fetch_gap(
        &self,
        pair: &PairInterval,
        gap: TimeRange,
        now_ms: i64,
    ) -> (Vec<Candle>, Option<TimeRange>, Option<FetchError>) {
        let mut collected: Vec<Candle> = Vec::new();
        let mut cursor = gap.start_ms;

        loop {
            let page_range = TimeRange {
                start_ms: cursor,
                end_ms: gap.end_ms,
            };
            let page = match self.fetch_with_retry(pair, page_range).await {
                Ok(page) => page,
                Err(e) => {
                    log::error!("{}: giving up on {}: {}", pair, page_range, e);
                    let covered = collected.last().map(|c| TimeRange {
                        start_ms: gap.start_ms,
                        end_ms: c.timestamp_ms,
                    });
                    return (collected, covered, Some(e));
                }
            };

            let received = page.len();
            let last_ts = page.iter().map(|c| c.timestamp_ms).max();
            collected.extend(page.into_iter().filter(|c| {
                page_range.contains(c.timestamp_ms) && c.is_closed(self.interval_ms, now_ms)
            }));

            match last_ts {
                Some(last) if received >= self.page_size && last < gap.end_ms => {
                    cursor = last + 1;
                }
                _ => break,
            }
        }

        (collected, Some(gap), None)
    }

    /// One provider call with its own timeout, retrying transient failures.
    async fn fetch_with_retry(
        &self,
        pair: &PairInterval,
        range: TimeRange,
    ) -> Result<Vec<Candle>, FetchError> {
        let mut attempt = 0;
        loop {
            let call = self.provider.fetch_candles(pair, range, self.page_size);
            let result = match tokio::time::timeout(self.policy.call_timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout(
                    self.policy.call_timeout.as_millis() as u64,
                )),
            };

            match result {
                Ok(candles) => return Ok(candles),
                Err(e) if e.is_transient() && attempt < self.policy.max_retries => {
                    let backoff = self.policy.backoff_for(attempt);
                    log::warn!(
                        "{}: {} (retry {}/{} in {}ms)",
                        pair,
                        e,
                        attempt + 1,
                        self.policy.max_retries,
                        backoff.as_millis()
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SqliteStorage;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    const T: i64 = TimeUtils::MS_IN_5_MIN;
    // far enough ahead that every test candle has closed
    const LATE: i64 = 1_000_000 * T;

    /// Serves a synthetic close for every aligned open time, after popping
    /// any scripted failures.
    #[derive(Default)]
    struct MockProvider {
        calls: StdMutex<Vec<TimeRange>>,
        failures: StdMutex<VecDeque<FetchError>>,
        always_fail: Option<FetchError>,
        delay: Option<Duration>,
    }

    impl MockProvider {
        fn failing_first(failures: Vec<FetchError>) -> Self {
            Self {
                failures: StdMutex::new(failures.into()),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<TimeRange> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MarketDataProvider for MockProvider {
        async fn fetch_candles(
            &self,
            pair: &PairInterval,
            range: TimeRange,
            limit: usize,
        ) -> Result<Vec<Candle>, FetchError> {
            self.calls.lock().unwrap().push(range);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(e) = &self.always_fail {
                return Err(e.clone());
            }
            if let Some(e) = self.failures.lock().unwrap().pop_front() {
                return Err(e);
            }
            let step = pair.interval_ms;
            let first = TimeUtils::ceil_to_interval(range.start_ms, step);
            Ok((0..)
                .map(|i| first + i * step)
                .take_while(|ts| *ts <= range.end_ms)
                .take(limit)
                .map(|ts| Candle::flat(ts, 100.0 + (ts / step) as f64))
                .collect())
        }
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
            call_timeout: Duration::from_millis(500),
        }
    }

    async fn fetcher(
        dir: &tempfile::TempDir,
        provider: Arc<MockProvider>,
        policy: RetryPolicy,
    ) -> DataFetcher {
        let storage = SqliteStorage::new(dir.path().join("klines.sqlite"))
            .await
            .unwrap();
        storage.initialize().await.unwrap();
        DataFetcher::new(provider, Arc::new(storage), policy, T).with_clock(|| LATE)
    }

    fn range(a: i64, b: i64) -> TimeRange {
        TimeRange::new(a * T, b * T).unwrap()
    }

    #[tokio::test]
    async fn overlapping_request_fetches_only_the_missing_tail() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::default());
        let fetcher = fetcher(&dir, provider.clone(), fast_policy(0)).await;

        let first = fetcher.fetch_series("ETHUSDT", range(0, 10)).await.unwrap();
        assert_eq!(first.len(), 11);
        assert_eq!(provider.calls(), vec![range(0, 10)]);

        let second = fetcher.fetch_series("ETHUSDT", range(5, 15)).await.unwrap();
        assert_eq!(second.len(), 11);
        assert_eq!(
            provider.calls()[1],
            TimeRange {
                start_ms: 10 * T + 1,
                end_ms: 15 * T
            }
        );
        assert_eq!(provider.calls().len(), 2);

        let coverage = fetcher
            .storage()
            .get_coverage("ETHUSDT", "5m")
            .await
            .unwrap();
        assert_eq!(coverage, Some(range(0, 15)));

        let all = fetcher.fetch_series("ETHUSDT", range(0, 15)).await.unwrap();
        assert_eq!(all.len(), 16);
        assert!(all.timestamps.windows(2).all(|w| w[0] < w[1]));
        // fully covered: no further provider call
        assert_eq!(provider.calls().len(), 2);
        assert!(!all.incomplete);
    }

    #[tokio::test]
    async fn disjoint_request_keeps_coverage_contiguous() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::default());
        let fetcher = fetcher(&dir, provider.clone(), fast_policy(0)).await;

        fetcher.fetch_series("ETHUSDT", range(0, 10)).await.unwrap();
        let later = fetcher.fetch_series("ETHUSDT", range(20, 30)).await.unwrap();
        assert_eq!(later.len(), 11);
        let coverage = fetcher
            .storage()
            .get_coverage("ETHUSDT", "5m")
            .await
            .unwrap();
        assert_eq!(coverage, Some(range(0, 30)));
    }

    #[tokio::test]
    async fn pages_forward_through_long_ranges() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::default());
        let fetcher = fetcher(&dir, provider.clone(), fast_policy(0))
            .await
            .with_page_size(4);

        let series = fetcher.fetch_series("BTCUSDT", range(0, 9)).await.unwrap();
        assert_eq!(series.len(), 10);
        let starts: Vec<i64> = provider.calls().iter().map(|r| r.start_ms).collect();
        assert_eq!(starts, vec![0, 3 * T + 1, 7 * T + 1]);
    }

    #[tokio::test]
    async fn unclosed_candles_are_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::default());
        // two minutes into the candle opening at T10
        let fetcher = fetcher(&dir, provider.clone(), fast_policy(0))
            .await
            .with_clock(|| 10 * T + 120_000);

        let series = fetcher.fetch_series("ETHUSDT", range(0, 10)).await.unwrap();
        assert_eq!(series.timestamps.last(), Some(&(9 * T)));
        let coverage = fetcher
            .storage()
            .get_coverage("ETHUSDT", "5m")
            .await
            .unwrap();
        assert_eq!(coverage, Some(range(0, 9)));
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::failing_first(vec![
            FetchError::RateLimited("429".into()),
            FetchError::Transport("reset".into()),
        ]));
        let fetcher = fetcher(&dir, provider.clone(), fast_policy(3)).await;

        let series = fetcher.fetch_series("ETHUSDT", range(0, 5)).await.unwrap();
        assert_eq!(series.len(), 6);
        assert_eq!(provider.calls().len(), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_data_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider {
            always_fail: Some(FetchError::Transport("down".into())),
            ..Default::default()
        });
        let fetcher = fetcher(&dir, provider.clone(), fast_policy(2)).await;

        let err = fetcher
            .fetch_series("ETHUSDT", range(0, 5))
            .await
            .unwrap_err();
        match err {
            BetaError::DataUnavailable { symbol, range: r, reason } => {
                assert_eq!(symbol, "ETHUSDT");
                assert_eq!(r, range(0, 5));
                assert!(reason.contains("down"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(provider.calls().len(), 3);
    }

    #[tokio::test]
    async fn fatal_errors_are_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::failing_first(vec![FetchError::Rejected(
            "Invalid symbol".into(),
        )]));
        let fetcher = fetcher(&dir, provider.clone(), fast_policy(5)).await;

        assert!(matches!(
            fetcher.fetch_series("NOPEUSDT", range(0, 5)).await,
            Err(BetaError::DataUnavailable { .. })
        ));
        assert_eq!(provider.calls().len(), 1);
    }

    #[tokio::test]
    async fn slow_calls_time_out() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider {
            delay: Some(Duration::from_millis(200)),
            ..Default::default()
        });
        let policy = RetryPolicy {
            call_timeout: Duration::from_millis(20),
            ..fast_policy(1)
        };
        let fetcher = fetcher(&dir, provider.clone(), policy).await;

        match fetcher.fetch_series("ETHUSDT", range(0, 5)).await {
            Err(BetaError::DataUnavailable { reason, .. }) => {
                assert!(reason.contains("timed out"))
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(provider.calls().len(), 2);
    }

    #[tokio::test]
    async fn partial_data_is_flagged_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SqliteStorage::new(dir.path().join("klines.sqlite"))
            .await
            .unwrap();
        storage.initialize().await.unwrap();
        let storage: Arc<dyn MarketDataStorage> = Arc::new(storage);

        let healthy = DataFetcher::new(
            Arc::new(MockProvider::default()),
            storage.clone(),
            fast_policy(0),
            T,
        )
        .with_clock(|| LATE);
        healthy.fetch_series("ETHUSDT", range(0, 10)).await.unwrap();

        let broken = DataFetcher::new(
            Arc::new(MockProvider {
                always_fail: Some(FetchError::Transport("down".into())),
                ..Default::default()
            }),
            storage.clone(),
            fast_policy(0),
            T,
        )
        .with_clock(|| LATE);
        let series = broken.fetch_series("ETHUSDT", range(0, 20)).await.unwrap();
        assert!(series.incomplete);
        assert_eq!(series.len(), 11);
        assert_eq!(
            storage.get_coverage("ETHUSDT", "5m").await.unwrap(),
            Some(range(0, 10))
        );
    }

    #[tokio::test]
    async fn concurrent_requests_for_one_key_fetch_once() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider {
            delay: Some(Duration::from_millis(20)),
            ..Default::default()
        });
        let fetcher = fetcher(&dir, provider.clone(), fast_policy(0)).await;

        let (a, b) = tokio::join!(
            fetcher.fetch_series("ETHUSDT", range(0, 10)),
            fetcher.fetch_series("ETHUSDT", range(0, 10))
        );
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(provider.calls().len(), 1);
    }

    #[tokio::test]
    async fn dropped_request_still_fills_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider {
            delay: Some(Duration::from_millis(50)),
            ..Default::default()
        });
        let fetcher = fetcher(&dir, provider.clone(), fast_policy(0)).await;

        let abandoned = tokio::time::timeout(
            Duration::from_millis(5),
            fetcher.fetch_series("ETHUSDT", range(0, 10)),
        )
        .await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(300)).await;
        let coverage = fetcher
            .storage()
            .get_coverage("ETHUSDT", "5m")
            .await
            .unwrap();
        assert_eq!(coverage, Some(range(0, 10)));
    }

    #[tokio::test]
    async fn aligned_fetch_and_invalidate() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::default());
        let fetcher = fetcher(&dir, provider.clone(), fast_policy(0)).await;

        let (asset, bench) = fetcher
            .fetch_aligned("ETHUSDT", "BTCUSDT", range(0, 10))
            .await
            .unwrap();
        assert_eq!(asset.timestamps, bench.timestamps);
        assert_eq!(asset.symbol(), "ETHUSDT");
        assert_eq!(bench.symbol(), "BTCUSDT");

        assert_eq!(fetcher.invalidate("ethusdt").await.unwrap(), 11);
        assert_eq!(
            fetcher
                .storage()
                .get_coverage("ETHUSDT", "5m")
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn invalidate_prunes_idle_key_locks() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::default());
        let fetcher = fetcher(&dir, provider, fast_policy(0)).await;

        fetcher.fetch_series("ETHUSDT", range(0, 10)).await.unwrap();
        fetcher.fetch_series("BTCUSDT", range(0, 10)).await.unwrap();
        assert_eq!(fetcher.key_locks.lock().await.len(), 2);

        fetcher.invalidate("ETHUSDT").await.unwrap();
        let locks = fetcher.key_locks.lock().await;
        assert_eq!(locks.len(), 1);
        assert!(locks.contains_key(&PairInterval::new("BTCUSDT", T)));
    }
}
