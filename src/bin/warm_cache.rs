use {
    anyhow::{Context, Result},
    beta_scope::{
        AnalysisConfig, PERSISTENCE, UNIVERSE,
        config::{BINANCE, BinanceApiConfig},
        data::{
            BinanceProvider, DataFetcher, GlobalRateLimiter, MarketDataStorage, RetryPolicy,
            SqliteStorage,
        },
        domain::TimeRange,
        report,
        utils::{TimeUtils, epoch_ms_to_utc, now_timestamp_ms},
    },
    clap::Parser,
    futures::{StreamExt, stream},
    std::{path::PathBuf, sync::Arc},
};

/// Pre-fills the kline cache for the configured universe so later scans run offline-fast.
#[derive(Parser, Debug)]
struct WarmArgs {
    #[arg(long, default_value = PERSISTENCE.cache.db_path)]
    db: PathBuf,

    /// How many days of history to make sure are cached
    #[arg(long, default_value_t = 30)]
    days: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Setup Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = WarmArgs::parse();
    let interval_ms = AnalysisConfig::default().interval_ms;
    let end_ms = now_timestamp_ms();
    let range = TimeRange::new(end_ms - args.days.max(1) * TimeUtils::MS_IN_D, end_ms)?;

    let mut pairs: Vec<&str> = UNIVERSE
        .resources
        .pairs
        .iter()
        .copied()
        .take(UNIVERSE.max_pairs)
        .collect();
    if !pairs.contains(&UNIVERSE.benchmark) {
        pairs.push(UNIVERSE.benchmark);
    }

    log::info!("Warming cache at {}", args.db.display());
    log::info!(
        "Interval {} from {} to {} for {} pairs",
        TimeUtils::interval_to_string(interval_ms),
        epoch_ms_to_utc(range.start_ms),
        epoch_ms_to_utc(range.end_ms),
        pairs.len()
    );

    // 2. Storage and fetcher
    let storage = SqliteStorage::new(&args.db)
        .await
        .context("Failed to open the SQLite cache")?;
    storage.initialize().await?;
    let storage: Arc<dyn MarketDataStorage> = Arc::new(storage);

    let api_config = BinanceApiConfig::default();
    let limiter = GlobalRateLimiter::new(BINANCE.limits.weight_limit_minute);
    let provider = BinanceProvider::new(limiter, &api_config)?;
    let fetcher = DataFetcher::new(
        Arc::new(provider),
        storage.clone(),
        RetryPolicy::from(&api_config),
        interval_ms,
    );

    // 3. Fill every pair, a handful at a time
    let results: Vec<_> = stream::iter(pairs)
        .map(|pair| {
            let fetcher = fetcher.clone();
            async move { (pair, fetcher.fetch_series(pair, range).await) }
        })
        .buffer_unordered(BINANCE.limits.concurrent_sync_tasks)
        .collect()
        .await;

    let mut failed = 0usize;
    for (pair, result) in results {
        match result {
            Ok(series) if series.incomplete => {
                log::warn!("⚠ {}: {} candles, range only partly available", pair, series.len());
            }
            Ok(series) => log::info!("✅ {}: {} candles", pair, series.len()),
            Err(e) => {
                failed += 1;
                log::error!("❌ {}: {}", pair, e);
            }
        }
    }

    // 4. Summary
    let keys = storage.cached_keys().await?;
    println!("{}", report::cache_table(&keys));
    if failed > 0 {
        log::warn!("{} pair(s) could not be warmed", failed);
    }

    Ok(())
}
