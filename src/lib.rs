#![allow(clippy::too_many_arguments)]

// Core modules
pub mod analysis;
pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod models;
pub mod report;
pub mod utils;

// Re-export commonly used types outside of crate (for the binaries)
pub use config::{AnalysisConfig, PERSISTENCE, UNIVERSE};
pub use domain::{PairInterval, RangePreset, TimeRange};
pub use engine::{BetaEngine, MarketRequest, PatternRequest};
pub use error::{BetaError, FetchError};

use {
    analysis::TradingSession,
    anyhow::{Context, Result},
    clap::{Args, Parser, Subcommand},
    config::{AggregateMethod, BINANCE, BinanceApiConfig, constants},
    data::{
        BinanceProvider, DataFetcher, GlobalRateLimiter, MarketDataStorage, RetryPolicy,
        SqliteStorage,
    },
    std::{path::PathBuf, sync::Arc},
    utils::{TimeUtils, now_timestamp_ms, parse_utc_datetime},
};

// CLI argument parsing
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Beta rankings and recurring beta windows", long_about = None)]
pub struct Cli {
    /// SQLite kline cache
    #[arg(long, global = true, default_value = PERSISTENCE.cache.db_path)]
    pub db: PathBuf,

    /// Print JSON instead of tables
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    /// Benchmark every beta is measured against
    #[arg(long, global = true, default_value = UNIVERSE.benchmark)]
    pub benchmark: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Rank symbols by beta over a recent range
    Market(MarketArgs),
    /// Find recurring day/time windows with extreme beta for one symbol
    Pattern(PatternArgs),
    /// Drop cached klines for the given symbols
    Invalidate {
        #[arg(required = true, num_args = 1..)]
        symbols: Vec<String>,
    },
    /// List what the cache holds
    Cache,
}

#[derive(Args, Debug, Clone)]
pub struct MarketArgs {
    /// Look-back preset, ignored when --start is given
    #[arg(long, value_enum, default_value_t = RangePreset::Day)]
    pub range: RangePreset,

    /// Explicit start, "YYYY-MM-DD HH:MM" UTC or RFC 3339
    #[arg(long)]
    pub start: Option<String>,

    /// Explicit end (defaults to now)
    #[arg(long)]
    pub end: Option<String>,

    #[arg(long, value_enum, default_value_t = TradingSession::All)]
    pub session: TradingSession,

    /// Comma separated symbols (defaults to the built-in universe)
    #[arg(long, value_delimiter = ',')]
    pub symbols: Vec<String>,

    #[arg(long, default_value_t = constants::market::TOP_K)]
    pub top_k: usize,

    /// Also write the ranking as CSV
    #[arg(long, default_value_t = false)]
    pub export: bool,

    #[arg(long, default_value = PERSISTENCE.export.directory)]
    pub export_dir: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct PatternArgs {
    pub symbol: String,

    /// Start, "YYYY-MM-DD HH:MM" UTC or RFC 3339 (defaults to 30 days before end)
    #[arg(long)]
    pub start: Option<String>,

    /// End (defaults to now)
    #[arg(long)]
    pub end: Option<String>,

    #[arg(long, value_enum, default_value_t = TradingSession::All)]
    pub session: TradingSession,

    /// Rolling window in returns (derived from the range length when omitted)
    #[arg(long)]
    pub window: Option<usize>,

    #[arg(long, default_value_t = constants::pattern::SLOT_MINUTES)]
    pub slot_minutes: u32,

    /// Fixed offset used for day/time buckets, e.g. "+05:30" or "-04:00"
    #[arg(long, default_value = "+00:00", allow_hyphen_values = true, value_parser = parse_utc_offset)]
    pub utc_offset: i32,

    #[arg(long, default_value_t = constants::pattern::MIN_SAMPLES)]
    pub min_samples: usize,

    #[arg(long, value_enum, default_value_t = constants::pattern::AGGREGATE)]
    pub aggregate: AggregateMethod,

    #[arg(long, default_value_t = constants::pattern::TOP_K)]
    pub top_k: usize,

    /// Clip betas to mean +- k sigma before summarising
    #[arg(long, default_value_t = constants::pattern::OUTLIER_SIGMA)]
    pub sigma: f64,

    /// Disable outlier clipping
    #[arg(long, default_value_t = false)]
    pub no_clip: bool,
}

/// "+05:30" style offsets, returned as minutes east of UTC.
fn parse_utc_offset(text: &str) -> Result<i32, String> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("z") || text.eq_ignore_ascii_case("utc") {
        return Ok(0);
    }
    text.parse::<chrono::FixedOffset>()
        .map(|offset| offset.local_minus_utc() / 60)
        .map_err(|e| format!("invalid utc offset '{}': {}", text, e))
}

fn resolve_range(start: Option<&str>, end: Option<&str>, default_len_ms: i64) -> Result<TimeRange> {
    let end_ms = match end {
        Some(text) => parse_utc_datetime(text)?,
        None => now_timestamp_ms(),
    };
    let start_ms = match start {
        Some(text) => parse_utc_datetime(text)?,
        None => end_ms - default_len_ms,
    };
    Ok(TimeRange::new(start_ms, end_ms)?)
}

fn build_engine(storage: Arc<dyn MarketDataStorage>, config: AnalysisConfig) -> Result<BetaEngine> {
    let limiter = GlobalRateLimiter::new(BINANCE.limits.weight_limit_minute);
    let api_config = BinanceApiConfig::default();
    let provider = BinanceProvider::new(limiter, &api_config)?;
    let fetcher = DataFetcher::new(
        Arc::new(provider),
        storage,
        RetryPolicy::from(&api_config),
        config.interval_ms,
    );
    Ok(BetaEngine::new(fetcher, config))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("serialize output")?
    );
    Ok(())
}

/// Entry point shared by the binary: open the cache, run one command.
pub async fn run(cli: Cli) -> Result<()> {
    let storage = SqliteStorage::new(&cli.db).await?;
    storage.initialize().await?;
    let storage: Arc<dyn MarketDataStorage> = Arc::new(storage);

    let base_config = AnalysisConfig {
        benchmark: cli.benchmark.trim().to_uppercase(),
        ..Default::default()
    };

    match cli.command {
        Command::Market(args) => {
            let range = match args.start.as_deref() {
                Some(start) => resolve_range(Some(start), args.end.as_deref(), 0)?,
                None => {
                    let end = match args.end.as_deref() {
                        Some(text) => parse_utc_datetime(text)?,
                        None => now_timestamp_ms(),
                    };
                    args.range.ending_at(end)
                }
            };
            let symbols = if args.symbols.is_empty() {
                UNIVERSE
                    .resources
                    .pairs
                    .iter()
                    .take(UNIVERSE.max_pairs)
                    .map(|s| s.to_string())
                    .collect()
            } else {
                args.symbols
            };

            let engine = build_engine(storage, base_config)?;
            let market = engine
                .scan_market(MarketRequest {
                    symbols,
                    range,
                    session: args.session,
                    top_k: args.top_k,
                })
                .await?;

            if cli.json {
                print_json(&market)?;
            } else {
                println!("{}", report::market_table(&market));
            }
            if args.export {
                let path = report::write_market_csv(&market, &args.export_dir)?;
                if !cli.json {
                    println!("\nSaved {}", path.display());
                }
            }
        }
        Command::Pattern(args) => {
            let range = resolve_range(
                args.start.as_deref(),
                args.end.as_deref(),
                30 * TimeUtils::MS_IN_D,
            )?;
            let config = AnalysisConfig {
                window_len: args.window,
                slot_minutes: args.slot_minutes,
                utc_offset_minutes: args.utc_offset,
                min_samples: args.min_samples,
                top_k: args.top_k,
                aggregate: args.aggregate,
                outlier_sigma: (!args.no_clip).then_some(args.sigma),
                ..base_config
            };

            let engine = build_engine(storage, config)?;
            let pattern = engine
                .analyze_pattern(PatternRequest {
                    symbol: args.symbol,
                    range,
                    session: args.session,
                })
                .await?;

            if cli.json {
                print_json(&pattern)?;
            } else {
                println!("{}", report::pattern_table(&pattern));
            }
        }
        Command::Invalidate { symbols } => {
            let engine = build_engine(storage, base_config)?;
            for symbol in symbols {
                let removed = engine.fetcher().invalidate(&symbol).await?;
                log::info!("Invalidated {} ({} candles)", symbol, removed);
                if !cli.json {
                    println!("{}: removed {} cached candle(s)", symbol.to_uppercase(), removed);
                }
            }
        }
        Command::Cache => {
            let keys = storage.cached_keys().await?;
            if cli.json {
                print_json(&keys)?;
            } else {
                println!("{}", report::cache_table(&keys));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_offsets() {
        assert_eq!(parse_utc_offset("+05:30"), Ok(330));
        assert_eq!(parse_utc_offset("-04:00"), Ok(-240));
        assert_eq!(parse_utc_offset("Z"), Ok(0));
        assert!(parse_utc_offset("five").is_err());
    }

    #[test]
    fn cli_parses_pattern_command() {
        let cli = Cli::try_parse_from([
            "beta-scope",
            "--json",
            "pattern",
            "SOLUSDT",
            "--start",
            "2024-01-01 00:00",
            "--slot-minutes",
            "30",
            "--utc-offset",
            "-05:00",
            "--aggregate",
            "median",
            "--no-clip",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.benchmark, "BTCUSDT");
        match cli.command {
            Command::Pattern(args) => {
                assert_eq!(args.symbol, "SOLUSDT");
                assert_eq!(args.slot_minutes, 30);
                assert_eq!(args.utc_offset, -300);
                assert_eq!(args.aggregate, AggregateMethod::Median);
                assert!(args.no_clip);
                assert_eq!(args.min_samples, 5);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn cli_parses_market_command() {
        let cli = Cli::try_parse_from([
            "beta-scope",
            "market",
            "--range",
            "7d",
            "--session",
            "us",
            "--symbols",
            "ETHUSDT,SOLUSDT",
            "--export",
        ])
        .unwrap();
        match cli.command {
            Command::Market(args) => {
                assert_eq!(args.range, RangePreset::Week);
                assert_eq!(args.session, TradingSession::Us);
                assert_eq!(args.symbols, vec!["ETHUSDT", "SOLUSDT"]);
                assert!(args.export);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn explicit_range_must_be_ordered() {
        assert!(resolve_range(Some("2024-01-02 00:00"), Some("2024-01-01 00:00"), 0).is_err());
        let range = resolve_range(None, Some("2024-01-31 00:00"), 30 * TimeUtils::MS_IN_D).unwrap();
        assert_eq!(range.duration_ms(), 30 * TimeUtils::MS_IN_D);
    }
}
