mod fetcher;
mod provider;
mod rate_limiter;
mod retry;
mod storage;

mod timeseries;

pub use {
    fetcher::{DataFetcher, PAGE_SIZE},
    provider::{BinanceProvider, MarketDataProvider},
    rate_limiter::GlobalRateLimiter,
    retry::RetryPolicy,
    storage::{CachedKey, MarketDataStorage, SqliteStorage},
};
