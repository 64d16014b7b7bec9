use async_trait::async_trait;
use binance_sdk::spot::rest_api::RestApi;

use crate::config::{BINANCE, BinanceApiConfig};
use crate::data::GlobalRateLimiter;
use crate::data::timeseries::bn_kline::{configure_binance_client, fetch_klines_page};
use crate::domain::{Candle, PairInterval, TimeRange};
use crate::error::FetchError;

/// Abstract interface for fetching market data.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Candles whose open time lies in `range`, ascending, at most `limit` of them.
    /// Fewer than `limit` means the range is exhausted.
    async fn fetch_candles(
        &self,
        pair: &PairInterval,
        range: TimeRange,
        limit: usize,
    ) -> Result<Vec<Candle>, FetchError>;
}

/// Binance spot klines behind the shared request-weight limiter.
pub struct BinanceProvider {
    limiter: GlobalRateLimiter,
    rest_client: RestApi,
}

impl BinanceProvider {
    pub fn new(limiter: GlobalRateLimiter, config: &BinanceApiConfig) -> Result<Self, FetchError> {
        Ok(Self {
            limiter,
            rest_client: configure_binance_client(config)?,
        })
    }
}

#[async_trait]
impl MarketDataProvider for BinanceProvider {
    async fn fetch_candles(
        &self,
        pair: &PairInterval,
        range: TimeRange,
        limit: usize,
    ) -> Result<Vec<Candle>, FetchError> {
        self.limiter
            .acquire(BINANCE.limits.kline_call_weight, pair.name())
            .await;
        let limit = limit.min(BINANCE.limits.klines_limit as usize);
        fetch_klines_page(&self.rest_client, pair, range, limit).await
    }
}
