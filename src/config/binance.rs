use std::time::Duration;

pub struct BinanceApiConfig {
    pub timeout_ms: u64,
    pub retries: u32,
    pub backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for BinanceApiConfig {
    fn default() -> Self {
        Self {
            timeout_ms: BINANCE.client.timeout_ms,
            retries: BINANCE.client.retries,
            backoff_ms: BINANCE.client.backoff_ms,
            max_backoff_ms: BINANCE.client.max_backoff_ms,
        }
    }
}

impl BinanceApiConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// REST constraints: 1000 klines, weight budget, call costs, and sync concurrency.
pub struct RestLimits {
    pub klines_limit: i32,
    pub weight_limit_minute: u32,
    pub kline_call_weight: u32,
    pub concurrent_sync_tasks: usize,
}

pub struct ClientDefaults {
    /// Per-call timeout, applied around every single klines request.
    pub timeout_ms: u64,
    /// Retries on transient failures (rate limit, transport, timeout) before giving up.
    pub retries: u32,
    /// First backoff delay; doubles on every retry.
    pub backoff_ms: u64,
    pub max_backoff_ms: u64,
}

pub struct BinanceConfig {
    pub limits: RestLimits,
    pub client: ClientDefaults,
}

pub const BINANCE_QUOTE_ASSETS: &[&str] = &["USDT", "USDC", "FDUSD", "BTC", "ETH", "BNB"];

pub const BINANCE: BinanceConfig = BinanceConfig {
    limits: RestLimits {
        klines_limit: 1000,
        weight_limit_minute: 6000,
        kline_call_weight: 2,
        concurrent_sync_tasks: 10,
    },
    client: ClientDefaults {
        timeout_ms: 10_000,
        retries: 5,
        backoff_ms: 1_000,
        max_backoff_ms: 16_000,
    },
};
