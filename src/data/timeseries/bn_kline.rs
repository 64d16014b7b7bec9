use {
    binance_sdk::{
        config::ConfigurationRestApi,
        errors::{self, ConnectorError as connection_error},
        spot::{
            SpotRestApi,
            rest_api::{KlinesIntervalEnum, KlinesItemInner, KlinesParams, RestApi},
        },
    },
    std::convert::TryFrom,
};

use crate::{
    config::{BinanceApiConfig, DF},
    domain::{Candle, PairInterval, TimeRange},
    error::FetchError,
    utils::TimeUtils,
};

pub fn try_interval_from_ms(ms: i64) -> Result<KlinesIntervalEnum, FetchError> {
    use TimeUtils as T;
    match ms {
        T::MS_IN_S => Ok(KlinesIntervalEnum::Interval1s),
        T::MS_IN_MIN => Ok(KlinesIntervalEnum::Interval1m),
        T::MS_IN_3_MIN => Ok(KlinesIntervalEnum::Interval3m),
        T::MS_IN_5_MIN => Ok(KlinesIntervalEnum::Interval5m),
        T::MS_IN_15_MIN => Ok(KlinesIntervalEnum::Interval15m),
        T::MS_IN_30_MIN => Ok(KlinesIntervalEnum::Interval30m),
        T::MS_IN_H => Ok(KlinesIntervalEnum::Interval1h),
        T::MS_IN_2_H => Ok(KlinesIntervalEnum::Interval2h),
        T::MS_IN_4_H => Ok(KlinesIntervalEnum::Interval4h),
        T::MS_IN_6_H => Ok(KlinesIntervalEnum::Interval6h),
        T::MS_IN_8_H => Ok(KlinesIntervalEnum::Interval8h),
        T::MS_IN_12_H => Ok(KlinesIntervalEnum::Interval12h),
        T::MS_IN_D => Ok(KlinesIntervalEnum::Interval1d),
        T::MS_IN_3_D => Ok(KlinesIntervalEnum::Interval3d),
        T::MS_IN_W => Ok(KlinesIntervalEnum::Interval1w),
        T::MS_IN_1_M => Ok(KlinesIntervalEnum::Interval1M),
        _ => Err(FetchError::Rejected(format!("Unsupported interval: {}ms", ms))),
    }
}

/// One raw kline row: open time, then OHLCV as strings.
#[derive(Debug, PartialOrd, PartialEq)]
pub struct BNKline {
    pub open_timestamp_ms: i64,
    pub open_price: Option<f64>,
    pub high_price: Option<f64>,
    pub low_price: Option<f64>,
    pub close_price: Option<f64>,
    pub base_asset_volume: Option<f64>,
    pub quote_asset_volume: Option<f64>,
}

fn convert_kline_item_inner_enum_string_to_float(kline: Option<KlinesItemInner>) -> Option<f64> {
    kline.and_then(|inner| {
        if let KlinesItemInner::String(s) = inner {
            s.parse::<f64>().ok()
        } else {
            None
        }
    })
}

impl TryFrom<Vec<KlinesItemInner>> for BNKline {
    type Error = FetchError;

    fn try_from(vec_inner_klines: Vec<KlinesItemInner>) -> Result<Self, Self::Error> {
        let mut items = vec_inner_klines.into_iter();
        let open_timestamp_ms = match items.next() {
            Some(KlinesItemInner::Integer(a)) => a,
            Some(_) => return Err(FetchError::Malformed("open_time is not an integer".into())),
            None => return Err(FetchError::Malformed("empty kline row".into())),
        };

        let open_price = convert_kline_item_inner_enum_string_to_float(items.next());
        let high_price = convert_kline_item_inner_enum_string_to_float(items.next());
        let low_price = convert_kline_item_inner_enum_string_to_float(items.next());
        let close_price = convert_kline_item_inner_enum_string_to_float(items.next());
        let volume = convert_kline_item_inner_enum_string_to_float(items.next());
        let _ = items.next(); // close_time, derivable from open_time + interval
        let quote_asset_volume = convert_kline_item_inner_enum_string_to_float(items.next());

        Ok(BNKline {
            open_timestamp_ms,
            open_price,
            high_price,
            low_price,
            close_price,
            base_asset_volume: volume,
            quote_asset_volume,
        })
    }
}

impl TryFrom<BNKline> for Candle {
    type Error = FetchError;

    fn try_from(bn: BNKline) -> Result<Self, Self::Error> {
        let close = bn.close_price.ok_or_else(|| {
            FetchError::Malformed(format!("kline at {} has no close", bn.open_timestamp_ms))
        })?;
        Ok(Candle::new(
            bn.open_timestamp_ms,
            bn.open_price.unwrap_or(close),
            bn.high_price.unwrap_or(close),
            bn.low_price.unwrap_or(close),
            close,
            bn.base_asset_volume.unwrap_or_default(),
            bn.quote_asset_volume.unwrap_or_default(),
        ))
    }
}

pub(crate) fn convert_klines(data: Vec<Vec<KlinesItemInner>>) -> Result<Vec<Candle>, FetchError> {
    data.into_iter()
        .map(|row| BNKline::try_from(row).and_then(Candle::try_from))
        .collect()
}

/// Builds the REST client once per provider. The SDK's own retries are
/// switched off; the fetcher owns retry and backoff.
pub(crate) fn configure_binance_client(config: &BinanceApiConfig) -> Result<RestApi, FetchError> {
    let rest_conf = ConfigurationRestApi::builder()
        .timeout(config.timeout_ms)
        .retries(0)
        .backoff(config.backoff_ms)
        .build()
        .map_err(|e| FetchError::Rejected(format!("Binance client configuration: {}", e)))?;
    Ok(SpotRestApi::production(rest_conf))
}

/// Sorts a connector failure into transient and fatal buckets.
fn classify_error(e: &anyhow::Error, pair_interval: &PairInterval) -> FetchError {
    let Some(conn_err) = e.downcast_ref::<errors::ConnectorError>() else {
        log::error!(
            "An unexpected error occurred for {}: {:#}",
            pair_interval,
            e
        );
        return FetchError::Transport(format!("{:#}", e));
    };

    match conn_err {
        connection_error::ConnectorClientError(msg) => {
            log::error!("{} Client error: check request parameters. {}", pair_interval, msg);
            FetchError::Rejected(msg.to_string())
        }
        connection_error::TooManyRequestsError(msg) => {
            log::warn!("{} Rate limit exceeded. {}", pair_interval, msg);
            FetchError::RateLimited(msg.to_string())
        }
        connection_error::RateLimitBanError(msg) => {
            log::error!(
                "{} IP address banned due to excessive rate limits. {}",
                pair_interval,
                msg
            );
            FetchError::Rejected(format!("rate limit ban: {}", msg))
        }
        errors::ConnectorError::ServerError { msg, status_code } => {
            log::error!(
                "{} Server error: {} (status code: {:?})",
                pair_interval,
                msg,
                status_code
            );
            FetchError::Transport(format!("server error {:?}: {}", status_code, msg))
        }
        errors::ConnectorError::NetworkError(msg) => {
            log::error!("{} Network error: {}", pair_interval, msg);
            FetchError::Transport(msg.to_string())
        }
        errors::ConnectorError::NotFoundError(msg) => {
            log::error!("{} Resource not found. {}", pair_interval, msg);
            FetchError::Rejected(msg.to_string())
        }
        connection_error::BadRequestError(msg) => {
            log::warn!("{} Bad request: {}", pair_interval, msg);
            FetchError::Rejected(msg.to_string())
        }
        other => {
            log::error!("Unexpected ConnectorError variant: {:?}", other);
            FetchError::Transport(other.to_string())
        }
    }
}

/// One klines call: candles with open time in `range`, at most `limit` of them.
pub(crate) async fn fetch_klines_page(
    rest_client: &RestApi,
    pair_interval: &PairInterval,
    range: TimeRange,
    limit: usize,
) -> Result<Vec<Candle>, FetchError> {
    let params = KlinesParams::builder(
        pair_interval.bn_name().to_string(),
        try_interval_from_ms(pair_interval.interval_ms)?,
    )
    .limit(limit as i32)
    .start_time(Some(range.start_ms))
    .end_time(Some(range.end_ms))
    .build()
    .map_err(|e| FetchError::Rejected(format!("klines params: {}", e)))?;

    if DF.log_fetcher {
        log::info!("{} klines page {}", pair_interval, range);
    }

    let response = rest_client
        .klines(params)
        .await
        .map_err(|e| classify_error(&e, pair_interval))?;
    let data = response
        .data()
        .await
        .map_err(|e| FetchError::Malformed(format!("{:#}", e)))?;

    convert_klines(data)
}
