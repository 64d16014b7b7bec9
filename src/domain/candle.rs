use serde::{Deserialize, Serialize};

// One closed (or still forming) kline at the base interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp_ms: i64,

    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub close_price: f64,

    pub base_asset_volume: f64,
    pub quote_asset_volume: f64,
}

impl Candle {
    // A constructor for convenience
    pub fn new(
        timestamp_ms: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        base_vol: f64,
        quote_vol: f64,
    ) -> Self {
        Candle {
            timestamp_ms,
            open_price: open,
            high_price: high,
            low_price: low,
            close_price: close,
            base_asset_volume: base_vol,
            quote_asset_volume: quote_vol,
        }
    }

    /// A candle that only carries a close (tests and synthetic series).
    pub fn flat(timestamp_ms: i64, close: f64) -> Self {
        Self::new(timestamp_ms, close, close, close, close, 0.0, 0.0)
    }

    /// True once the candle's interval has fully elapsed at `now_ms`.
    pub fn is_closed(&self, interval_ms: i64, now_ms: i64) -> bool {
        self.timestamp_ms + interval_ms <= now_ms
    }

    /// Prices must be finite and strictly positive for returns to mean anything.
    pub fn has_valid_close(&self) -> bool {
        self.close_price.is_finite() && self.close_price > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closes_at_the_end_of_its_interval() {
        let c = Candle::flat(1_000, 10.0);
        assert!(!c.is_closed(300, 1_299));
        assert!(c.is_closed(300, 1_300));
    }

    #[test]
    fn rejects_non_positive_close() {
        assert!(!Candle::flat(0, 0.0).has_valid_close());
        assert!(!Candle::flat(0, f64::NAN).has_valid_close());
        assert!(Candle::flat(0, 0.5).has_valid_close());
    }
}
