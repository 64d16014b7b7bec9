use {
    crate::{
        config::ChangePct,
        domain::{Candle, PairInterval},
    },
    serde::{Deserialize, Serialize},
    std::cmp::Ordering,
};

/// Close prices for one symbol at a fixed interval, strictly increasing in time.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PriceSeries {
    pub pair_interval: PairInterval,
    pub timestamps: Vec<i64>,
    pub close_prices: Vec<f64>,
    /// Set when the provider could not deliver the whole requested range.
    pub incomplete: bool,
}

impl PriceSeries {
    pub fn empty(pair_interval: PairInterval) -> Self {
        Self {
            pair_interval,
            timestamps: vec![],
            close_prices: vec![],
            incomplete: false,
        }
    }

    /// Sorts, drops duplicate timestamps (first wins) and unusable closes.
    pub fn from_candles(pair_interval: PairInterval, mut candles: Vec<Candle>) -> Self {
        candles.sort_by_key(|c| c.timestamp_ms);
        candles.dedup_by_key(|c| c.timestamp_ms);

        let before = candles.len();
        candles.retain(Candle::has_valid_close);
        if candles.len() != before {
            log::warn!(
                "{}: dropped {} candle(s) with a non-positive or non-finite close",
                pair_interval.name(),
                before - candles.len()
            );
        }

        let (timestamps, close_prices) = candles
            .iter()
            .map(|c| (c.timestamp_ms, c.close_price))
            .unzip();

        Self {
            pair_interval,
            timestamps,
            close_prices,
            incomplete: false,
        }
    }

    pub fn with_incomplete(mut self, incomplete: bool) -> Self {
        self.incomplete = incomplete;
        self
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn symbol(&self) -> &str {
        self.pair_interval.name()
    }

    pub fn first_close(&self) -> Option<f64> {
        self.close_prices.first().copied()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.close_prices.last().copied()
    }

    /// Number of places where consecutive samples are further apart than one interval.
    pub fn gap_count(&self) -> usize {
        let step = self.pair_interval.interval_ms;
        self.timestamps
            .windows(2)
            .filter(|w| w[1] - w[0] > step)
            .count()
    }

    /// Change from the first to the last close.
    pub fn price_change(&self) -> Option<ChangePct> {
        match (self.first_close(), self.last_close()) {
            (Some(first), Some(last)) => Some(ChangePct::calculate(last, first)),
            _ => None,
        }
    }

    /// Keeps only the samples whose timestamp passes `keep`.
    pub fn filtered(&self, keep: impl Fn(i64) -> bool) -> Self {
        let (timestamps, close_prices) = self
            .timestamps
            .iter()
            .zip(&self.close_prices)
            .filter(|(ts, _)| keep(**ts))
            .map(|(ts, p)| (*ts, *p))
            .unzip();
        Self {
            pair_interval: self.pair_interval.clone(),
            timestamps,
            close_prices,
            incomplete: self.incomplete,
        }
    }

    /// Truncates both series to the timestamps they share.
    pub fn align(asset: &PriceSeries, bench: &PriceSeries) -> (PriceSeries, PriceSeries) {
        let mut a_out = PriceSeries::empty(asset.pair_interval.clone());
        let mut b_out = PriceSeries::empty(bench.pair_interval.clone());
        a_out.incomplete = asset.incomplete;
        b_out.incomplete = bench.incomplete;

        let (mut i, mut j) = (0, 0);
        while i < asset.len() && j < bench.len() {
            match asset.timestamps[i].cmp(&bench.timestamps[j]) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    a_out.timestamps.push(asset.timestamps[i]);
                    a_out.close_prices.push(asset.close_prices[i]);
                    b_out.timestamps.push(bench.timestamps[j]);
                    b_out.close_prices.push(bench.close_prices[j]);
                    i += 1;
                    j += 1;
                }
            }
        }
        (a_out, b_out)
    }
}

/// Fractional returns; `timestamps[i]` is the timestamp of the later price.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReturnSeries {
    pub symbol: String,
    pub timestamps: Vec<i64>,
    pub returns: Vec<f64>,
}

impl ReturnSeries {
    pub fn len(&self) -> usize {
        self.returns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }
}
