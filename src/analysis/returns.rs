use crate::error::BetaError;
use crate::models::{PriceSeries, ReturnSeries};

/// `return[i] = price[i] / price[i-1] - 1`, stamped with the later timestamp.
pub fn compute_returns(series: &PriceSeries) -> Result<ReturnSeries, BetaError> {
    if series.len() < 2 {
        return Err(BetaError::InsufficientData {
            stage: "returns",
            needed: 2,
            got: series.len(),
        });
    }

    let returns = series
        .close_prices
        .windows(2)
        .map(|w| w[1] / w[0] - 1.0)
        .collect();

    Ok(ReturnSeries {
        symbol: series.symbol().to_string(),
        timestamps: series.timestamps[1..].to_vec(),
        returns,
    })
}
