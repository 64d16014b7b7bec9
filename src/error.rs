//! Error taxonomy for the beta engine and its market-data provider.

use thiserror::Error;

use crate::domain::TimeRange;

/// All errors surfaced by `beta-scope` requests.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BetaError {
    #[error("no data for {symbol} over {range}: {reason}")]
    DataUnavailable {
        symbol: String,
        range: TimeRange,
        reason: String,
    },

    #[error("insufficient data at {stage}: needed {needed}, got {got}")]
    InsufficientData {
        stage: &'static str,
        needed: usize,
        got: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("cache failure: {0}")]
    Cache(String),
}

impl From<anyhow::Error> for BetaError {
    fn from(value: anyhow::Error) -> Self {
        // {:#} keeps the whole context chain on one line
        Self::Cache(format!("{:#}", value))
    }
}

/// Failure of a single provider call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("rate limited by provider: {0}")]
    RateLimited(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("provider call timed out after {0}ms")]
    Timeout(u64),

    #[error("provider rejected request: {0}")]
    Rejected(String),

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Transient failures are worth retrying after a backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::RateLimited(_) | FetchError::Transport(_) | FetchError::Timeout(_)
        )
    }
}
