use thiserror::Error;

/// Errors surfaced by the exchange layer and the orchestrator.
///
/// The indicator engine, signal generator and position manager never return
/// these: not having enough history is a HOLD, not an error.
#[derive(Debug, Error)]
pub enum BotError {
    /// Fetch failed (network, HTTP, decode). The cycle is skipped.
    #[error("market data unavailable: {0}")]
    DataUnavailable(String),

    /// The exchange refused the order. Position state must not change.
    #[error("order rejected: {0}")]
    OrderRejected(String),

    /// Data arrived but cannot be trusted (non-finite prices, unordered candles).
    #[error("invalid market data: {0}")]
    InvalidData(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl BotError {
    /// Transient errors are retried on the normal poll interval; anything else
    /// triggers the longer error backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, BotError::DataUnavailable(_) | BotError::OrderRejected(_))
    }
}

impl From<reqwest::Error> for BotError {
    fn from(err: reqwest::Error) -> Self {
        BotError::DataUnavailable(err.to_string())
    }
}

impl From<::config::ConfigError> for BotError {
    fn from(err: ::config::ConfigError) -> Self {
        BotError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
