use async_trait::async_trait;
use bigdecimal::BigDecimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PriceProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to parse price for {coin}: {reason}")]
    Parse { coin: String, reason: String },

    #[error("coin {coin} not found in response. Available coins in response: {available:?}")]
    CoinNotFound { coin: String, available: Vec<String> },

    #[error("coin {coin} not found. Response (first 500 chars): {snippet}")]
    UnexpectedPayload { coin: String, snippet: String },
}

/// Source of current mid prices.
///
/// One call is one upstream request; callers retry by calling again on their
/// next cycle.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    async fn fetch_mid_price(&self, coin: &str) -> Result<BigDecimal, PriceProviderError>;
}
