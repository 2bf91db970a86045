use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde::Serialize;

use crate::external::all_mids;
use crate::external::price_provider::{PriceProvider, PriceProviderError};

pub const HYPERLIQUID_API_URL: &str = "https://api.hyperliquid.xyz/info";

#[derive(Debug, Serialize)]
struct InfoRequest {
    #[serde(rename = "type")]
    request_type: &'static str,
}

const ALL_MIDS: InfoRequest = InfoRequest { request_type: "allMids" };

/// Client for the Hyperliquid `info` endpoint.
///
/// Every lookup downloads the full `allMids` snapshot and picks one coin out
/// of it; there is no per-coin endpoint.
pub struct HyperliquidProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HyperliquidProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, PriceProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PriceProviderError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_all_mids(&self) -> Result<Vec<u8>, PriceProviderError> {
        let resp = self
            .client
            .post(&self.base_url)
            .json(&ALL_MIDS)
            .send()
            .await
            .map_err(|e| PriceProviderError::Network(format!("failed to make request: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.bytes().await.unwrap_or_default();
            return Err(PriceProviderError::Status {
                status: status.as_u16(),
                body: all_mids::snippet(&body),
            });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| PriceProviderError::Network(format!("failed to read response body: {}", e)))?;

        Ok(body.to_vec())
    }
}

#[async_trait]
impl PriceProvider for HyperliquidProvider {
    async fn fetch_mid_price(&self, coin: &str) -> Result<BigDecimal, PriceProviderError> {
        let body = self.fetch_all_mids().await?;
        all_mids::extract_mid_price(&body, coin)
    }
}
