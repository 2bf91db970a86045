use chrono::{DateTime, Duration, Utc};
use tracing::error;

use crate::errors::AppError;
use crate::external::price_provider::PriceProvider;
use crate::models::{CoinPrice, PriceComparisonResponse, PriceResponse};
use crate::store::PriceStore;

/// Fetch the current mid price for `coin` and append it to the store.
pub async fn refresh_price(
    store: &dyn PriceStore,
    provider: &dyn PriceProvider,
    coin: &str,
) -> Result<CoinPrice, AppError> {
    let price = provider.fetch_mid_price(coin).await?;
    let saved = store.insert(coin, &price).await?;
    Ok(saved)
}

/// Observations for `coin` created within `window` of `now`, newest first.
///
/// A blank coin is rejected before the store is touched. An unknown coin is
/// not an error; it simply has no rows.
pub async fn get_recent_prices(
    store: &dyn PriceStore,
    coin: &str,
    window: Duration,
    now: DateTime<Utc>,
) -> Result<PriceComparisonResponse, AppError> {
    if coin.trim().is_empty() {
        return Err(AppError::Validation("coin symbol is required".to_string()));
    }

    let since = now - window;

    let count = store.count_since(coin, since).await.map_err(|e| {
        error!("Failed to count prices for coin {}: {}", coin, e);
        AppError::Db(e)
    })?;

    let prices = store.fetch_since(coin, since).await.map_err(|e| {
        error!("Failed to fetch prices for coin {}: {}", coin, e);
        AppError::Db(e)
    })?;

    Ok(PriceComparisonResponse {
        coin: coin.to_string(),
        prices: prices.into_iter().map(PriceResponse::from).collect(),
        count,
    })
}
