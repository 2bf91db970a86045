use crate::errors::AppError;
use crate::services::job_scheduler_service::{JobContext, JobResult};
use crate::services::price_service;
use tracing::{error, info};

/// Fetch and store the current mid price of every tracked coin.
///
/// Coins are processed one after another. A failure for one coin is logged
/// and counted; it never stops the remaining coins and never fails the job.
pub async fn fetch_all_prices(ctx: JobContext) -> Result<JobResult, AppError> {
    info!("💰 Starting price fetch for {} tracked coins", ctx.tracked_coins.len());

    let mut processed = 0;
    let mut failed = 0;

    for coin in ctx.tracked_coins.iter() {
        match price_service::refresh_price(ctx.store.as_ref(), ctx.price_provider.as_ref(), coin).await {
            Ok(saved) => {
                processed += 1;
                info!("Saved {} price: {}", coin, saved.price);
            }
            Err(e) => {
                failed += 1;
                error!("Error fetching price for {}: {}", coin, e);
            }
        }
    }

    Ok(JobResult {
        items_processed: processed,
        items_failed: failed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::price_provider::{PriceProvider, PriceProviderError};
    use crate::store::InMemoryPriceStore;
    use async_trait::async_trait;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;
    use std::sync::Arc;

    struct PartialProvider;

    #[async_trait]
    impl PriceProvider for PartialProvider {
        async fn fetch_mid_price(&self, coin: &str) -> Result<BigDecimal, PriceProviderError> {
            match coin {
                "BTC" => Ok(BigDecimal::from_str("65000.5").unwrap()),
                "SOL" => Ok(BigDecimal::from_str("150.25").unwrap()),
                _ => Err(PriceProviderError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_failed_coin_does_not_abort_cycle() {
        let store = InMemoryPriceStore::new();
        let ctx = JobContext {
            store: Arc::new(store.clone()),
            price_provider: Arc::new(PartialProvider),
            tracked_coins: Arc::from(vec!["BTC".to_string(), "ETH".to_string(), "SOL".to_string()]),
            retention: chrono::Duration::days(2),
        };

        let result = fetch_all_prices(ctx).await.unwrap();

        assert_eq!(result, JobResult { items_processed: 2, items_failed: 1 });

        let mut coins: Vec<String> = store.snapshot().into_iter().map(|p| p.coin).collect();
        coins.sort();
        assert_eq!(coins, vec!["BTC", "SOL"]);
    }
}
