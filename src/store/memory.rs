use std::sync::Arc;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::models::CoinPrice;
use crate::store::PriceStore;

/// Process-local `PriceStore` with the same scoping rules as the Postgres
/// table. Used by tests and local runs without a database.
#[derive(Clone, Default)]
pub struct InMemoryPriceStore {
    rows: Arc<Mutex<Vec<CoinPrice>>>,
}

impl InMemoryPriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an observation with an explicit creation time.
    pub fn insert_at(&self, coin: &str, price: BigDecimal, created_at: DateTime<Utc>) -> CoinPrice {
        let row = CoinPrice::new(coin, price, created_at);
        self.rows.lock().push(row.clone());
        row
    }

    /// Every row, soft-deleted ones included.
    pub fn snapshot(&self) -> Vec<CoinPrice> {
        self.rows.lock().clone()
    }

    fn live_since(&self, coin: &str, since: DateTime<Utc>) -> Vec<CoinPrice> {
        self.rows
            .lock()
            .iter()
            .filter(|p| !p.is_deleted() && p.coin == coin && p.created_at >= since)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PriceStore for InMemoryPriceStore {
    async fn insert(&self, coin: &str, price: &BigDecimal) -> Result<CoinPrice, sqlx::Error> {
        Ok(self.insert_at(coin, price.clone(), Utc::now()))
    }

    async fn count_since(&self, coin: &str, since: DateTime<Utc>) -> Result<i64, sqlx::Error> {
        Ok(self.live_since(coin, since).len() as i64)
    }

    async fn fetch_since(
        &self,
        coin: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<CoinPrice>, sqlx::Error> {
        let mut rows = self.live_since(coin, since);
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn soft_delete_before(&self, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let now = Utc::now();
        let mut affected = 0;
        for row in self.rows.lock().iter_mut() {
            if row.deleted_at.is_none() && row.created_at < cutoff {
                row.deleted_at = Some(now);
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::str::FromStr;

    fn price(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_since_is_newest_first() {
        let store = InMemoryPriceStore::new();
        let now = Utc::now();

        store.insert_at("BTC", price("1"), now - Duration::hours(3));
        store.insert_at("BTC", price("3"), now - Duration::hours(1));
        store.insert_at("BTC", price("2"), now - Duration::hours(2));

        let rows = store.fetch_since("BTC", now - Duration::hours(24)).await.unwrap();
        let prices: Vec<_> = rows.iter().map(|r| r.price.clone()).collect();
        assert_eq!(prices, vec![price("3"), price("2"), price("1")]);
    }

    #[tokio::test]
    async fn test_coin_match_is_exact() {
        let store = InMemoryPriceStore::new();
        store.insert_at("ETH", price("3000"), Utc::now());

        let since = Utc::now() - Duration::hours(1);
        assert_eq!(store.count_since("ETH", since).await.unwrap(), 1);
        assert_eq!(store.count_since("eth", since).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_soft_delete_keeps_rows_but_hides_them() {
        let store = InMemoryPriceStore::new();
        let now = Utc::now();
        store.insert_at("SOL", price("150"), now - Duration::hours(1));

        let affected = store.soft_delete_before(now).await.unwrap();
        assert_eq!(affected, 1);

        assert_eq!(store.snapshot().len(), 1);
        assert!(store.snapshot()[0].is_deleted());
        assert!(store.fetch_since("SOL", now - Duration::hours(24)).await.unwrap().is_empty());
        assert_eq!(store.soft_delete_before(now).await.unwrap(), 0);
    }
}
