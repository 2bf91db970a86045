use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::db::price_queries;
use crate::models::CoinPrice;
use crate::store::PriceStore;

/// `PriceStore` backed by the `coin_prices` table.
#[derive(Clone)]
pub struct PgPriceStore {
    pool: PgPool,
}

impl PgPriceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PriceStore for PgPriceStore {
    async fn insert(&self, coin: &str, price: &BigDecimal) -> Result<CoinPrice, sqlx::Error> {
        price_queries::insert(&self.pool, coin, price).await
    }

    async fn count_since(&self, coin: &str, since: DateTime<Utc>) -> Result<i64, sqlx::Error> {
        price_queries::count_since(&self.pool, coin, since).await
    }

    async fn fetch_since(
        &self,
        coin: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<CoinPrice>, sqlx::Error> {
        price_queries::fetch_since(&self.pool, coin, since).await
    }

    async fn soft_delete_before(&self, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        price_queries::soft_delete_before(&self.pool, cutoff).await
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        price_queries::ping(&self.pool).await
    }
}
