//! Observation store.
//!
//! `PriceStore` is the narrow interface the jobs and the HTTP layer use to
//! reach persisted coin prices. Every read goes through the soft-delete
//! default scope: rows with a `deleted_at` marker are never returned or
//! counted. Implementations must be safe for concurrent use; callers share a
//! single `Arc<dyn PriceStore>` and add no locking of their own.

mod memory;
mod postgres;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};

use crate::models::CoinPrice;

pub use memory::InMemoryPriceStore;
pub use postgres::PgPriceStore;

#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Append a new observation stamped with the current time.
    async fn insert(&self, coin: &str, price: &BigDecimal) -> Result<CoinPrice, sqlx::Error>;

    async fn count_since(&self, coin: &str, since: DateTime<Utc>) -> Result<i64, sqlx::Error>;

    /// Live observations for `coin` with `created_at >= since`, newest first.
    async fn fetch_since(
        &self,
        coin: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<CoinPrice>, sqlx::Error>;

    /// Soft-delete live observations with `created_at < cutoff`, returning the
    /// number of rows marked.
    async fn soft_delete_before(&self, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error>;

    async fn ping(&self) -> Result<(), sqlx::Error>;
}
