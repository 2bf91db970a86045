use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use crate::models::CoinPrice;

pub async fn insert(
    pool: &PgPool,
    coin: &str,
    price: &BigDecimal,
) -> Result<CoinPrice, sqlx::Error> {
    sqlx::query_as::<_, CoinPrice>(
        r#"
        INSERT INTO coin_prices (id, coin, price)
        VALUES ($1, $2, $3)
        RETURNING id, coin, price, created_at, updated_at, deleted_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(coin)
    .bind(price)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        error!("Failed to insert price for coin {} (price: {}): {}", coin, price, e);
        e
    })
}

/// Count live observations for a coin created at or after `since`.
pub async fn count_since(
    pool: &PgPool,
    coin: &str,
    since: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM coin_prices
        WHERE coin = $1
          AND created_at >= $2
          AND deleted_at IS NULL
        "#,
    )
    .bind(coin)
    .bind(since)
    .fetch_one(pool)
    .await
}

/// Fetch live observations for a coin created at or after `since`.
///
/// Returns rows ordered by `created_at` descending (newest first).
pub async fn fetch_since(
    pool: &PgPool,
    coin: &str,
    since: DateTime<Utc>,
) -> Result<Vec<CoinPrice>, sqlx::Error> {
    sqlx::query_as::<_, CoinPrice>(
        r#"
        SELECT id, coin, price, created_at, updated_at, deleted_at
        FROM coin_prices
        WHERE coin = $1
          AND created_at >= $2
          AND deleted_at IS NULL
        ORDER BY created_at DESC
        "#,
    )
    .bind(coin)
    .bind(since)
    .fetch_all(pool)
    .await
}

/// Soft-delete every live observation created before `cutoff`.
///
/// Rows that are already soft-deleted are left alone, so repeated calls with
/// the same cutoff affect nothing after the first.
pub async fn soft_delete_before(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE coin_prices
        SET deleted_at = NOW()
        WHERE created_at < $1
          AND deleted_at IS NULL
        "#,
    )
    .bind(cutoff)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await
        .map(|_| ())
}
