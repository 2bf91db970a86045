use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{ser, Deserialize, Serialize, Serializer};
use sqlx::FromRow;
use uuid::Uuid;

// One mid-price observation for a coin, as stored in `coin_prices`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CoinPrice {
    pub id: Uuid,
    pub coin: String,
    pub price: BigDecimal,          // NUMERIC(20, 8)
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>, // soft-delete marker
}

impl CoinPrice {
    pub fn new(coin: impl Into<String>, price: BigDecimal, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            coin: coin.into(),
            price,
            created_at,
            updated_at: created_at,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A single entry of the `/api/prices/:coin` response.
#[derive(Debug, Clone, Serialize)]
pub struct PriceResponse {
    pub coin: String,
    #[serde(serialize_with = "ser_price_number")]
    pub price: BigDecimal,
    pub created_at: DateTime<Utc>,
}

impl From<CoinPrice> for PriceResponse {
    fn from(value: CoinPrice) -> Self {
        Self {
            coin: value.coin,
            price: value.price,
            created_at: value.created_at,
        }
    }
}

/// Recent history for one coin, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct PriceComparisonResponse {
    pub coin: String,
    pub prices: Vec<PriceResponse>,
    pub count: i64,
}

// API clients read `price` as a plain JSON number. Going through the decimal
// text keeps the nearest f64 to the stored NUMERIC value.
fn ser_price_number<S>(price: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match price.to_string().parse::<f64>() {
        Ok(value) if value.is_finite() => serializer.serialize_f64(value),
        _ => Err(ser::Error::custom(format!("price {} does not fit in f64", price))),
    }
}
