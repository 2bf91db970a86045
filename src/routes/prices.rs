use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use tracing::info;

use crate::errors::AppError;
use crate::models::PriceComparisonResponse;
use crate::services;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(missing_coin))
        .route("/:coin", get(get_price_comparison))
}

/// GET /api/prices/:coin - prices for a coin within the query window (24h by default)
pub async fn get_price_comparison(
    Path(coin): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<PriceComparisonResponse>, AppError> {
    info!("GET /api/prices/{} - Getting recent prices", coin);
    let response = services::price_service::get_recent_prices(
        state.store.as_ref(),
        &coin,
        state.query_window,
        Utc::now(),
    )
    .await?;
    Ok(Json(response))
}

pub(crate) async fn missing_coin() -> AppError {
    AppError::Validation("coin symbol is required".to_string())
}
