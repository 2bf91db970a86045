use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::external::price_provider::PriceProviderError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("External error: {0}")]
    External(#[from] PriceProviderError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::External(_) => (StatusCode::BAD_GATEWAY, "upstream price source unavailable".to_string()),
            AppError::Db(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_string()),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
