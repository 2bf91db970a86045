use axum::routing::get;
use axum::Router;
use http::{header, Method};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::routes::{health, prices};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::ORIGIN, header::CONTENT_TYPE, header::ACCEPT]);

    Router::<AppState>::new()
        .nest("/health", health::router())
        .nest("/api/prices", prices::router())
        // Nesting only maps "/" to the bare prefix; the trailing-slash form
        // is an empty symbol too.
        .route("/api/prices/", get(prices::missing_coin))
        .layer(cors)
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
