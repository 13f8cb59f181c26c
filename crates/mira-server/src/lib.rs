//! HTTP surface for Mira.
//!
//! Routes:
//! - `GET /`: liveness text
//! - `GET /debug`: configuration summary with the API key masked
//! - `POST /query`: managed backend
//! - `POST /query-direct`: in-process Postgres backend

use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

pub use config::ServerConfig;
pub use state::AppState;

/// Create the application router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/debug", get(handlers::debug_info))
        .route("/query", post(handlers::query))
        .route("/query-direct", post(handlers::query_direct))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
