//! Client errors raised before a backend is invoked.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing required parameters: dbType, connectionString, nlQuery, userId")]
    MissingParameters,

    #[error("Only PostgreSQL is supported in direct mode")]
    DirectRequiresPostgres,

    #[error("Unsupported dbType: {0}")]
    UnsupportedDbType(String),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "error": self.to_string(),
            })),
        )
            .into_response()
    }
}
