use crate::error::ApiError;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mira_core::{DbType, QueryOutcome, QueryRequest};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{Instrument, info, info_span};

pub async fn root() -> &'static str {
    "Mira Backend is running!"
}

pub async fn debug_info(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "message": "Mira Backend Debug Info",
        "miraApiKey": state.cfg.masked_api_key(),
        "miraBaseUrl": state.cfg.mira_base_url,
        "backendPort": state.cfg.port,
    }))
}

/// `POST /query`: delegate to the managed service.
pub async fn query(
    State(state): State<Arc<AppState>>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = validated(body)?;
    request
        .db_type
        .parse::<DbType>()
        .map_err(|_| ApiError::UnsupportedDbType(request.db_type.clone()))?;

    let outcome = run(&state, Route::Managed, &request).await;
    let status = if outcome.is_success() {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    Ok((status, Json(outcome.to_json())).into_response())
}

/// `POST /query-direct`: run the in-process Postgres pipeline.
pub async fn query_direct(
    State(state): State<Arc<AppState>>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = validated(body)?;
    if request.db_type.parse::<DbType>().ok() != Some(DbType::Postgres) {
        return Err(ApiError::DirectRequiresPostgres);
    }

    let outcome = run(&state, Route::Direct, &request).await;
    let status = if outcome.is_success() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((status, Json(outcome.to_json())).into_response())
}

#[derive(Clone, Copy)]
enum Route {
    Direct,
    Managed,
}

fn validated(body: Result<Json<QueryRequest>, JsonRejection>) -> Result<QueryRequest, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::InvalidBody(e.body_text()))?;
    if !request.is_complete() {
        return Err(ApiError::MissingParameters);
    }
    Ok(request)
}

async fn run(state: &AppState, route: Route, request: &QueryRequest) -> QueryOutcome {
    let backend = match route {
        Route::Direct => &state.direct,
        Route::Managed => &state.managed,
    };

    let span = info_span!(
        "query",
        request_id = %uuid::Uuid::new_v4(),
        backend = backend.name(),
        db_type = %request.db_type,
        user_id = %request.user_id,
    );

    async {
        info!(nl_query = %request.nl_query, "received query request");
        let outcome = backend.execute(request).await;
        info!(success = outcome.is_success(), "query finished");
        outcome
    }
    .instrument(span)
    .await
}
