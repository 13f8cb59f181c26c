//! Client for the external managed query service.
//!
//! The managed service does schema introspection, prompting and execution on
//! its side; this backend only forwards the request and maps the answer onto a
//! [`QueryOutcome`].

use crate::backend::QueryBackend;
use async_trait::async_trait;
use mira_core::{FailureKind, QueryOutcome, QueryRequest};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

pub const DEFAULT_MANAGED_BASE_URL: &str = "https://mira-gtsn.onrender.com/api/v1";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ManagedQueryInput<'a> {
    db_type: &'a str,
    connection_string: &'a str,
    nl_query: &'a str,
    user_id: &'a str,
}

/// [`QueryBackend`] delegating to the managed service over HTTP.
#[derive(Clone)]
pub struct ManagedBackend {
    api_key: String,
    base_url: String,
    http_client: reqwest::Client,
}

impl ManagedBackend {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self::with_client(api_key, base_url, reqwest::Client::new())
    }

    pub fn with_client(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        }
    }
}

#[async_trait]
impl QueryBackend for ManagedBackend {
    fn name(&self) -> &'static str {
        "managed"
    }

    async fn execute(&self, request: &QueryRequest) -> QueryOutcome {
        let url = format!("{}/query", self.base_url);
        let input = ManagedQueryInput {
            db_type: &request.db_type,
            connection_string: &request.connection_string,
            nl_query: &request.nl_query,
            user_id: &request.user_id,
        };

        let response = match self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&input)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, url = %url, "managed service unreachable");
                return network_failure(e);
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, status = status.as_u16(), "failed to read managed service response");
                return network_failure(e);
            }
        };
        let parsed: Option<Value> = serde_json::from_str(&body).ok();

        if status.is_success() {
            if let Some(rows) = parsed.as_ref().and_then(extract_rows) {
                info!(rows = rows.len(), "managed query succeeded");
                return QueryOutcome::Success { rows, sql: None };
            }
        }

        let (code, message) = parsed
            .as_ref()
            .and_then(extract_error)
            .unwrap_or_else(|| (format!("HTTP_{}", status.as_u16()), body.clone()));
        error!(status = status.as_u16(), code = %code, message = %message, "managed query failed");
        QueryOutcome::failure(FailureKind::Upstream { code }, message)
    }
}

fn network_failure(err: reqwest::Error) -> QueryOutcome {
    QueryOutcome::failure(
        FailureKind::Upstream {
            code: "NETWORK_ERROR".to_string(),
        },
        err.to_string(),
    )
}

/// Rows from a success body: either a bare array or `{ data: [...] }`.
fn extract_rows(body: &Value) -> Option<Vec<Value>> {
    match body {
        Value::Array(rows) => Some(rows.clone()),
        Value::Object(obj) => match obj.get("data") {
            Some(Value::Array(rows)) if obj.get("success") != Some(&Value::Bool(false)) => {
                Some(rows.clone())
            }
            _ => None,
        },
        _ => None,
    }
}

/// `(code, message)` from `{code, message}` or `{error: {code, message}}` or
/// `{error: "...", code?: "..."}`.
fn extract_error(body: &Value) -> Option<(String, String)> {
    let str_field = |v: &Value, key: &str| v.get(key).and_then(|s| s.as_str()).map(str::to_string);

    let (source, message) = match body.get("error") {
        Some(Value::String(msg)) => (body, Some(msg.clone())),
        Some(err @ Value::Object(_)) => (err, str_field(err, "message")),
        _ => (body, str_field(body, "message")),
    };

    let message = message?;
    let code = str_field(source, "code")
        .or_else(|| str_field(body, "code"))
        .unwrap_or_else(|| "UNKNOWN_ERROR".to_string());
    Some((code, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use serde_json::json;

    async fn serve(status: StatusCode, body: Value) -> String {
        let app = Router::new().route(
            "/api/v1/query",
            post(move |Json(_req): Json<Value>| {
                let body = body.clone();
                async move { (status, Json(body)) }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/api/v1/", addr)
    }

    fn request() -> QueryRequest {
        QueryRequest {
            db_type: "postgres".to_string(),
            connection_string: "postgres://localhost/app".to_string(),
            nl_query: "list users".to_string(),
            user_id: "u1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_success_with_data_envelope() {
        let base = serve(StatusCode::OK, json!({ "success": true, "data": [{"id": 1}] })).await;
        let outcome = ManagedBackend::new("key", base).execute(&request()).await;
        assert_eq!(outcome.rows(), Some(&[json!({"id": 1})][..]));
        assert_eq!(outcome.sql(), None);
    }

    #[tokio::test]
    async fn test_success_with_bare_array() {
        let base = serve(StatusCode::OK, json!([{"id": 1}, {"id": 2}])).await;
        let outcome = ManagedBackend::new("key", base).execute(&request()).await;
        assert_eq!(outcome.rows().map(|r| r.len()), Some(2));
    }

    #[tokio::test]
    async fn test_error_body_maps_code_and_message() {
        let base = serve(
            StatusCode::BAD_REQUEST,
            json!({ "error": { "code": "INVALID_CONNECTION", "message": "cannot connect" } }),
        )
        .await;
        let outcome = ManagedBackend::new("key", base).execute(&request()).await;
        let failure = outcome.failure_ref().unwrap();
        assert_eq!(failure.code(), Some("INVALID_CONNECTION"));
        assert_eq!(failure.message, "cannot connect");
    }

    #[tokio::test]
    async fn test_unparseable_error_body_uses_status() {
        let base = serve(StatusCode::BAD_GATEWAY, json!("upstream down")).await;
        let outcome = ManagedBackend::new("key", base).execute(&request()).await;
        let failure = outcome.failure_ref().unwrap();
        assert_eq!(failure.code(), Some("HTTP_502"));
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let outcome = ManagedBackend::new("key", format!("http://{}", addr))
            .execute(&request())
            .await;
        assert_eq!(outcome.failure_ref().unwrap().code(), Some("NETWORK_ERROR"));
    }

    /// Answers one request with a 200 whose body is cut short.
    fn serve_truncated_body() -> String {
        use std::io::{Read, Write};

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 4096];
            while !request_complete(&received) {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
            }
            stream
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 100\r\n\r\n[{\"id\"")
                .unwrap();
        });
        format!("http://{}", addr)
    }

    fn request_complete(received: &[u8]) -> bool {
        let text = String::from_utf8_lossy(received);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        received.len() >= header_end + 4 + content_length
    }

    #[tokio::test]
    async fn test_failed_body_read_is_network_error() {
        let base = serve_truncated_body();
        let outcome = ManagedBackend::new("key", base).execute(&request()).await;
        let failure = outcome.failure_ref().unwrap();
        assert_eq!(failure.code(), Some("NETWORK_ERROR"));
        assert_ne!(failure.message, "Unknown error occurred");
    }

    #[test]
    fn test_extract_error_shapes() {
        assert_eq!(
            extract_error(&json!({"error": "bad", "code": "X"})),
            Some(("X".to_string(), "bad".to_string()))
        );
        assert_eq!(
            extract_error(&json!({"code": "Y", "message": "worse"})),
            Some(("Y".to_string(), "worse".to_string()))
        );
        assert_eq!(extract_error(&json!({"data": []})), None);
    }
}
