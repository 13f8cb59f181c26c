//! The tagged result of running one natural-language query.

use serde::Serialize;
use serde_json::{Value, json};
use std::fmt;

/// Message used when an error carries no text of its own.
pub const FALLBACK_ERROR_MESSAGE: &str = "Unknown error occurred";

/// Which step of a pipeline failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    /// Establishing or probing the database connection.
    Connection,
    /// Reading the catalog.
    Schema,
    /// Calling the completion endpoint or reading its response.
    Generation,
    /// Running the generated statement.
    Execution,
    /// The request named a database the backend cannot serve.
    Unsupported,
    /// The managed service reported an error.
    Upstream { code: String },
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Connection => f.write_str("connection"),
            FailureKind::Schema => f.write_str("schema"),
            FailureKind::Generation => f.write_str("generation"),
            FailureKind::Execution => f.write_str("execution"),
            FailureKind::Unsupported => f.write_str("unsupported"),
            FailureKind::Upstream { code } => write!(f, "upstream ({})", code),
        }
    }
}

/// A terminal failure with a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryFailure {
    #[serde(flatten)]
    pub kind: FailureKind,
    pub message: String,
}

impl QueryFailure {
    /// Build a failure, substituting the fallback text for an empty message.
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            FALLBACK_ERROR_MESSAGE.to_string()
        } else {
            message
        };
        Self { kind, message }
    }

    /// Error code for responses that expose one.
    pub fn code(&self) -> Option<&str> {
        match &self.kind {
            FailureKind::Upstream { code } => Some(code),
            _ => None,
        }
    }
}

/// Result of one query request. There is no partial success.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Success {
        rows: Vec<Value>,
        /// Statement that produced the rows, when the backend exposes it.
        sql: Option<String>,
    },
    Failure(QueryFailure),
}

impl QueryOutcome {
    pub fn success(rows: Vec<Value>, sql: impl Into<String>) -> Self {
        QueryOutcome::Success {
            rows,
            sql: Some(sql.into()),
        }
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        QueryOutcome::Failure(QueryFailure::new(kind, message))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, QueryOutcome::Success { .. })
    }

    pub fn rows(&self) -> Option<&[Value]> {
        match self {
            QueryOutcome::Success { rows, .. } => Some(rows),
            QueryOutcome::Failure(_) => None,
        }
    }

    pub fn sql(&self) -> Option<&str> {
        match self {
            QueryOutcome::Success { sql, .. } => sql.as_deref(),
            QueryOutcome::Failure(_) => None,
        }
    }

    pub fn failure_ref(&self) -> Option<&QueryFailure> {
        match self {
            QueryOutcome::Success { .. } => None,
            QueryOutcome::Failure(f) => Some(f),
        }
    }

    /// JSON body in the `{success, data, sql}` / `{success, error}` shape.
    pub fn to_json(&self) -> Value {
        match self {
            QueryOutcome::Success { rows, sql: Some(sql) } => json!({
                "success": true,
                "data": rows,
                "sql": sql,
            }),
            QueryOutcome::Success { rows, sql: None } => json!({
                "success": true,
                "data": rows,
            }),
            QueryOutcome::Failure(f) => match f.code() {
                Some(code) => json!({
                    "success": false,
                    "error": f.message,
                    "code": code,
                }),
                None => json!({
                    "success": false,
                    "error": f.message,
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_message_falls_back() {
        let f = QueryFailure::new(FailureKind::Execution, "  ");
        assert_eq!(f.message, FALLBACK_ERROR_MESSAGE);
    }

    #[test]
    fn test_success_json() {
        let outcome = QueryOutcome::success(vec![json!({"id": 1})], "SELECT id FROM users");
        assert_eq!(
            outcome.to_json(),
            json!({"success": true, "data": [{"id": 1}], "sql": "SELECT id FROM users"})
        );
        assert_eq!(outcome.sql(), Some("SELECT id FROM users"));
        assert_eq!(outcome.rows().map(|r| r.len()), Some(1));
    }

    #[test]
    fn test_failure_json() {
        let outcome = QueryOutcome::failure(FailureKind::Connection, "connection refused");
        assert_eq!(
            outcome.to_json(),
            json!({"success": false, "error": "connection refused"})
        );
        assert!(!outcome.is_success());
        assert!(outcome.rows().is_none());
    }

    #[test]
    fn test_upstream_failure_json_has_code() {
        let outcome = QueryOutcome::failure(
            FailureKind::Upstream {
                code: "INVALID_QUERY".to_string(),
            },
            "bad query",
        );
        assert_eq!(
            outcome.to_json(),
            json!({"success": false, "error": "bad query", "code": "INVALID_QUERY"})
        );
    }
}
