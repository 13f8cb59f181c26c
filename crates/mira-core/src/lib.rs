use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

pub mod connection;
pub mod error;
pub mod outcome;
pub mod prompt;
pub mod schema;
pub mod sql;

pub use connection::{ConnectionDescriptor, SslModeHint, sanitize_connection_string};
pub use error::CoreError;
pub use outcome::{FailureKind, QueryFailure, QueryOutcome};
pub use prompt::{DEFAULT_ROW_LIMIT, build_prompt, render_schema};
pub use schema::{CatalogRow, ColumnDescriptor, SchemaInventory, TableDescriptor};
pub use sql::{GeneratedQuery, sanitize_generated_sql};

/// Database engines a caller can name in a request.
///
/// Only `Postgres` is served by the direct path; the managed service also
/// understands `MongoDb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    Postgres,
    #[serde(rename = "mongodb")]
    MongoDb,
}

impl DbType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DbType::Postgres => "postgres",
            DbType::MongoDb => "mongodb",
        }
    }

    /// Human-readable SQL dialect name used in prompts.
    pub fn dialect(&self) -> &'static str {
        match self {
            DbType::Postgres => "PostgreSQL",
            DbType::MongoDb => "MongoDB",
        }
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DbType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "postgres" => Ok(DbType::Postgres),
            "mongodb" => Ok(DbType::MongoDb),
            other => Err(CoreError::UnsupportedDbType(other.to_string())),
        }
    }
}

/// A natural-language query as received from a client.
///
/// Field names follow the JSON wire format (`dbType`, `connectionString`, ...).
/// Every field is optional at the deserialization layer and accepts any JSON
/// value, so the HTTP glue can report missing parameters itself instead of
/// failing in the extractor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    #[serde(default, deserialize_with = "loose_param")]
    pub db_type: String,
    #[serde(default, deserialize_with = "loose_param")]
    pub connection_string: String,
    #[serde(default, deserialize_with = "loose_param")]
    pub nl_query: String,
    #[serde(default, deserialize_with = "loose_param")]
    pub user_id: String,
}

/// `null`, `false` and `0` read as absent; other scalars keep their text form.
fn loose_param<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null | Value::Bool(false) => String::new(),
        Value::Number(n) if n.as_f64() == Some(0.0) => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

impl QueryRequest {
    /// True when every required parameter is present and non-empty.
    pub fn is_complete(&self) -> bool {
        !self.db_type.is_empty()
            && !self.connection_string.is_empty()
            && !self.nl_query.is_empty()
            && !self.user_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_type_parse() {
        assert_eq!("postgres".parse::<DbType>().unwrap(), DbType::Postgres);
        assert_eq!("mongodb".parse::<DbType>().unwrap(), DbType::MongoDb);
        assert!("mysql".parse::<DbType>().is_err());
        assert!("Postgres".parse::<DbType>().is_err());
    }

    #[test]
    fn test_query_request_wire_format() {
        let req: QueryRequest = serde_json::from_str(
            r#"{"dbType":"postgres","connectionString":"postgres://x","nlQuery":"list users","userId":"u1"}"#,
        )
        .unwrap();
        assert_eq!(req.db_type, "postgres");
        assert_eq!(req.nl_query, "list users");
        assert!(req.is_complete());
    }

    #[test]
    fn test_query_request_missing_fields() {
        let req: QueryRequest =
            serde_json::from_str(r#"{"dbType":"postgres","nlQuery":"x"}"#).unwrap();
        assert!(!req.is_complete());

        let req: QueryRequest = serde_json::from_str(
            r#"{"dbType":"postgres","connectionString":"","nlQuery":"x","userId":"u"}"#,
        )
        .unwrap();
        assert!(!req.is_complete());
    }

    #[test]
    fn test_query_request_loose_values() {
        let req: QueryRequest = serde_json::from_str(
            r#"{"dbType":"postgres","connectionString":"postgres://x","nlQuery":"q","userId":42}"#,
        )
        .unwrap();
        assert_eq!(req.user_id, "42");
        assert!(req.is_complete());

        let req: QueryRequest = serde_json::from_str(
            r#"{"dbType":"postgres","connectionString":"postgres://x","nlQuery":"q","userId":null}"#,
        )
        .unwrap();
        assert_eq!(req.user_id, "");
        assert!(!req.is_complete());
    }
}
