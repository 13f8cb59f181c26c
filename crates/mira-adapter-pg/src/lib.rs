//! Direct natural-language query path for PostgreSQL.
//!
//! [`DirectQueryEngine`] runs the whole pipeline in-process: it opens one
//! connection, probes it, reads the catalog, asks a [`SqlGenerator`] for a
//! statement, runs that statement and closes the connection on every path.

use async_trait::async_trait;
use mira_core::{
    ConnectionDescriptor, DbType, GeneratedQuery, QueryOutcome, QueryRequest, SslModeHint,
    build_prompt,
};
use mira_runtime::{QueryBackend, SqlGenerator};
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use sqlx::{Connection, PgConnection};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub mod error;
pub mod introspect;
pub mod rows;

pub use error::DirectQueryError;
pub use introspect::extract_schema;
pub use rows::row_to_json;

use error::database_message;

/// Certificate handling for database connections.
///
/// The default accepts any server certificate. It is an explicit trade-off so
/// that hosted databases with self-signed or private-CA certificates work out
/// of the box; set [`TlsPolicy::Verify`] to honour the connection string's
/// `sslmode` as written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsPolicy {
    #[default]
    AcceptInvalidCerts,
    Verify,
}

impl TlsPolicy {
    /// The `sslmode` to force on the driver, if any.
    ///
    /// Under `AcceptInvalidCerts` a connection is encrypted without verifying
    /// the peer, unless the connection string explicitly disables TLS or only
    /// asks for it opportunistically.
    pub fn ssl_mode_override(&self, requested: Option<SslModeHint>) -> Option<PgSslMode> {
        match (self, requested) {
            (TlsPolicy::Verify, _) => None,
            (
                TlsPolicy::AcceptInvalidCerts,
                Some(SslModeHint::Disable | SslModeHint::Allow | SslModeHint::Prefer),
            ) => None,
            (TlsPolicy::AcceptInvalidCerts, _) => Some(PgSslMode::Require),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DirectQueryOptions {
    /// Upper bound on establishing the connection. Later steps rely on the
    /// driver's and HTTP client's own defaults.
    pub connect_timeout: Duration,
    pub tls_policy: TlsPolicy,
}

impl Default for DirectQueryOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            tls_policy: TlsPolicy::default(),
        }
    }
}

/// In-process implementation of the natural-language query pipeline.
pub struct DirectQueryEngine {
    generator: Arc<dyn SqlGenerator>,
    api_key: String,
    options: DirectQueryOptions,
}

impl DirectQueryEngine {
    pub fn new(
        generator: Arc<dyn SqlGenerator>,
        api_key: impl Into<String>,
        options: DirectQueryOptions,
    ) -> Self {
        Self {
            generator,
            api_key: api_key.into(),
            options,
        }
    }

    /// Answer `nl_query` against the database behind `connection_string`.
    ///
    /// Every failure is reported through the returned outcome.
    pub async fn execute_direct_query(
        &self,
        connection_string: &str,
        nl_query: &str,
        db_type: &str,
        api_key: &str,
    ) -> QueryOutcome {
        match self
            .run(connection_string, nl_query, db_type, api_key)
            .await
        {
            Ok((rows, sql)) => QueryOutcome::success(rows, sql.into_string()),
            Err(e) => {
                error!(kind = %e.kind(), error = %e, "direct query failed");
                e.into_outcome()
            }
        }
    }

    async fn run(
        &self,
        connection_string: &str,
        nl_query: &str,
        db_type: &str,
        api_key: &str,
    ) -> Result<(Vec<Value>, GeneratedQuery), DirectQueryError> {
        let db_type = DbType::from_str(db_type)?;
        if db_type != DbType::Postgres {
            return Err(DirectQueryError::Unsupported(db_type.to_string()));
        }

        let descriptor = ConnectionDescriptor::parse(connection_string)?;
        let mut conn = self.connect(&descriptor).await?;

        // If this future is dropped mid-pipeline the connection is dropped
        // with it, which closes the socket.
        let result = self
            .run_on_connection(&mut conn, nl_query, db_type, api_key)
            .await;

        if let Err(e) = conn.close().await {
            warn!(error = %e, "error closing database connection");
        }

        result
    }

    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<PgConnection, DirectQueryError> {
        let mut options = PgConnectOptions::from_str(descriptor.connection_string())
            .map_err(|e| DirectQueryError::Connection(e.to_string()))?;
        if let Some(mode) = self.options.tls_policy.ssl_mode_override(descriptor.ssl_mode) {
            options = options.ssl_mode(mode);
        }

        let timeout = self.options.connect_timeout;
        match tokio::time::timeout(timeout, PgConnection::connect_with(&options)).await {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) => Err(DirectQueryError::Connection(database_message(&e))),
            Err(_) => Err(DirectQueryError::Connection(format!(
                "timed out connecting to {} after {}ms",
                descriptor.host.as_deref().unwrap_or("database"),
                timeout.as_millis()
            ))),
        }
    }

    async fn run_on_connection(
        &self,
        conn: &mut PgConnection,
        nl_query: &str,
        db_type: DbType,
        api_key: &str,
    ) -> Result<(Vec<Value>, GeneratedQuery), DirectQueryError> {
        sqlx::query("SELECT 1")
            .execute(&mut *conn)
            .await
            .map_err(|e| DirectQueryError::Connection(database_message(&e)))?;
        info!("database connection successful");

        let schema = extract_schema(conn)
            .await
            .map_err(|e| DirectQueryError::Schema(database_message(&e)))?;
        info!(tables = schema.len(), "schema extracted");

        let prompt = build_prompt(&schema, nl_query, db_type);
        let sql = self.generator.generate(&prompt, db_type, api_key).await?;
        info!(sql = %sql, "executing generated query");

        // Simple query protocol: the text runs verbatim, several statements
        // included, and their rows are concatenated.
        let rows = sqlx::Executor::fetch_all(&mut *conn, sqlx::raw_sql(sql.as_str()))
            .await
            .map_err(|e| DirectQueryError::Execution(database_message(&e)))?;
        info!(rows = rows.len(), "query executed successfully");

        Ok((rows.iter().map(row_to_json).collect(), sql))
    }
}

#[async_trait]
impl QueryBackend for DirectQueryEngine {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn execute(&self, request: &QueryRequest) -> QueryOutcome {
        self.execute_direct_query(
            &request.connection_string,
            &request.nl_query,
            &request.db_type,
            &self.api_key,
        )
        .await
    }
}
