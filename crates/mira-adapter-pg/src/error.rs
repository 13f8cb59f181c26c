//! Error types for the direct query path.

use mira_core::{CoreError, FailureKind, QueryOutcome};
use mira_runtime::GenerationError;
use thiserror::Error;

/// A terminal failure of the direct pipeline. The variants are mutually
/// exclusive: the first failing step decides which one is reported.
#[derive(Debug, Error)]
pub enum DirectQueryError {
    /// The request named a database other than Postgres.
    #[error("Only PostgreSQL is supported in direct mode (got '{0}')")]
    Unsupported(String),

    /// Establishing or probing the connection failed.
    #[error("{0}")]
    Connection(String),

    /// The catalog query failed.
    #[error("{0}")]
    Schema(String),

    /// The completion call failed or returned nothing usable.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// The generated statement failed at the database.
    #[error("{0}")]
    Execution(String),
}

impl DirectQueryError {
    pub fn kind(&self) -> FailureKind {
        match self {
            DirectQueryError::Unsupported(_) => FailureKind::Unsupported,
            DirectQueryError::Connection(_) => FailureKind::Connection,
            DirectQueryError::Schema(_) => FailureKind::Schema,
            DirectQueryError::Generation(_) => FailureKind::Generation,
            DirectQueryError::Execution(_) => FailureKind::Execution,
        }
    }

    pub fn into_outcome(self) -> QueryOutcome {
        QueryOutcome::failure(self.kind(), self.to_string())
    }
}

impl From<CoreError> for DirectQueryError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UnsupportedDbType(db) => DirectQueryError::Unsupported(db),
            CoreError::InvalidConnectionString(_) => DirectQueryError::Connection(err.to_string()),
        }
    }
}

/// The database's own message for server-side errors, the driver's otherwise.
pub(crate) fn database_message(err: &sqlx::Error) -> String {
    match err {
        sqlx::Error::Database(db) => db.message().to_string(),
        other => other.to_string(),
    }
}
