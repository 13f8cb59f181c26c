//! Error types for the core crate.

use thiserror::Error;

/// Errors raised while interpreting request inputs.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The connection string could not be parsed as a URL.
    #[error("invalid connection string: {0}")]
    InvalidConnectionString(String),

    /// The requested database type is not known.
    #[error("unsupported database type: {0}")]
    UnsupportedDbType(String),
}
