use async_trait::async_trait;
use mira_core::{QueryOutcome, QueryRequest};

/// A way of answering a natural-language query with rows.
///
/// Implementations own every failure: errors are reported through
/// [`QueryOutcome::Failure`], never returned or panicked.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Run one request end to end.
    async fn execute(&self, request: &QueryRequest) -> QueryOutcome;
}
