//! Backend seams for Mira.
//!
//! - [`QueryBackend`]: answer a [`mira_core::QueryRequest`] with a
//!   [`mira_core::QueryOutcome`]. The direct Postgres engine and the
//!   [`ManagedBackend`] both implement it.
//! - [`SqlGenerator`]: turn a prompt into a sanitized SQL statement.
//!   [`ChatCompletionGenerator`] does so through a chat-completion endpoint.

pub mod backend;
pub mod generator;
pub mod managed;

pub use backend::QueryBackend;
pub use generator::{
    ChatCompletionConfig, ChatCompletionGenerator, GenerationError, SqlGenerator,
};
pub use managed::{DEFAULT_MANAGED_BASE_URL, ManagedBackend};
