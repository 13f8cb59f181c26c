use crate::config::ServerConfig;
use mira_adapter_pg::DirectQueryEngine;
use mira_runtime::{ChatCompletionGenerator, ManagedBackend, QueryBackend};
use std::sync::Arc;

/// Shared application state.
///
/// Backends hold no per-request state: each direct query opens and closes its
/// own connection, so requests never share anything mutable.
pub struct AppState {
    pub cfg: ServerConfig,
    /// Serves `POST /query-direct`.
    pub direct: Arc<dyn QueryBackend>,
    /// Serves `POST /query`.
    pub managed: Arc<dyn QueryBackend>,
}

impl AppState {
    pub fn new(
        cfg: ServerConfig,
        direct: Arc<dyn QueryBackend>,
        managed: Arc<dyn QueryBackend>,
    ) -> Self {
        Self {
            cfg,
            direct,
            managed,
        }
    }

    /// Build the production backends from configuration.
    pub fn init(cfg: &ServerConfig) -> anyhow::Result<Self> {
        let generator = ChatCompletionGenerator::new(cfg.completion_config())?;
        let direct = DirectQueryEngine::new(
            Arc::new(generator),
            cfg.llm_api_key(),
            cfg.direct_options(),
        );
        let managed = ManagedBackend::new(cfg.mira_api_key.clone(), cfg.mira_base_url.clone());

        Ok(Self::new(cfg.clone(), Arc::new(direct), Arc::new(managed)))
    }
}
