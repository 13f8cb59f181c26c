use clap::Parser;
use mira_server::config::load_env_file;
use mira_server::{AppState, ServerConfig, create_router};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_file = load_env_file(Path::new(".env"));
    let cfg = ServerConfig::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&cfg.log_filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match env_file {
        Ok(true) => tracing::info!("loaded settings from .env"),
        Ok(false) => {}
        Err(e) => tracing::warn!(error = %e, "ignoring unreadable .env file"),
    }

    let state = Arc::new(AppState::init(&cfg)?);
    let app = create_router(state);

    let addr = cfg.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        addr = %addr,
        managed_base_url = %cfg.mira_base_url,
        llm_endpoint = %cfg.llm_endpoint,
        mira_api_key_set = !cfg.mira_api_key.is_empty(),
        "mira-server listening"
    );
    tracing::info!("endpoints: GET /, GET /debug, POST /query, POST /query-direct");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
