//! Lendwise Daemon - loan-eligibility chat assistant
//!
//! Forwards chat messages to the reasoner, records verdicts and transcripts.

use anyhow::{Context, Result};
use lendwised::{ollama, server, Config};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("[BOOT] Lendwise Daemon v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::load();
    info!(
        "[BOOT] Data dir {}, model {}",
        config.data.dir.display(),
        config.llm.model
    );

    if !ollama::is_running(&config.llm.base_url).await {
        warn!(
            "[BOOT] Ollama not reachable at {}, chat requests will fail until it is",
            config.llm.base_url
        );
    }

    let reasoner = ollama::OllamaReasoner::new(&config.llm)
        .context("Failed to initialize reasoner")?;
    let state = server::AppState::from_config(config, Arc::new(reasoner));

    info!("[BOOT] Ready");
    server::run(state).await
}
