//! HTTP server for lendwised

use crate::config::Config;
use crate::reasoner::Reasoner;
use crate::routes;
use crate::tools::ToolBox;
use anyhow::{Context, Result};
use axum::Router;
use lendwise_common::{CustomerLookup, DecisionStore, RuleCatalog, SessionStore};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::info;

/// The two persistent stores, guarded together
pub struct Stores {
    pub decisions: DecisionStore,
    pub sessions: SessionStore,
}

/// Application state shared across handlers
pub struct AppState {
    pub stores: Mutex<Stores>,
    pub reasoner: Arc<dyn Reasoner>,
    pub tools: Arc<ToolBox>,
    pub config: Config,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(stores: Stores, reasoner: Arc<dyn Reasoner>, tools: ToolBox, config: Config) -> Self {
        Self {
            stores: Mutex::new(stores),
            reasoner,
            tools: Arc::new(tools),
            config,
            start_time: Instant::now(),
        }
    }

    /// Load both stores and the tool box from the configured data files
    pub fn from_config(config: Config, reasoner: Arc<dyn Reasoner>) -> Self {
        let data = &config.data;
        let stores = Stores {
            decisions: DecisionStore::load(data.decisions_path()),
            sessions: SessionStore::load(data.sessions_path()),
        };
        info!(
            "Loaded {} decision(s) and {} session(s)",
            stores.decisions.len(),
            stores.sessions.len()
        );

        let tools = ToolBox::new(
            RuleCatalog::new(),
            CustomerLookup::new(data.statements_path(), data.loans_path()),
        );
        Self::new(stores, reasoner, tools, config)
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::health_routes())
        .merge(routes::chat_routes())
        .merge(routes::decision_routes())
        .merge(routes::session_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until ctrl-c
pub async fn run(state: AppState) -> Result<()> {
    let addr = state.config.server.bind_addr.clone();
    let app = router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("  Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down gracefully");
        })
        .await?;
    Ok(())
}
