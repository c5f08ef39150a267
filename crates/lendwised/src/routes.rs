//! API routes for lendwised

use crate::orchestrator::{self, ChatRequest, ChatResponse, OverrideOutcome};
use crate::server::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lendwise_common::{DecisionRecord, LendwiseError, SessionsSummary};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};

type AppStateArc = Arc<AppState>;

/// HTTP status for a core error
pub fn error_status(err: &LendwiseError) -> StatusCode {
    match err {
        LendwiseError::Validation(_) => StatusCode::BAD_REQUEST,
        LendwiseError::DataUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        LendwiseError::Reasoning(_)
        | LendwiseError::Persistence { .. }
        | LendwiseError::Io(_)
        | LendwiseError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(err: LendwiseError) -> (StatusCode, String) {
    let status = error_status(&err);
    if status.is_server_error() {
        error!("  Request failed ({}): {}", err.kind(), err);
    }
    (status, err.to_string())
}

// ============================================================================
// Health Routes
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/health", get(health_check))
}

async fn health_check(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

// ============================================================================
// Chat Routes
// ============================================================================

pub fn chat_routes() -> Router<AppStateArc> {
    Router::new().route("/chat", post(chat))
}

async fn chat(
    State(state): State<AppStateArc>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, String)> {
    info!("  Chat message ({} chars)", req.message.len());
    let response = orchestrator::handle_chat(&state, req).await.map_err(reject)?;
    Ok(Json(response))
}

// ============================================================================
// Decision Routes
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UpdateDecisionRequest {
    #[serde(default)]
    pub customer_id: Option<Value>,
    #[serde(default)]
    pub decision: Option<Value>,
    #[serde(default)]
    pub reason: Option<Value>,
    #[serde(default)]
    pub session_id: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ManagerActionRequest {
    #[serde(default)]
    pub action: Option<Value>,
    #[serde(default)]
    pub customer_id: Option<Value>,
    #[serde(default)]
    pub reason: Option<Value>,
    #[serde(default)]
    pub session_id: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct UpdateDecisionResponse {
    pub status: String,
    #[serde(flatten)]
    pub outcome: OverrideOutcome,
}

#[derive(Debug, Serialize)]
pub struct DecisionsResponse {
    pub decisions: BTreeMap<String, DecisionRecord>,
}

pub fn decision_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/decisions", get(list_decisions))
        .route("/decisions.json", get(decisions_file))
        .route("/update-decisions", post(update_decision))
        .route("/manager-action", post(manager_action))
}

async fn list_decisions(State(state): State<AppStateArc>) -> Json<DecisionsResponse> {
    let stores = state.stores.lock().await;
    Json(DecisionsResponse {
        decisions: stores.decisions.get_all(),
    })
}

/// Flat `{customer_id: record}` mapping, for dashboards reading the raw file
async fn decisions_file(State(state): State<AppStateArc>) -> Json<BTreeMap<String, DecisionRecord>> {
    let stores = state.stores.lock().await;
    Json(stores.decisions.get_all())
}

fn bad_body(rejection: JsonRejection) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, rejection.body_text())
}

/// Scalar field as text. Numbers are taken in their decimal form.
fn field_text(value: Option<Value>, field: &str) -> Result<Option<String>, (StatusCode, String)> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(reject(LendwiseError::validation(format!(
            "{} must be a string",
            field
        )))),
    }
}

fn required(value: Option<Value>, field: &str) -> Result<String, (StatusCode, String)> {
    field_text(value, field)?
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| reject(LendwiseError::validation(format!("{} is required", field))))
}

async fn apply_override(
    state: &AppState,
    customer_id: String,
    decision: String,
    reason: Option<String>,
    session_id: Option<String>,
) -> Result<Json<UpdateDecisionResponse>, (StatusCode, String)> {
    let outcome = orchestrator::record_override(
        state,
        &customer_id,
        &decision,
        reason.as_deref().unwrap_or_default(),
        session_id.as_deref(),
    )
    .await
    .map_err(reject)?;

    Ok(Json(UpdateDecisionResponse {
        status: "ok".to_string(),
        outcome,
    }))
}

async fn update_decision(
    State(state): State<AppStateArc>,
    payload: Result<Json<UpdateDecisionRequest>, JsonRejection>,
) -> Result<Json<UpdateDecisionResponse>, (StatusCode, String)> {
    let Json(req) = payload.map_err(bad_body)?;
    let customer_id = required(req.customer_id, "customer_id")?;
    let decision = required(req.decision, "decision")?;
    let reason = field_text(req.reason, "reason")?;
    let session_id = field_text(req.session_id, "session_id")?;
    apply_override(&state, customer_id, decision, reason, session_id).await
}

async fn manager_action(
    State(state): State<AppStateArc>,
    payload: Result<Json<ManagerActionRequest>, JsonRejection>,
) -> Result<Json<UpdateDecisionResponse>, (StatusCode, String)> {
    let Json(req) = payload.map_err(bad_body)?;
    let action = required(req.action, "action")?;
    let customer_id = required(req.customer_id, "customer_id")?;
    let reason = field_text(req.reason, "reason")?;
    let session_id = field_text(req.session_id, "session_id")?;
    info!("  Manager action {} for {}", action, customer_id);
    apply_override(&state, customer_id, action, reason, session_id).await
}

// ============================================================================
// Session Routes
// ============================================================================

pub fn session_routes() -> Router<AppStateArc> {
    Router::new().route("/sessions", get(list_sessions))
}

async fn list_sessions(State(state): State<AppStateArc>) -> Json<SessionsSummary> {
    let stores = state.stores.lock().await;
    Json(stores.sessions.summary())
}
