//! Conversation orchestrator.
//!
//! One chat request runs RECEIVED -> CONTEXT_BUILT -> REASONED -> EXTRACTED
//! -> PERSISTED -> RESPONDED with a single attempt per stage. The store lock
//! is held while building context and while recording results, never while
//! the reasoner runs.

use crate::server::AppState;
use lendwise_common::{
    extract, DecisionRecord, ExtractedDecision, LendwiseError, Result, Role, Turn,
    DEFAULT_SESSION_ID,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::{Duration, Instant};
use tokio::runtime::RuntimeFlavor;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Phrases that close a conversation when sent as the message
const END_PHRASES: &[&str] = &[
    "end",
    "end session",
    "bye",
    "goodbye",
    "finish",
    "done",
    "close session",
    "exit",
    "see you",
];

/// Words that may follow an end phrase without changing its meaning
const CLOSING_REMAINDERS: &[&str] = &[
    "there",
    "now",
    "for now",
    "thanks",
    "thank you",
    "all",
    "everyone",
    "then",
    "please",
    "later",
    "soon",
    "tomorrow",
];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub end_session: Option<bool>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub session_id: String,
    pub archived: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_decision: Option<ExtractedDecision>,
    /// Set when a verdict was recorded for the customer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_changed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub current_session: Vec<Turn>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverrideOutcome {
    pub customer_id: String,
    pub decision: DecisionRecord,
    pub created: bool,
    pub changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// True when the message ends the conversation.
///
/// The message is trimmed, lowercased and stripped of trailing `!.?`. It
/// matches a phrase exactly, a phrase followed by a comma, or a phrase
/// followed by a closing remainder such as "there" or "for now".
pub fn is_end_phrase(message: &str) -> bool {
    let normalized = message
        .trim()
        .to_lowercase()
        .trim_end_matches(|c: char| matches!(c, '!' | '.' | '?'))
        .trim_end()
        .to_string();

    END_PHRASES.iter().any(|phrase| {
        let Some(rest) = normalized.strip_prefix(phrase) else {
            return false;
        };
        if rest.is_empty() || rest.starts_with(',') {
            return true;
        }
        match rest.strip_prefix(' ') {
            Some(tail) => CLOSING_REMAINDERS.contains(&tail.trim()),
            None => false,
        }
    })
}

/// Run synchronous file IO (fsync, rename) without stalling other tasks on
/// this worker. Falls back to a direct call on a current-thread runtime.
fn blocking_io<R>(f: impl FnOnce() -> R) -> R {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

fn user_prompt(message: &str, customer_id: Option<&str>) -> String {
    match customer_id {
        Some(id) => format!("{}\nCustomer ID: {}", message, id),
        None => message.to_string(),
    }
}

/// Handle one chat message end to end.
pub async fn handle_chat(state: &AppState, req: ChatRequest) -> Result<ChatResponse> {
    // RECEIVED
    let session_id = req
        .session_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let customer_id = req
        .customer_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);
    let archive_requested = req.end_session.unwrap_or(false) || is_end_phrase(&req.message);

    // CONTEXT_BUILT
    let context = {
        let mut stores = state.stores.lock().await;
        stores.sessions.append_turn(
            &session_id,
            Role::User,
            user_prompt(&req.message, customer_id.as_deref()),
        );
        stores.sessions.render_context(&session_id)
    };

    // REASONED (lock released)
    let started = Instant::now();
    let timeout = Duration::from_secs(state.config.llm.timeout_secs);
    let outcome = tokio::time::timeout(timeout, state.reasoner.reason(&context, &state.tools)).await;
    let reply = match outcome {
        Ok(Ok(reply)) if reply.trim().is_empty() => {
            let msg = "Reasoner returned an empty reply".to_string();
            return Err(fail_reasoning(state, &session_id, msg).await);
        }
        Ok(Ok(reply)) => reply,
        Ok(Err(e)) => return Err(fail_reasoning(state, &session_id, format!("{:#}", e)).await),
        Err(_) => {
            let msg = format!("Reasoner timed out after {}s", timeout.as_secs());
            return Err(fail_reasoning(state, &session_id, msg).await);
        }
    };
    info!(
        "Reasoner {} replied in {}ms (session {})",
        state.reasoner.name(),
        started.elapsed().as_millis(),
        session_id
    );

    // EXTRACTED
    let extracted = extract(&reply);

    let mut stores = state.stores.lock().await;
    let mut decision_changed = None;
    let mut decision_error = None;
    if let (Some(id), Some(found)) = (customer_id.as_deref(), extracted.as_ref()) {
        match blocking_io(|| stores.decisions.upsert_decision(id, found.decision, &found.reason)) {
            Ok(outcome) => decision_changed = Some(outcome.changed),
            Err(e) => decision_error = Some(e),
        }
    }

    // PERSISTED
    stores.sessions.append_turn(&session_id, Role::Assistant, reply.clone());
    if let Some(e) = decision_error {
        // Keep the transcript, but the verdict was not saved: fail the request.
        if let Err(pe) = blocking_io(|| stores.sessions.persist()) {
            warn!("Failed to persist session {}: {}", session_id, pe);
        }
        error!("Decision for {:?} not persisted: {}", customer_id, e);
        return Err(e);
    }

    if archive_requested {
        stores.sessions.end_session(&session_id);
    }

    let warning = blocking_io(|| stores.sessions.persist()).err().map(|e| {
        warn!("Failed to persist session {}: {}", session_id, e);
        format!("Failed to persist session to disk: {}", e)
    });

    // RESPONDED
    Ok(ChatResponse {
        reply,
        current_session: stores.sessions.current_turns(&session_id),
        session_id,
        archived: archive_requested,
        extracted_decision: extracted,
        decision_changed,
        warning,
    })
}

async fn fail_reasoning(state: &AppState, session_id: &str, msg: String) -> LendwiseError {
    error!("Reasoning failed for session {}: {}", session_id, msg);
    let stores = state.stores.lock().await;
    if let Err(e) = blocking_io(|| stores.sessions.persist()) {
        warn!("Failed to persist session {}: {}", session_id, e);
    }
    LendwiseError::Reasoning(msg)
}

/// Apply a manager override to the Decision Store.
///
/// When the decision changes, a `MANAGER_OVERRIDE:` note is appended to the
/// session so the reasoner sees it on the next turn.
pub async fn record_override(
    state: &AppState,
    customer_id: &str,
    decision: &str,
    reason: &str,
    session_id: Option<&str>,
) -> Result<OverrideOutcome> {
    let customer_id = customer_id.trim();
    let mut stores = state.stores.lock().await;
    let outcome = blocking_io(|| stores.decisions.upsert(customer_id, decision, reason))?;

    let mut warning = None;
    if outcome.changed {
        let session_id = session_id
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SESSION_ID);
        let note = json!({
            "manager_override": {
                "customer_id": customer_id,
                "decision": outcome.record.decision,
                "reason": outcome.record.reason,
                "ts": outcome.record.updated_at,
            }
        });
        stores
            .sessions
            .append_turn(session_id, Role::Assistant, format!("MANAGER_OVERRIDE: {}", note));

        warning = blocking_io(|| stores.sessions.persist()).err().map(|e| {
            warn!("Override saved but session {} not persisted: {}", session_id, e);
            format!("Failed to persist session to disk: {}", e)
        });
    }

    info!(
        "Manager override for {}: {} (changed={})",
        customer_id, outcome.record.decision, outcome.changed
    );

    Ok(OverrideOutcome {
        customer_id: customer_id.to_string(),
        decision: outcome.record,
        created: outcome.created,
        changed: outcome.changed,
        warning,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_phrases_exact_and_punctuated() {
        assert!(is_end_phrase("bye"));
        assert!(is_end_phrase("Bye!"));
        assert!(is_end_phrase("  END SESSION. "));
        assert!(is_end_phrase("see you"));
        assert!(is_end_phrase("Done?"));
    }

    #[test]
    fn test_end_phrases_with_trailer() {
        assert!(is_end_phrase("bye there"));
        assert!(is_end_phrase("goodbye, and thanks for the help"));
        assert!(is_end_phrase("see you tomorrow"));
        assert!(is_end_phrase("bye for now"));
    }

    #[test]
    fn test_non_end_messages() {
        assert!(!is_end_phrase("goodbye party"));
        assert!(!is_end_phrase("Check eligibility for C101"));
        assert!(!is_end_phrase("ending balance?"));
        assert!(!is_end_phrase("donelly account"));
        assert!(!is_end_phrase("exit now please"));
        assert!(!is_end_phrase(""));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_blocking_io_on_multi_thread_runtime() {
        assert_eq!(blocking_io(|| 2 + 2), 4);
    }

    #[tokio::test]
    async fn test_blocking_io_on_current_thread_runtime() {
        assert_eq!(blocking_io(|| "ok"), "ok");
    }

    #[test]
    fn test_blocking_io_outside_runtime() {
        assert_eq!(blocking_io(|| 1), 1);
    }

    #[test]
    fn test_user_prompt_appends_customer_id() {
        assert_eq!(user_prompt("check", Some("C101")), "check\nCustomer ID: C101");
        assert_eq!(user_prompt("hello", None), "hello");
    }
}
