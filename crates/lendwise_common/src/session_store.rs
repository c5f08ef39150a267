//! Conversation transcripts keyed by session id.
//!
//! File shape: `{"sessions": {"<id>": {"current": [...], "history": [[...], ...]}}}`.
//! The older single-session file `{"current": [...], "history": [...]}` is
//! read into the `"default"` session and written back in the keyed shape.

use crate::atomic_file;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Session id used for legacy single-session files and unscoped overrides
pub const DEFAULT_SESSION_ID: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Tag used when rendering the transcript for the reasoner
    pub fn tag(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Assistant => "ASSISTANT",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

/// Live turns plus every archived conversation of one session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTranscript {
    #[serde(default)]
    pub current: Vec<Turn>,
    #[serde(default)]
    pub history: Vec<Vec<Turn>>,
}

/// Per-session sizes reported by `GET /sessions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCounts {
    pub current_len: usize,
    pub history_len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionsSummary {
    pub sessions: BTreeMap<String, SessionCounts>,
    pub total_sessions: usize,
    pub total_archived: usize,
}

#[derive(Serialize)]
struct SessionsFileRef<'a> {
    sessions: &'a BTreeMap<String, SessionTranscript>,
}

pub struct SessionStore {
    path: PathBuf,
    sessions: BTreeMap<String, SessionTranscript>,
}

impl SessionStore {
    /// Load sessions from `path`. Missing or corrupt files give an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let sessions = atomic_file::read_json(&path)
            .map(parse_payload)
            .unwrap_or_default();

        info!("Loaded {} session(s) from {}", sessions.len(), path.display());
        Self { path, sessions }
    }

    /// Append a turn, creating the session on first use.
    pub fn append_turn(&mut self, session_id: &str, role: Role, text: impl Into<String>) {
        self.sessions
            .entry(session_id.to_string())
            .or_default()
            .current
            .push(Turn::new(role, text));
    }

    /// Move the live turns into history and start a fresh conversation.
    ///
    /// An already-empty session still records an (empty) history entry.
    pub fn end_session(&mut self, session_id: &str) {
        let transcript = self.sessions.entry(session_id.to_string()).or_default();
        let archived = std::mem::take(&mut transcript.current);
        info!(
            "Archived session {} ({} turns, {} archived total)",
            session_id,
            archived.len(),
            transcript.history.len() + 1
        );
        transcript.history.push(archived);
    }

    /// Render the live transcript as `USER:` / `ASSISTANT:` lines.
    pub fn render_context(&self, session_id: &str) -> String {
        self.sessions
            .get(session_id)
            .map(|t| {
                t.current
                    .iter()
                    .map(|turn| format!("{}: {}", turn.role.tag(), turn.text))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default()
    }

    /// Atomically write every session in the keyed shape.
    pub fn persist(&self) -> Result<()> {
        atomic_file::write_json(
            &self.path,
            &SessionsFileRef {
                sessions: &self.sessions,
            },
        )
    }

    pub fn get(&self, session_id: &str) -> Option<&SessionTranscript> {
        self.sessions.get(session_id)
    }

    pub fn current_turns(&self, session_id: &str) -> Vec<Turn> {
        self.sessions
            .get(session_id)
            .map(|t| t.current.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn summary(&self) -> SessionsSummary {
        let sessions: BTreeMap<String, SessionCounts> = self
            .sessions
            .iter()
            .map(|(id, t)| {
                (
                    id.clone(),
                    SessionCounts {
                        current_len: t.current.len(),
                        history_len: t.history.len(),
                    },
                )
            })
            .collect();

        SessionsSummary {
            total_sessions: sessions.len(),
            total_archived: sessions.values().map(|c| c.history_len).sum(),
            sessions,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn parse_payload(value: Value) -> BTreeMap<String, SessionTranscript> {
    let Value::Object(mut root) = value else {
        warn!("Sessions file is not a JSON object, starting empty");
        return BTreeMap::new();
    };

    if let Some(Value::Object(keyed)) = root.remove("sessions") {
        let mut sessions = BTreeMap::new();
        for (id, raw) in keyed {
            match serde_json::from_value::<SessionTranscript>(raw) {
                Ok(t) => {
                    sessions.insert(id, t);
                }
                Err(e) => warn!("Skipping malformed session {}: {}", id, e),
            }
        }
        return sessions;
    }

    if root.contains_key("current") || root.contains_key("history") {
        match serde_json::from_value::<SessionTranscript>(Value::Object(root)) {
            Ok(legacy) => {
                info!("Upgrading single-session file into session '{}'", DEFAULT_SESSION_ID);
                return BTreeMap::from([(DEFAULT_SESSION_ID.to_string(), legacy)]);
            }
            Err(e) => warn!("Ignoring malformed legacy session file: {}", e),
        }
    }

    BTreeMap::new()
}
