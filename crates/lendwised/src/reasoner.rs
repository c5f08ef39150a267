//! Reasoner trait abstraction.
//!
//! The reasoner turns the rendered transcript into a reply, optionally
//! calling tools from the `ToolBox`. The orchestrator never looks inside:
//! production uses `OllamaReasoner`, tests use `FakeReasoner`.

use crate::tools::ToolBox;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[async_trait]
pub trait Reasoner: Send + Sync {
    /// Produce a free-text reply for `context`.
    async fn reason(&self, context: &str, tools: &ToolBox) -> Result<String>;

    /// Name for logs
    fn name(&self) -> &str;
}

// ============================================================================
// Fake Reasoner (Testing)
// ============================================================================

/// One scripted step for `FakeReasoner`
#[derive(Debug, Clone)]
pub enum FakeReply {
    Text(String),
    Fail(String),
    /// Sleep before answering, for timeout tests
    Delayed(Duration, String),
    /// Invoke each tool, then answer with the text
    WithTools(Vec<(String, Value)>, String),
}

impl FakeReply {
    pub fn text(s: &str) -> Self {
        Self::Text(s.to_string())
    }

    pub fn fail(s: &str) -> Self {
        Self::Fail(s.to_string())
    }
}

/// Scripted reasoner for deterministic testing.
///
/// Replies are consumed in order; when the script runs out the reasoner
/// answers with `fallback`. Every context and tool result is recorded.
pub struct FakeReasoner {
    script: Mutex<VecDeque<FakeReply>>,
    fallback: String,
    contexts: Arc<Mutex<Vec<String>>>,
    tool_results: Arc<Mutex<Vec<Value>>>,
}

impl FakeReasoner {
    pub fn new(script: Vec<FakeReply>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: "I will get back to you soon. Thank you!".to_string(),
            contexts: Arc::new(Mutex::new(Vec::new())),
            tool_results: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Always answer with the same text
    pub fn always(text: &str) -> Self {
        let mut fake = Self::new(vec![]);
        fake.fallback = text.to_string();
        fake
    }

    /// Contexts received so far, oldest first
    pub fn contexts(&self) -> Vec<String> {
        self.contexts.lock().unwrap().clone()
    }

    pub fn tool_results(&self) -> Vec<Value> {
        self.tool_results.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.contexts.lock().unwrap().len()
    }
}

#[async_trait]
impl Reasoner for FakeReasoner {
    async fn reason(&self, context: &str, tools: &ToolBox) -> Result<String> {
        self.contexts.lock().unwrap().push(context.to_string());

        let step = self.script.lock().unwrap().pop_front();
        match step {
            None => Ok(self.fallback.clone()),
            Some(FakeReply::Text(text)) => Ok(text),
            Some(FakeReply::Fail(msg)) => Err(anyhow!(msg)),
            Some(FakeReply::Delayed(delay, text)) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            Some(FakeReply::WithTools(calls, text)) => {
                for (name, args) in calls {
                    let out = tools.call(&name, &args);
                    self.tool_results.lock().unwrap().push(out);
                }
                Ok(text)
            }
        }
    }

    fn name(&self) -> &str {
        "fake"
    }
}
