//! Ollama-backed reasoner with tool calling.
//!
//! Sends the transcript to `/api/chat` together with the tool definitions,
//! runs any returned `tool_calls` through the `ToolBox`, and loops until the
//! model answers in plain text or `max_tool_rounds` is reached.

use crate::config::LlmConfig;
use crate::reasoner::Reasoner;
use crate::tools::ToolBox;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

const SYSTEM_PROMPT: &str = "You are a banking assistant. Answer all questions asked by the user \
and accomplish the task in the conversation by using the right tool for the right task. \
Use the fetch_customer_record tool to get customer data for the customer id in the conversation \
when asked to display details or similar tasks. If the user asks to check loan eligibility or a \
similar task, use the eligibility_rules tool and apply the rules to the customer data to provide \
the final decision. If you are unable to answer, apologize, say you will get back soon and thank the user.";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ToolCall>,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ToolCall {
    function: ToolFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ToolFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    tools: Vec<Value>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

pub struct OllamaReasoner {
    client: reqwest::Client,
    base_url: String,
    model: String,
    max_tool_rounds: usize,
}

impl OllamaReasoner {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tool_rounds: config.max_tool_rounds,
        })
    }

    async fn send(&self, messages: &[ChatMessage], tools: &ToolBox) -> Result<ChatMessage> {
        let body = ChatRequest {
            model: &self.model,
            messages,
            tools: tools.definitions(),
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .context("Ollama request failed")?;

        if !response.status().is_success() {
            return Err(anyhow!("Ollama request failed: {}", response.status()));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;
        Ok(parsed.message)
    }
}

#[async_trait]
impl Reasoner for OllamaReasoner {
    async fn reason(&self, context: &str, tools: &ToolBox) -> Result<String> {
        let mut messages = vec![
            ChatMessage::new("system", SYSTEM_PROMPT),
            ChatMessage::new("user", context),
        ];

        for round in 0..=self.max_tool_rounds {
            let reply = self.send(&messages, tools).await?;

            if reply.tool_calls.is_empty() {
                if reply.content.trim().is_empty() {
                    return Err(anyhow!("Reasoner returned an empty reply"));
                }
                info!("Reasoner {} answered after {} tool round(s)", self.model, round);
                return Ok(reply.content);
            }

            if round == self.max_tool_rounds {
                warn!("Tool round limit {} reached without an answer", self.max_tool_rounds);
                return Err(anyhow!(
                    "Reasoner still calling tools after {} round(s)",
                    self.max_tool_rounds
                ));
            }

            let calls = reply.tool_calls.clone();
            messages.push(reply);
            for call in calls {
                debug!("Model requested tool {}", call.function.name);
                let output = tools.call(&call.function.name, &call.function.arguments);
                messages.push(ChatMessage::new("tool", output.to_string()));
            }
        }

        Err(anyhow!("Reasoner produced no reply"))
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Check if the Ollama API is reachable
pub async fn is_running(base_url: &str) -> bool {
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
    {
        Ok(c) => c,
        Err(_) => return false,
    };

    client
        .get(format!("{}/api/tags", base_url.trim_end_matches('/')))
        .send()
        .await
        .map(|r| r.status().is_success())
        .unwrap_or(false)
}
