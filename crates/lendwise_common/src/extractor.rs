//! Recover a structured verdict from a free-text reasoner reply.
//!
//! The reasoner is told to answer with exactly
//! `{"decision":"APPROVE|REVIEW|REJECT","reason":"..."}` but does not always
//! comply. Strategies run strictest first, so a conversational "approve" in
//! prose is only picked up when it is written as `decision: approve`.

use crate::decision::Decision;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

static EMBEDDED_JSON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"\{\s*"decision"\s*:\s*"((?i:APPROVE|REVIEW|REJECT))"\s*,\s*"reason"\s*:\s*"([^"]*)"\s*\}"#,
    )
    .unwrap()
});

static LOOSE_DECISION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bdecision\b["']?\s*[:=]\s*["']?(approve|review|reject)\b"#).unwrap()
});

static LOOSE_REASON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\breason\b["']?\s*[:=]\s*([^\r\n]*)"#).unwrap());

/// Verdict pulled out of a reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedDecision {
    pub decision: Decision,
    pub reason: String,
}

/// Which strategy matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    StrictJson,
    EmbeddedJson,
    Loose,
}

/// Extract a verdict, or `None` when nothing trustworthy is present.
pub fn extract(reply: &str) -> Option<ExtractedDecision> {
    extract_with_strategy(reply).map(|(d, _)| d)
}

pub fn extract_with_strategy(reply: &str) -> Option<(ExtractedDecision, Strategy)> {
    let found = strict_json(reply)
        .map(|d| (d, Strategy::StrictJson))
        .or_else(|| embedded_json(reply).map(|d| (d, Strategy::EmbeddedJson)))
        .or_else(|| loose(reply).map(|d| (d, Strategy::Loose)));

    match &found {
        Some((d, strategy)) => debug!("Extracted {} via {:?}", d.decision, strategy),
        None => debug!("No decision found in reply ({} chars)", reply.len()),
    }
    found
}

fn strict_json(reply: &str) -> Option<ExtractedDecision> {
    let value: Value = serde_json::from_str(reply.trim()).ok()?;
    let obj = value.as_object()?;
    let decision = obj.get("decision")?.as_str()?.parse().ok()?;
    let reason = obj.get("reason")?.as_str()?;
    Some(ExtractedDecision {
        decision,
        reason: reason.to_string(),
    })
}

fn embedded_json(reply: &str) -> Option<ExtractedDecision> {
    let caps = EMBEDDED_JSON.captures(reply)?;
    Some(ExtractedDecision {
        decision: caps[1].parse().ok()?,
        reason: caps[2].to_string(),
    })
}

fn loose(reply: &str) -> Option<ExtractedDecision> {
    let caps = LOOSE_DECISION.captures(reply)?;
    let decision = caps[1].parse().ok()?;

    let reason = LOOSE_REASON
        .captures(reply)
        .map(|c| {
            c[1].trim_matches(|ch: char| {
                ch.is_whitespace() || matches!(ch, '"' | '\'' | '{' | '}' | ',')
            })
            .to_string()
        })
        .unwrap_or_default();

    Some(ExtractedDecision { decision, reason })
}
