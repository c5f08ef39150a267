//! Decision store: customer_id -> latest verdict, backed by a JSON file.
//!
//! Two on-disk shapes are accepted:
//! - flat (legacy): `{"C101": {"decision": ..., "reason": ..., "updated_at": ...}}`
//! - wrapped: `{"decisions": {"C101": {...}}}`
//!
//! The shape found at load time is kept for every later save so whichever
//! frontend reads the file keeps working. New files use the wrapped shape.
//!
//! Consistency model: an upsert mutates memory first, then persists. If the
//! write fails the in-memory record stays applied and the error is returned.
//!
//! Entries that do not parse as a record (hand edits, missing `updated_at`)
//! are kept verbatim and written back untouched until that customer gets a
//! new verdict.

use crate::atomic_file;
use crate::decision::{Decision, DecisionRecord};
use crate::error::{LendwiseError, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// On-disk layout of the decisions file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileShape {
    Flat,
    Wrapped,
}

/// Result of an upsert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub created: bool,
    pub changed: bool,
    /// Record as stored after the call
    pub record: DecisionRecord,
}

#[derive(Serialize)]
struct WrappedRef<'a> {
    decisions: &'a BTreeMap<String, Value>,
}

pub struct DecisionStore {
    path: PathBuf,
    shape: FileShape,
    decisions: BTreeMap<String, DecisionRecord>,
    /// Unparseable entries, raw
    preserved: BTreeMap<String, Value>,
}

impl DecisionStore {
    /// Load the store from `path`. Missing or corrupt files give an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let Payload {
            shape,
            decisions,
            preserved,
        } = match atomic_file::read_json(&path) {
            Some(value) => parse_payload(value),
            None => Payload::empty(),
        };

        info!(
            "Loaded {} decision(s) from {} ({:?} shape, {} kept unparsed)",
            decisions.len(),
            path.display(),
            shape,
            preserved.len()
        );

        Self {
            path,
            shape,
            decisions,
            preserved,
        }
    }

    /// Record a verdict given as text (case-insensitive).
    pub fn upsert(&mut self, customer_id: &str, decision: &str, reason: &str) -> Result<UpsertOutcome> {
        let decision: Decision = decision.parse()?;
        self.upsert_decision(customer_id, decision, reason)
    }

    /// Record a verdict for a customer.
    ///
    /// Reaffirming the current decision is a no-op: reason and timestamp are
    /// left as they were and the file is not rewritten.
    pub fn upsert_decision(
        &mut self,
        customer_id: &str,
        decision: Decision,
        reason: &str,
    ) -> Result<UpsertOutcome> {
        let customer_id = customer_id.trim();
        if customer_id.is_empty() {
            return Err(LendwiseError::validation("customer_id is required"));
        }

        let created = match self.decisions.get(customer_id) {
            Some(existing) if existing.decision == decision => {
                return Ok(UpsertOutcome {
                    created: false,
                    changed: false,
                    record: existing.clone(),
                });
            }
            Some(_) => false,
            None => true,
        };

        let record = DecisionRecord::new(decision, reason);
        self.preserved.remove(customer_id);
        self.decisions.insert(customer_id.to_string(), record.clone());
        info!("Decision for {} set to {}", customer_id, decision);

        if let Err(e) = self.save() {
            error!("Decision for {} kept in memory but not on disk: {}", customer_id, e);
            return Err(e);
        }

        Ok(UpsertOutcome {
            created,
            changed: true,
            record,
        })
    }

    /// Write the whole mapping, unparsed entries included, in the remembered shape.
    pub fn save(&self) -> Result<()> {
        let mut entries = self.preserved.clone();
        for (customer_id, record) in &self.decisions {
            entries.insert(customer_id.clone(), serde_json::to_value(record)?);
        }

        match self.shape {
            FileShape::Flat => atomic_file::write_json(&self.path, &entries),
            FileShape::Wrapped => atomic_file::write_json(
                &self.path,
                &WrappedRef {
                    decisions: &entries,
                },
            ),
        }
    }

    pub fn get(&self, customer_id: &str) -> Option<&DecisionRecord> {
        self.decisions.get(customer_id)
    }

    /// Snapshot of every record
    pub fn get_all(&self) -> BTreeMap<String, DecisionRecord> {
        self.decisions.clone()
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    /// Customer ids whose stored entry could not be parsed
    pub fn unparsed_ids(&self) -> Vec<&str> {
        self.preserved.keys().map(String::as_str).collect()
    }

    pub fn shape(&self) -> FileShape {
        self.shape
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

struct Payload {
    shape: FileShape,
    decisions: BTreeMap<String, DecisionRecord>,
    preserved: BTreeMap<String, Value>,
}

impl Payload {
    fn empty() -> Self {
        Self {
            shape: FileShape::Wrapped,
            decisions: BTreeMap::new(),
            preserved: BTreeMap::new(),
        }
    }
}

fn parse_payload(value: Value) -> Payload {
    let Value::Object(mut root) = value else {
        warn!("Decisions file is not a JSON object, starting empty");
        return Payload::empty();
    };

    let (shape, entries) = match root.remove("decisions") {
        Some(Value::Object(inner)) => (FileShape::Wrapped, inner),
        Some(other) => {
            // A customer literally named "decisions" in a flat file
            root.insert("decisions".to_string(), other);
            (FileShape::Flat, root)
        }
        None => (FileShape::Flat, root),
    };

    let mut decisions = BTreeMap::new();
    let mut preserved = BTreeMap::new();
    for (customer_id, raw) in entries {
        match serde_json::from_value::<DecisionRecord>(raw.clone()) {
            Ok(record) => {
                decisions.insert(customer_id, record);
            }
            Err(e) => {
                warn!("Keeping unparsed decision for {} as-is: {}", customer_id, e);
                preserved.insert(customer_id, raw);
            }
        }
    }

    Payload {
        shape,
        decisions,
        preserved,
    }
}
