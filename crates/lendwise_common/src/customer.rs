//! Read-only customer record lookup.
//!
//! Joins two static datasets by customer_id:
//! - bank statements: `{"bank_statements": [{"customer_id": ..., ...}]}`
//! - credit/loan profiles: `{"customer_accounts": [{"customer_id": ..., ...}]}`
//!
//! Files are read on every call; nothing is cached.

use crate::error::{LendwiseError, Result};
use serde::Serialize;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CustomerLookupResult {
    Found {
        customer_id: String,
        bank_statement: Option<Value>,
        credit_profile: Option<Value>,
    },
    NotFound {
        customer_id: String,
    },
}

impl CustomerLookupResult {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }

    /// JSON handed back to the reasoner as the tool result
    pub fn to_tool_output(&self) -> Value {
        match self {
            Self::Found {
                customer_id,
                bank_statement,
                credit_profile,
            } => json!({
                "customer_id": customer_id,
                "bank_statement": bank_statement
                    .clone()
                    .unwrap_or_else(|| json!({"error": "Bank statement not found"})),
                "credit_profile": credit_profile
                    .clone()
                    .unwrap_or_else(|| json!({"error": "Credit/loan profile not found"})),
            }),
            Self::NotFound { customer_id } => json!({
                "error": format!("Customer {} not found in any data source", customer_id)
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CustomerLookup {
    statements_path: PathBuf,
    loans_path: PathBuf,
}

impl CustomerLookup {
    pub fn new(statements_path: impl Into<PathBuf>, loans_path: impl Into<PathBuf>) -> Self {
        Self {
            statements_path: statements_path.into(),
            loans_path: loans_path.into(),
        }
    }

    pub fn lookup(&self, customer_id: &str) -> Result<CustomerLookupResult> {
        let customer_id = customer_id.trim();
        let statements = load_dataset(&self.statements_path)?;
        let accounts = load_dataset(&self.loans_path)?;

        let bank_statement = find_record(&statements, "bank_statements", customer_id);
        let credit_profile = find_record(&accounts, "customer_accounts", customer_id);

        debug!(
            "Lookup {}: bank_statement={} credit_profile={}",
            customer_id,
            bank_statement.is_some(),
            credit_profile.is_some()
        );

        if bank_statement.is_none() && credit_profile.is_none() {
            return Ok(CustomerLookupResult::NotFound {
                customer_id: customer_id.to_string(),
            });
        }

        Ok(CustomerLookupResult::Found {
            customer_id: customer_id.to_string(),
            bank_statement,
            credit_profile,
        })
    }
}

fn load_dataset(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Err(LendwiseError::DataUnavailable(format!(
            "Data file not found at {}",
            path.display()
        )));
    }
    let content = fs::read_to_string(path).map_err(|e| {
        LendwiseError::DataUnavailable(format!("Failed to read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        LendwiseError::DataUnavailable(format!("Failed to parse {}: {}", path.display(), e))
    })
}

fn find_record(dataset: &Value, list_key: &str, customer_id: &str) -> Option<Value> {
    dataset
        .get(list_key)?
        .as_array()?
        .iter()
        .find(|r| r.get("customer_id").and_then(|id| id.as_str()) == Some(customer_id))
        .cloned()
}
