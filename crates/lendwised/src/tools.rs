//! Callable tools exposed to the reasoner.
//!
//! Tool failures are returned as `{"error": ...}` values so the model can
//! read them; they never fail the chat request.

use lendwise_common::{CustomerLookup, RuleCatalog};
use serde_json::{json, Value};
use tracing::{debug, warn};

pub const FETCH_CUSTOMER_TOOL: &str = "fetch_customer_record";
pub const RULES_TOOL: &str = "eligibility_rules";

pub struct ToolBox {
    catalog: RuleCatalog,
    lookup: CustomerLookup,
}

impl ToolBox {
    pub fn new(catalog: RuleCatalog, lookup: CustomerLookup) -> Self {
        Self { catalog, lookup }
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    /// Function-tool definitions in the Ollama /api/chat format
    pub fn definitions(&self) -> Vec<Value> {
        vec![
            json!({
                "type": "function",
                "function": {
                    "name": FETCH_CUSTOMER_TOOL,
                    "description": "Fetch bank statement and credit/loan profile for a specific customer_id",
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "customer_id": {
                                "type": "string",
                                "description": "Customer identifier, e.g. C101"
                            }
                        },
                        "required": ["customer_id"]
                    }
                }
            }),
            json!({
                "type": "function",
                "function": {
                    "name": RULES_TOOL,
                    "description": "Provides the rule-set text to check eligibility of loan",
                    "parameters": {"type": "object", "properties": {}}
                }
            }),
        ]
    }

    /// Run a tool by name. `arguments` may be an object or a JSON string.
    pub fn call(&self, name: &str, arguments: &Value) -> Value {
        debug!("Tool call {} {}", name, arguments);
        match name {
            FETCH_CUSTOMER_TOOL => self.fetch_customer(arguments),
            RULES_TOOL => json!({
                "version": self.catalog.version(),
                "rules": self.catalog.render(),
            }),
            _ => {
                warn!("Reasoner asked for unknown tool {}", name);
                json!({"error": format!("unknown tool {}", name)})
            }
        }
    }

    fn fetch_customer(&self, arguments: &Value) -> Value {
        let parsed;
        let args = match arguments {
            Value::String(s) => {
                parsed = serde_json::from_str::<Value>(s).unwrap_or(Value::Null);
                &parsed
            }
            other => other,
        };

        let Some(customer_id) = args.get("customer_id").and_then(|v| v.as_str()) else {
            return json!({"error": "customer_id is required"});
        };

        match self.lookup.lookup(customer_id) {
            Ok(result) => result.to_tool_output(),
            Err(e) => {
                warn!("Customer lookup failed: {}", e);
                json!({"error": e.to_string()})
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_rules_tool_returns_catalog_text() {
        let dir = tempdir().unwrap();
        let tools = ToolBox::new(
            RuleCatalog::new(),
            CustomerLookup::new(dir.path().join("a.json"), dir.path().join("b.json")),
        );
        let out = tools.call(RULES_TOOL, &json!({}));
        assert!(out["rules"].as_str().unwrap().starts_with("Rules:\n"));
    }

    #[test]
    fn test_missing_dataset_is_tool_error() {
        let dir = tempdir().unwrap();
        let tools = ToolBox::new(
            RuleCatalog::new(),
            CustomerLookup::new(dir.path().join("a.json"), dir.path().join("b.json")),
        );
        let out = tools.call(FETCH_CUSTOMER_TOOL, &json!({"customer_id": "C101"}));
        assert!(out["error"].as_str().unwrap().contains("Data file not found"));
    }

    #[test]
    fn test_fetch_accepts_string_arguments() {
        let dir = tempdir().unwrap();
        let statements = dir.path().join("bank_statements.json");
        let loans = dir.path().join("credits_loan.json");
        fs::write(&statements, r#"{"bank_statements": [{"customer_id": "C101", "balance": 5}]}"#).unwrap();
        fs::write(&loans, r#"{"customer_accounts": []}"#).unwrap();
        let tools = ToolBox::new(RuleCatalog::new(), CustomerLookup::new(statements, loans));

        let out = tools.call(FETCH_CUSTOMER_TOOL, &json!("{\"customer_id\": \"C101\"}"));
        assert_eq!(out["bank_statement"]["balance"], 5);
    }

    #[test]
    fn test_unknown_tool_and_missing_argument() {
        let dir = tempdir().unwrap();
        let tools = ToolBox::new(
            RuleCatalog::new(),
            CustomerLookup::new(dir.path().join("a.json"), dir.path().join("b.json")),
        );
        assert_eq!(tools.call("search_web", &json!({}))["error"], "unknown tool search_web");
        assert_eq!(
            tools.call(FETCH_CUSTOMER_TOOL, &json!({}))["error"],
            "customer_id is required"
        );
        assert_eq!(tools.definitions().len(), 2);
    }
}
