//! Loan eligibility rule catalog.
//!
//! The catalog is prompt context handed to the reasoner. Nothing here
//! evaluates customer data; `decision_for` only documents the mapping.

use crate::decision::Decision;
use serde::Serialize;

pub const RULES_VERSION: &str = "2024.1";

/// Number of rules that must hold for an outright approval
pub const APPROVE_THRESHOLD: usize = 11;
/// Minimum number of rules for a manual review instead of rejection
pub const REVIEW_THRESHOLD: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub number: u8,
    pub name: &'static str,
    pub requirement: &'static str,
}

static RULES: [Rule; 11] = [
    Rule {
        number: 1,
        name: "Income Check",
        requirement: "Income must be ≥ ₹20,000 per month",
    },
    Rule {
        number: 2,
        name: "Account Age",
        requirement: "Account must be ≥ 6 months old",
    },
    Rule {
        number: 3,
        name: "Payment History",
        requirement: "Late payments must be ≤ 2",
    },
    Rule {
        number: 4,
        name: "Transaction Issues",
        requirement: "There must be no transaction anomalies",
    },
    Rule {
        number: 5,
        name: "Credit Usage",
        requirement: "Credit utilization must be < 70%",
    },
    Rule {
        number: 6,
        name: "Current Loans",
        requirement: "Customer must have ≤ 1 active loan",
    },
    Rule {
        number: 7,
        name: "Income–Spend Health Check",
        requirement: "Monthly income must show a clear positive margin over monthly spending",
    },
    Rule {
        number: 8,
        name: "Transaction Activity Check",
        requirement: "Customer should have consistent and healthy transaction activity",
    },
    Rule {
        number: 9,
        name: "Outlier Behavior Check",
        requirement: "There must be no extreme or unexplained large transaction outliers",
    },
    Rule {
        number: 10,
        name: "Liquidity Buffer Check",
        requirement: "Customer should maintain a reasonable financial buffer or savings room",
    },
    Rule {
        number: 11,
        name: "Credit History Strength",
        requirement: "Customer must show reliable and stable historical credit behavior",
    },
];

#[derive(Debug, Clone, Copy, Default)]
pub struct RuleCatalog;

impl RuleCatalog {
    pub fn new() -> Self {
        Self
    }

    pub fn version(&self) -> &'static str {
        RULES_VERSION
    }

    pub fn rules(&self) -> &'static [Rule] {
        &RULES
    }

    /// Verdict for a given number of satisfied rules
    pub fn decision_for(&self, rules_satisfied: usize) -> Decision {
        if rules_satisfied >= APPROVE_THRESHOLD {
            Decision::Approve
        } else if rules_satisfied >= REVIEW_THRESHOLD {
            Decision::Review
        } else {
            Decision::Reject
        }
    }

    /// Full rule text returned by the `eligibility_rules` tool
    pub fn render(&self) -> String {
        let mut text = String::from("Rules:\n");
        for rule in self.rules() {
            text.push_str(&format!("{}. {}: {}\n", rule.number, rule.name, rule.requirement));
        }
        text.push_str("Decision rule (exact mapping):\n");
        text.push_str(&format!(
            "- If number_of_rules_satisfied == {} -> decision = \"APPROVE\"\n",
            APPROVE_THRESHOLD
        ));
        text.push_str(&format!(
            "- If {} <= number_of_rules_satisfied < {} -> decision = \"REVIEW\"\n",
            REVIEW_THRESHOLD, APPROVE_THRESHOLD
        ));
        text.push_str(&format!(
            "- If number_of_rules_satisfied < {} -> decision = \"REJECT\"\n\n",
            REVIEW_THRESHOLD
        ));
        text.push_str(
            "OUTPUT REQUIREMENT: Return exactly the JSON object \
             {\"decision\":\"APPROVE|REVIEW|REJECT\",\"reason\":\"string\"} and NOTHING else.",
        );
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_has_eleven_ordered_rules() {
        let catalog = RuleCatalog::new();
        let numbers: Vec<u8> = catalog.rules().iter().map(|r| r.number).collect();
        assert_eq!(numbers, (1..=11).collect::<Vec<u8>>());
    }

    #[test]
    fn test_decision_mapping_boundaries() {
        let catalog = RuleCatalog::new();
        assert_eq!(catalog.decision_for(11), Decision::Approve);
        assert_eq!(catalog.decision_for(10), Decision::Review);
        assert_eq!(catalog.decision_for(8), Decision::Review);
        assert_eq!(catalog.decision_for(7), Decision::Reject);
        assert_eq!(catalog.decision_for(0), Decision::Reject);
    }

    #[test]
    fn test_rendered_text() {
        let text = RuleCatalog::new().render();
        assert!(text.starts_with("Rules:\n1. Income Check: Income must be ≥ ₹20,000 per month\n"));
        assert!(text.contains("11. Credit History Strength:"));
        assert!(text.contains("- If 8 <= number_of_rules_satisfied < 11 -> decision = \"REVIEW\"\n"));
        assert!(text.ends_with(r#"{"decision":"APPROVE|REVIEW|REJECT","reason":"string"} and NOTHING else."#));
    }
}
