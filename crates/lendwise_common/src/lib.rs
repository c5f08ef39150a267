//! Shared core for the Lendwise loan-eligibility assistant.
//!
//! Persistence (decisions, sessions), verdict extraction, the rule catalog
//! and customer record lookup. No HTTP and no async here.

pub mod atomic_file;
pub mod customer;
pub mod decision;
pub mod decision_store;
pub mod error;
pub mod extractor;
pub mod rules;
pub mod session_store;

pub use customer::{CustomerLookup, CustomerLookupResult};
pub use decision::{Decision, DecisionRecord};
pub use decision_store::{DecisionStore, FileShape, UpsertOutcome};
pub use error::{LendwiseError, Result};
pub use extractor::{extract, ExtractedDecision};
pub use rules::RuleCatalog;
pub use session_store::{Role, SessionStore, SessionTranscript, SessionsSummary, Turn, DEFAULT_SESSION_ID};

/// Version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
