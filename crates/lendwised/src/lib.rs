//! Lendwise daemon library.
//!
//! HTTP surface, conversation orchestration and the reasoner seam. The binary
//! in `main.rs` only wires configuration to `server::run`.

pub mod config;
pub mod ollama;
pub mod orchestrator;
pub mod reasoner;
pub mod routes;
pub mod server;
pub mod tools;

pub use config::Config;
pub use reasoner::{FakeReasoner, FakeReply, Reasoner};
pub use server::{router, AppState, Stores};
pub use tools::ToolBox;
