//! Configuration management for lendwised.
//!
//! Loads settings from `$LENDWISE_CONFIG`, then /etc/lendwise/config.toml,
//! or falls back to defaults.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "LENDWISE_CONFIG";

/// Config file path
pub const CONFIG_PATH: &str = "/etc/lendwise/config.toml";

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

/// Data file locations. Relative file names resolve against `dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_decisions_file")]
    pub decisions_file: PathBuf,

    #[serde(default = "default_sessions_file")]
    pub sessions_file: PathBuf,

    /// Static bank statements dataset (read-only)
    #[serde(default = "default_statements_file")]
    pub statements_file: PathBuf,

    /// Static credit/loan dataset (read-only)
    #[serde(default = "default_loans_file")]
    pub loans_file: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_decisions_file() -> PathBuf {
    PathBuf::from("decisions.json")
}

fn default_sessions_file() -> PathBuf {
    PathBuf::from("session.json")
}

fn default_statements_file() -> PathBuf {
    PathBuf::from("bank_statements.json")
}

fn default_loans_file() -> PathBuf {
    PathBuf::from("credits_loan.json")
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
            decisions_file: default_decisions_file(),
            sessions_file: default_sessions_file(),
            statements_file: default_statements_file(),
            loans_file: default_loans_file(),
        }
    }
}

impl DataConfig {
    /// Default file names, all placed under `dir`
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.dir.join(file)
        }
    }

    pub fn decisions_path(&self) -> PathBuf {
        self.resolve(&self.decisions_file)
    }

    pub fn sessions_path(&self) -> PathBuf {
        self.resolve(&self.sessions_file)
    }

    pub fn statements_path(&self) -> PathBuf {
        self.resolve(&self.statements_file)
    }

    pub fn loans_path(&self) -> PathBuf {
        self.resolve(&self.loans_file)
    }
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Ollama API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Upper bound for one whole reasoner call, tool rounds included
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Tool-call round trips allowed before the reply is taken as final
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
}

fn default_base_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_model() -> String {
    "phi3".to_string()
}

fn default_timeout() -> u64 {
    120
}

fn default_max_tool_rounds() -> usize {
    4
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout(),
            max_tool_rounds: default_max_tool_rounds(),
        }
    }
}

/// Full daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub llm: LlmConfig,
}

impl Config {
    /// Load config from file, or return defaults
    pub fn load() -> Self {
        let explicit = std::env::var(CONFIG_ENV).ok();
        let result = match explicit.as_deref() {
            Some(path) => Self::load_from_path(path),
            None => Self::load_from_path(CONFIG_PATH),
        };

        result.unwrap_or_else(|e| {
            warn!("Config not found, using defaults: {}", e);
            Config::default()
        })
    }

    /// Load config from specific path
    pub fn load_from_path(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded config from {}", path);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.bind_addr, "127.0.0.1:8000");
        assert_eq!(config.llm.model, "phi3");
        assert_eq!(config.llm.timeout_secs, 120);
        assert_eq!(config.data.decisions_path(), PathBuf::from("./decisions.json"));
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
[server]
bind_addr = "0.0.0.0:9000"

[data]
dir = "/var/lib/lendwise"
sessions_file = "/tmp/sessions.json"

[llm]
model = "qwen2.5:7b-instruct"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.llm.model, "qwen2.5:7b-instruct");
        // Defaults for missing fields
        assert_eq!(config.llm.max_tool_rounds, 4);
        assert_eq!(
            config.data.decisions_path(),
            PathBuf::from("/var/lib/lendwise/decisions.json")
        );
        // Absolute paths are kept as-is
        assert_eq!(config.data.sessions_path(), PathBuf::from("/tmp/sessions.json"));
    }

    #[test]
    fn test_empty_toml_is_all_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.data.loans_path(), PathBuf::from("./credits_loan.json"));
        assert_eq!(config.llm.base_url, "http://127.0.0.1:11434");
    }

    #[test]
    fn test_load_from_missing_path_errors() {
        assert!(Config::load_from_path("/nonexistent/lendwise.toml").is_err());
    }
}
