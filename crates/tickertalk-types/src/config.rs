//! Service configuration types for TickerTalk.
//!
//! `ServiceConfig` represents the optional `config.toml` holding every
//! non-secret setting. Credentials come from the environment instead.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration. Every field has a default, so an empty file
/// (or no file at all) is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// The stock-price database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite file, opened read-only.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("database/stocks.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// The retrieval store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Store directory. Defaults to `<data dir>/knowledge` when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Results retrieved per category for each question.
    #[serde(default = "default_results_per_category")]
    pub results_per_category: usize,
}

fn default_results_per_category() -> usize {
    10
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            path: None,
            results_per_category: default_results_per_category(),
        }
    }
}

/// Chat-completion parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model name reported in requests and spans. Azure routes by deployment.
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Upper bound on any single provider call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Limits applied by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Follow-up questions kept on a reply. Values above 3 are capped at 3.
    #[serde(default = "default_max_followups")]
    pub max_followups: usize,
    /// Follow-up questions requested from the model.
    #[serde(default = "default_followup_requests")]
    pub followup_requests: usize,
    /// Approximate token ceiling for the SQL-generation prompt.
    #[serde(default = "default_max_prompt_tokens")]
    pub max_prompt_tokens: usize,
    /// Render charts with the dark template.
    #[serde(default = "default_dark_mode")]
    pub dark_mode: bool,
}

fn default_max_followups() -> usize {
    3
}

fn default_followup_requests() -> usize {
    5
}

fn default_max_prompt_tokens() -> usize {
    14_000
}

fn default_dark_mode() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_followups: default_max_followups(),
            followup_requests: default_followup_requests(),
            max_prompt_tokens: default_max_prompt_tokens(),
            dark_mode: default_dark_mode(),
        }
    }
}

/// HTTP/WebSocket bind address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_config_default_values() {
        let config = ServiceConfig::default();
        assert_eq!(config.database.path, PathBuf::from("database/stocks.db"));
        assert_eq!(config.knowledge.results_per_category, 10);
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.timeout_secs, 120);
        assert_eq!(config.llm.temperature, 0.0);
        assert_eq!(config.pipeline.max_followups, 3);
        assert_eq!(config.pipeline.max_prompt_tokens, 14_000);
        assert!(config.pipeline.dark_mode);
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_service_config_deserialize_empty() {
        let config: ServiceConfig = toml::from_str("").unwrap();
        assert_eq!(config.pipeline.followup_requests, 5);
        assert!(config.knowledge.path.is_none());
    }

    #[test]
    fn test_service_config_deserialize_partial_sections() {
        let toml_str = r#"
[database]
path = "/srv/stocks.db"

[llm]
temperature = 0.2

[server]
port = 9000
"#;
        let config: ServiceConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.database.path, PathBuf::from("/srv/stocks.db"));
        assert!((config.llm.temperature - 0.2).abs() < f64::EPSILON);
        assert_eq!(config.llm.max_tokens, 4096);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_service_config_rejects_wrong_types() {
        let result: Result<ServiceConfig, _> = toml::from_str("[server]\nport = \"eighty\"\n");
        assert!(result.is_err());
    }
}
