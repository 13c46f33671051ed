//! Configuration loading for TickerTalk.
//!
//! Non-secret settings come from an optional `config.toml` deserialized
//! into [`ServiceConfig`]. Azure OpenAI credentials come from the
//! environment (with `.env` support) and are never written to disk.

use std::path::{Path, PathBuf};

use secrecy::SecretString;

use tickertalk_types::config::ServiceConfig;
use tickertalk_types::error::ConfigError;

pub const API_KEY_VAR: &str = "AZURE_OPENAI_API_KEY";
pub const ENDPOINT_VAR: &str = "AZURE_OPENAI_ENDPOINT";
pub const API_VERSION_VAR: &str = "AZURE_API_VERSION";
pub const DEPLOYMENT_VAR: &str = "AZURE_OPENAI_GPT4O_DEPLOYMENT_NAME";

/// Credentials and routing for an Azure OpenAI deployment.
///
/// Does NOT derive Debug so the key cannot leak through logging.
#[derive(Clone)]
pub struct AzureSettings {
    pub endpoint: String,
    pub api_version: String,
    pub deployment: String,
    pub api_key: SecretString,
}

/// Load Azure settings from the process environment, reading `.env` first
/// when one exists. Every variable is required.
pub fn load_azure_settings() -> Result<AzureSettings, ConfigError> {
    if let Ok(path) = dotenv::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env");
    }
    azure_settings_from(|name| std::env::var(name).ok())
}

/// Build [`AzureSettings`] from a variable lookup. Empty values count as
/// missing.
pub fn azure_settings_from<F>(lookup: F) -> Result<AzureSettings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let require = |name: &str| {
        lookup(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingVar(name.to_string()))
    };

    Ok(AzureSettings {
        api_key: SecretString::from(require(API_KEY_VAR)?),
        endpoint: require(ENDPOINT_VAR)?,
        api_version: require(API_VERSION_VAR)?,
        deployment: require(DEPLOYMENT_VAR)?,
    })
}

/// Load `config.toml` at `path`.
///
/// - If the file does not exist, returns [`ServiceConfig::default()`].
/// - If the file exists but cannot be read or parsed, returns an error;
///   a bad configuration stops startup.
pub async fn load_service_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(ServiceConfig::default());
        }
        Err(err) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source: err,
            });
        }
    };

    toml::from_str::<ServiceConfig>(&content).map_err(|err| ConfigError::Malformed {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

/// Returns the data directory from `TICKERTALK_DATA_DIR`, falling back to
/// `~/.tickertalk`.
pub fn resolve_data_dir() -> PathBuf {
    match std::env::var("TICKERTALK_DATA_DIR") {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".tickertalk"),
    }
}

/// Default config file location inside the data directory.
pub fn default_config_path() -> PathBuf {
    resolve_data_dir().join("config.toml")
}

/// Knowledge store directory: the configured path, or `<data dir>/knowledge`.
pub fn knowledge_dir(config: &ServiceConfig) -> PathBuf {
    config
        .knowledge
        .path
        .clone()
        .unwrap_or_else(|| resolve_data_dir().join("knowledge"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::*;

    fn full_env() -> HashMap<&'static str, String> {
        HashMap::from([
            (API_KEY_VAR, "azure-key".to_string()),
            (ENDPOINT_VAR, "https://example.openai.azure.com".to_string()),
            (API_VERSION_VAR, "2024-06-01".to_string()),
            (DEPLOYMENT_VAR, "gpt-4o".to_string()),
        ])
    }

    #[test]
    fn azure_settings_from_complete_env() {
        let env = full_env();
        let settings = azure_settings_from(|name| env.get(name).cloned()).unwrap();
        assert_eq!(settings.endpoint, "https://example.openai.azure.com");
        assert_eq!(settings.api_version, "2024-06-01");
        assert_eq!(settings.deployment, "gpt-4o");
        assert_eq!(settings.api_key.expose_secret(), "azure-key");
    }

    #[test]
    fn azure_settings_missing_var_is_named() {
        let mut env = full_env();
        env.remove(DEPLOYMENT_VAR);
        let err = azure_settings_from(|name| env.get(name).cloned()).err().unwrap();
        assert!(matches!(err, ConfigError::MissingVar(name) if name == DEPLOYMENT_VAR));
    }

    #[test]
    fn azure_settings_blank_var_is_missing() {
        let mut env = full_env();
        env.insert(API_KEY_VAR, "   ".to_string());
        let err = azure_settings_from(|name| env.get(name).cloned()).err().unwrap();
        assert!(matches!(err, ConfigError::MissingVar(name) if name == API_KEY_VAR));
    }

    #[tokio::test]
    async fn load_service_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_service_config(&tmp.path().join("config.toml"))
            .await
            .unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.pipeline.max_followups, 3);
    }

    #[tokio::test]
    async fn load_service_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        tokio::fs::write(
            &config_path,
            r#"
[database]
path = "/srv/stocks.db"

[pipeline]
dark_mode = false
"#,
        )
        .await
        .unwrap();

        let config = load_service_config(&config_path).await.unwrap();
        assert_eq!(config.database.path, PathBuf::from("/srv/stocks.db"));
        assert!(!config.pipeline.dark_mode);
        assert_eq!(config.llm.model, "gpt-4o");
    }

    #[tokio::test]
    async fn load_service_config_invalid_toml_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        tokio::fs::write(&config_path, "this is not { valid toml !!!")
            .await
            .unwrap();

        let err = load_service_config(&config_path).await.unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
    }

    #[test]
    fn knowledge_dir_prefers_configured_path() {
        let mut config = ServiceConfig::default();
        config.knowledge.path = Some(PathBuf::from("/tmp/kb"));
        assert_eq!(knowledge_dir(&config), PathBuf::from("/tmp/kb"));
    }
}
