//! Configuration for the completion collaborator.
//!
//! Configuration priority: `~/.config/flowchat/secret.json` > environment variables.

use flowchat_core::FlowchatError;
use flowchat_core::error::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CHAT_ENDPOINT: &str = "http://127.0.0.1:3000/api/chat";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Which completion backend to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// `POST {"prompt"}` -> `{"response"}` endpoint.
    #[default]
    ChatEndpoint,
    /// OpenAI Chat Completions API.
    #[serde(rename = "openai")]
    OpenAi,
    /// No backend; every reply is a local fallback.
    Offline,
}

impl std::str::FromStr for ProviderKind {
    type Err = FlowchatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chat_endpoint" | "chat-endpoint" | "endpoint" => Ok(Self::ChatEndpoint),
            "openai" => Ok(Self::OpenAi),
            "offline" => Ok(Self::Offline),
            other => Err(FlowchatError::config(format!("unknown provider '{other}'"))),
        }
    }
}

/// OpenAI API configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: String,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

/// Root configuration structure for secret.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default)]
    pub chat_endpoint: Option<String>,
    #[serde(default)]
    pub openai: Option<OpenAiConfig>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            chat_endpoint: None,
            openai: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl CompletionConfig {
    /// An offline configuration: every reply is a fallback.
    pub fn offline() -> Self {
        Self {
            provider: ProviderKind::Offline,
            ..Self::default()
        }
    }

    /// Loads `~/.config/flowchat/secret.json`, or the environment if the file
    /// does not exist.
    pub fn load() -> Result<Self> {
        match default_config_path() {
            Ok(path) if path.exists() => Self::load_from_path(&path),
            _ => Self::from_env(),
        }
    }

    /// Loads a configuration file at an explicit path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            FlowchatError::config(format!(
                "Failed to read configuration file at {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: Self = serde_json::from_str(&content).map_err(|e| {
            FlowchatError::config(format!(
                "Failed to parse configuration file at {}: {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `FLOWCHAT_PROVIDER`, `FLOWCHAT_CHAT_ENDPOINT`, `OPENAI_API_KEY`,
    /// `OPENAI_MODEL_NAME` and `FLOWCHAT_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let openai = lookup("OPENAI_API_KEY").map(|api_key| OpenAiConfig {
            api_key,
            model_name: lookup("OPENAI_MODEL_NAME"),
            max_tokens: None,
        });

        let provider = match lookup("FLOWCHAT_PROVIDER") {
            Some(value) => value.parse()?,
            None if openai.is_some() => ProviderKind::OpenAi,
            None => ProviderKind::ChatEndpoint,
        };

        let timeout_secs = match lookup("FLOWCHAT_TIMEOUT_SECS") {
            Some(value) => value.trim().parse().map_err(|_| {
                FlowchatError::config(format!("FLOWCHAT_TIMEOUT_SECS is not a number: '{value}'"))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let config = Self {
            provider,
            chat_endpoint: lookup("FLOWCHAT_CHAT_ENDPOINT"),
            openai,
            timeout_secs,
        };
        config.validate()?;
        Ok(config)
    }

    /// The endpoint for `ProviderKind::ChatEndpoint`.
    pub fn chat_endpoint(&self) -> &str {
        self.chat_endpoint.as_deref().unwrap_or(DEFAULT_CHAT_ENDPOINT)
    }

    fn validate(&self) -> Result<()> {
        if self.provider == ProviderKind::OpenAi && self.openai.is_none() {
            return Err(FlowchatError::config(
                "provider 'openai' requires an API key (secret.json 'openai.api_key' or OPENAI_API_KEY)",
            ));
        }
        if self.timeout_secs == 0 {
            return Err(FlowchatError::config("timeout_secs must be greater than zero"));
        }
        Ok(())
    }
}

/// Returns the path to the configuration file: ~/.config/flowchat/secret.json
pub fn default_config_path() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| FlowchatError::config("Could not determine home directory"))?;
    Ok(home.join(".config").join("flowchat").join("secret.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_empty_environment_defaults_to_chat_endpoint() {
        let config = CompletionConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.provider, ProviderKind::ChatEndpoint);
        assert_eq!(config.chat_endpoint(), DEFAULT_CHAT_ENDPOINT);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_openai_key_selects_openai() {
        let config = CompletionConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_MODEL_NAME", "gpt-4o-mini"),
        ]))
        .unwrap();
        assert_eq!(config.provider, ProviderKind::OpenAi);
        let openai = config.openai.unwrap();
        assert_eq!(openai.api_key, "sk-test");
        assert_eq!(openai.model_name.as_deref(), Some("gpt-4o-mini"));
    }

    #[test]
    fn test_explicit_provider_wins() {
        let config = CompletionConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("FLOWCHAT_PROVIDER", "offline"),
        ]))
        .unwrap();
        assert_eq!(config.provider, ProviderKind::Offline);
    }

    #[test]
    fn test_openai_without_key_is_rejected() {
        let err = CompletionConfig::from_lookup(lookup(&[("FLOWCHAT_PROVIDER", "openai")]))
            .unwrap_err();
        assert!(matches!(err, FlowchatError::Config(_)));
    }

    #[test]
    fn test_bad_timeout_is_rejected() {
        assert!(
            CompletionConfig::from_lookup(lookup(&[("FLOWCHAT_TIMEOUT_SECS", "soon")])).is_err()
        );
        assert!(CompletionConfig::from_lookup(lookup(&[("FLOWCHAT_TIMEOUT_SECS", "0")])).is_err());
    }

    #[test]
    fn test_load_from_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("secret.json");
        fs::write(
            &path,
            r#"{"provider": "chat_endpoint", "chat_endpoint": "http://example.test/api/chat", "timeout_secs": 5}"#,
        )
        .unwrap();

        let config = CompletionConfig::load_from_path(&path).unwrap();
        assert_eq!(config.chat_endpoint(), "http://example.test/api/chat");
        assert_eq!(config.timeout_secs, 5);
        assert!(config.openai.is_none());
    }

    #[test]
    fn test_load_from_path_reports_parse_errors() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("secret.json");
        fs::write(&path, "{ not json").unwrap();

        let err = CompletionConfig::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse configuration file"));
    }

    #[test]
    fn test_missing_file_is_a_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = CompletionConfig::load_from_path(&temp_dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, FlowchatError::Config(_)));
    }
}
