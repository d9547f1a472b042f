//! File-based binding store
//!
//! Loads model binding configuration from a JSON file. The store is the
//! gateway's persistent-configuration collaborator: it exposes binding
//! lookups by id, key, or backend model name, and is treated as read-only
//! for the duration of a request.

use crate::models::canonical::{BackendKind, ModelBinding, WireMode};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen host (default: "127.0.0.1" - localhost only)
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port (default: 8089)
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8089
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Gateway configuration loaded from JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Server configuration (optional, defaults to localhost:8089)
    #[serde(default)]
    pub server: ServerConfig,

    /// Model bindings keyed by logical key
    pub bindings: HashMap<String, BindingRecord>,
}

/// One stored model binding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingRecord {
    /// Stable binding id
    pub id: String,

    /// Model name the backend understands
    pub model: String,

    /// Wire protocol family
    pub kind: BackendKind,

    /// Backend base URL
    #[serde(rename = "baseUrl")]
    pub base_url: String,

    /// Inline credential (can be empty if using env indirection)
    #[serde(rename = "apiKey", default)]
    pub api_key: String,

    /// Environment variable to read the credential from when apiKey is empty
    #[serde(rename = "apiKeyEnv", default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    #[serde(rename = "wireMode", default)]
    pub wire_mode: WireMode,

    #[serde(rename = "supportsReasoning", default)]
    pub supports_reasoning: bool,

    #[serde(rename = "priceInputPerMillion", default)]
    pub price_input_per_million: Option<f64>,

    #[serde(rename = "priceOutputPerMillion", default)]
    pub price_output_per_million: Option<f64>,

    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl BindingRecord {
    /// Resolve the credential: inline value first, then env indirection
    fn credential(&self) -> Option<String> {
        if !self.api_key.is_empty() {
            return Some(self.api_key.clone());
        }
        self.api_key_env
            .as_ref()
            .and_then(|name| std::env::var(name).ok())
            .filter(|value| !value.is_empty())
    }

    fn to_binding(&self, key: &str) -> ModelBinding {
        ModelBinding {
            id: self.id.clone(),
            key: key.to_string(),
            model: self.model.clone(),
            kind: self.kind,
            base_url: self.base_url.clone(),
            credential: self.credential(),
            wire_mode: self.wire_mode,
            supports_reasoning: self.supports_reasoning,
            price_input_per_million: self.price_input_per_million,
            price_output_per_million: self.price_output_per_million,
            currency: self.currency.clone(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from JSON file
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading configuration from: {:?}", path);

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: GatewayConfig =
            serde_json::from_str(&content).with_context(|| "Failed to parse config JSON")?;

        config.validate()?;

        debug!("Loaded {} bindings", config.bindings.len());
        Ok(config)
    }

    /// Load configuration from default locations
    /// Searches in order:
    /// 1. ~/.config/modelgate/modelgate.json
    /// 2. ./modelgate.json
    ///
    /// Returns error if no configuration file is found.
    pub fn load_default() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let config_path = home.join(".config").join("modelgate").join("modelgate.json");
            if config_path.exists() {
                return Self::load(&config_path);
            }
        }

        let local_path = Path::new("modelgate.json");
        if local_path.exists() {
            return Self::load(local_path);
        }

        anyhow::bail!(
            "Configuration file not found. Please create one at:\n\
             - ~/.config/modelgate/modelgate.json (recommended)\n\
             - ./modelgate.json (current directory)\n\
             \n\
             See modelgate.example.json for reference."
        )
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.bindings.is_empty() {
            anyhow::bail!("At least one binding must be configured");
        }

        let mut seen_ids = std::collections::HashSet::new();
        for (key, binding) in &self.bindings {
            if binding.id.is_empty() {
                anyhow::bail!("Binding '{}' must have an id", key);
            }
            if !seen_ids.insert(binding.id.as_str()) {
                anyhow::bail!("Duplicate binding id '{}'", binding.id);
            }
            if binding.model.is_empty() {
                anyhow::bail!("Binding '{}' must have a model name", key);
            }
            if !binding.base_url.starts_with("http") {
                anyhow::bail!(
                    "Invalid base URL for binding '{}': {}",
                    key,
                    binding.base_url
                );
            }
        }

        Ok(())
    }

    /// Look up a binding by its stable id
    pub fn get_by_id(&self, id: &str) -> Option<ModelBinding> {
        self.sorted_keys().into_iter().find_map(|key| {
            let record = &self.bindings[key];
            (record.id == id).then(|| record.to_binding(key))
        })
    }

    /// Look up a binding by logical key
    pub fn get_by_key(&self, key: &str) -> Option<ModelBinding> {
        self.bindings
            .get(key)
            .map(|record| record.to_binding(key))
    }

    /// Look up a binding by backend model name
    ///
    /// Keys are scanned in sorted order so the result is deterministic when
    /// several bindings share a model name.
    pub fn get_by_name(&self, name: &str) -> Option<ModelBinding> {
        self.sorted_keys().into_iter().find_map(|key| {
            let record = &self.bindings[key];
            (record.model == name).then(|| record.to_binding(key))
        })
    }

    /// List all configured binding keys, sorted
    pub fn list_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.bindings.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn sorted_keys(&self) -> Vec<&String> {
        let mut keys: Vec<&String> = self.bindings.keys().collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_config() -> String {
        r#"{
            "bindings": {
                "fast": {
                    "id": "b-fast",
                    "model": "gpt-4o-mini",
                    "kind": "chat_completions",
                    "baseUrl": "https://api.openai.com/v1",
                    "priceInputPerMillion": 0.15,
                    "priceOutputPerMillion": 0.6
                },
                "deep": {
                    "id": "b-deep",
                    "model": "o3-mini",
                    "kind": "responses",
                    "baseUrl": "https://api.openai.com/v1",
                    "wireMode": "forced",
                    "supportsReasoning": true
                },
                "local": {
                    "id": "b-local",
                    "model": "llama3.2",
                    "kind": "local_ndjson",
                    "baseUrl": "http://localhost:11434"
                }
            }
        }"#
        .to_string()
    }

    fn load_test_config() -> GatewayConfig {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(create_test_config().as_bytes()).unwrap();
        GatewayConfig::load(file.path()).unwrap()
    }

    #[test]
    fn test_load_config() {
        let config = load_test_config();
        assert_eq!(config.bindings.len(), 3);
        assert!(config.bindings.contains_key("fast"));
        assert_eq!(config.server.port, 8089);
    }

    #[test]
    fn test_get_by_key() {
        let config = load_test_config();
        let binding = config.get_by_key("fast").unwrap();
        assert_eq!(binding.id, "b-fast");
        assert_eq!(binding.model, "gpt-4o-mini");
        assert_eq!(binding.kind, BackendKind::ChatCompletions);
        assert_eq!(binding.wire_mode, WireMode::Auto);
        assert!(binding.has_pricing());

        assert!(config.get_by_key("nope").is_none());
    }

    #[test]
    fn test_get_by_id() {
        let config = load_test_config();
        let binding = config.get_by_id("b-deep").unwrap();
        assert_eq!(binding.key, "deep");
        assert!(binding.supports_reasoning);
        assert_eq!(binding.wire_mode, WireMode::Forced);
    }

    #[test]
    fn test_get_by_name() {
        let config = load_test_config();
        let binding = config.get_by_name("llama3.2").unwrap();
        assert_eq!(binding.key, "local");
        assert_eq!(binding.kind, BackendKind::LocalNdjson);
        assert!(!binding.has_pricing());
    }

    #[test]
    fn test_list_keys_sorted() {
        let config = load_test_config();
        assert_eq!(config.list_keys(), vec!["deep", "fast", "local"]);
    }

    #[test]
    fn test_validation_empty_bindings() {
        let config_str = r#"{"bindings": {}}"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(config_str.as_bytes()).unwrap();
        assert!(GatewayConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_validation_duplicate_ids() {
        let config_str = r#"{
            "bindings": {
                "a": {"id": "same", "model": "m1", "kind": "chat_completions", "baseUrl": "https://x"},
                "b": {"id": "same", "model": "m2", "kind": "chat_completions", "baseUrl": "https://y"}
            }
        }"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(config_str.as_bytes()).unwrap();
        assert!(GatewayConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_validation_bad_url() {
        let config_str = r#"{
            "bindings": {
                "a": {"id": "b-1", "model": "m", "kind": "chat_completions", "baseUrl": "ftp://x"}
            }
        }"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(config_str.as_bytes()).unwrap();
        assert!(GatewayConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_credential_env_indirection() {
        std::env::set_var("MODELGATE_TEST_KEY_FILE_RS", "sk-from-env");
        let record = BindingRecord {
            id: "b-1".into(),
            model: "m".into(),
            kind: BackendKind::ChatCompletions,
            base_url: "https://x".into(),
            api_key: String::new(),
            api_key_env: Some("MODELGATE_TEST_KEY_FILE_RS".into()),
            wire_mode: WireMode::Auto,
            supports_reasoning: false,
            price_input_per_million: None,
            price_output_per_million: None,
            currency: "USD".into(),
        };
        assert_eq!(record.credential().as_deref(), Some("sk-from-env"));
        std::env::remove_var("MODELGATE_TEST_KEY_FILE_RS");
    }
}
