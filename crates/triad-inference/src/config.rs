//! Inference backend configuration.
//!
//! ```json
//! {
//!   "primary": { "type": "ollama", "model": "qwen3:8b" },
//!   "backups": [
//!     { "type": "vllm", "api_url": "https://my-vllm.example.com", "model": "qwen3-8b" },
//!     { "type": "digitalocean", "api_url": "https://my-app.ondigitalocean.app" }
//!   ]
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::backend::GenerationBackend;
use crate::error::{InferenceError, Result};
use crate::layer::InferenceLayer;
use crate::providers::{
    DigitalOceanProvider, LiteLlmProvider, OllamaProvider, VllmProvider, DEFAULT_OLLAMA_MODEL,
    DEFAULT_OLLAMA_URL,
};

const DEFAULT_REMOTE_MODEL: &str = "qwen3-8b";

/// One provider entry. `type` is kept as a string so that unknown backup
/// types can be skipped instead of failing the whole document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl ProviderConfig {
    pub fn ollama() -> Self {
        Self {
            kind: "ollama".to_string(),
            model: None,
            base_url: None,
            api_url: None,
            api_key: None,
        }
    }

    fn require_api_url(&self) -> Result<&str> {
        self.api_url.as_deref().ok_or_else(|| {
            InferenceError::Config(format!("provider type {} requires api_url", self.kind))
        })
    }

    /// Builds the provider, or `Ok(None)` if the type is unknown.
    fn build(&self) -> Result<Option<Arc<dyn GenerationBackend>>> {
        let model = |default: &str| self.model.clone().unwrap_or_else(|| default.to_string());

        let provider: Arc<dyn GenerationBackend> = match self.kind.as_str() {
            "ollama" => Arc::new(OllamaProvider::new(
                model(DEFAULT_OLLAMA_MODEL),
                self.base_url
                    .as_deref()
                    .unwrap_or(DEFAULT_OLLAMA_URL),
            )),
            "vllm" => Arc::new(VllmProvider::new(
                self.require_api_url()?,
                model(DEFAULT_REMOTE_MODEL),
                self.api_key.clone(),
            )),
            "litellm" => Arc::new(LiteLlmProvider::new(
                self.require_api_url()?,
                model(DEFAULT_REMOTE_MODEL),
                self.api_key.clone(),
            )),
            "digitalocean" => Arc::new(DigitalOceanProvider::new(
                self.require_api_url()?,
                self.api_key.clone(),
            )),
            _ => return Ok(None),
        };
        Ok(Some(provider))
    }
}

/// Primary provider plus ordered backups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceConfig {
    pub primary: ProviderConfig,
    #[serde(default)]
    pub backups: Vec<ProviderConfig>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            primary: ProviderConfig::ollama(),
            backups: Vec::new(),
        }
    }
}

impl InferenceConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| InferenceError::Config(e.to_string()))
    }

    /// Reads the config file, or returns the default (local Ollama) if it
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            InferenceError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }
}

/// Builds an [`InferenceLayer`] from configuration.
///
/// # Errors
/// [`InferenceError::Config`] if the primary type is unknown or a remote
/// provider lacks `api_url`. Unknown backup types are skipped with a warning.
pub fn create_inference_layer(config: &InferenceConfig) -> Result<InferenceLayer> {
    let primary = config.primary.build()?.ok_or_else(|| {
        InferenceError::Config(format!("unknown provider type: {}", config.primary.kind))
    })?;

    let mut backups = Vec::new();
    for backup in &config.backups {
        match backup.build()? {
            Some(provider) => backups.push(provider),
            None => warn!(kind = %backup.kind, "Unknown backup provider type, skipping"),
        }
    }

    info!(
        primary = %primary.name(),
        backups = backups.len(),
        "Created inference layer"
    );
    Ok(InferenceLayer::new(primary, backups))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_unknown_primary_is_error() {
        let config = InferenceConfig::from_json(r#"{"primary": {"type": "openstack"}}"#).unwrap();
        let err = create_inference_layer(&config).unwrap_err();
        assert!(err.to_string().contains("unknown provider type: openstack"));
    }

    #[test]
    fn test_unknown_backup_is_skipped() {
        let config = InferenceConfig::from_json(
            r#"{
                "primary": {"type": "ollama"},
                "backups": [
                    {"type": "mystery"},
                    {"type": "vllm", "api_url": "https://vllm.example.com"}
                ]
            }"#,
        )
        .unwrap();
        let layer = create_inference_layer(&config).unwrap();
        assert_eq!(layer.provider_count(), 2);
    }

    #[test]
    fn test_remote_provider_requires_url() {
        let config = InferenceConfig::from_json(r#"{"primary": {"type": "litellm"}}"#).unwrap();
        assert!(matches!(
            create_inference_layer(&config),
            Err(InferenceError::Config(_))
        ));
    }

    #[test]
    fn test_load_or_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("inference.json");
        assert_eq!(
            InferenceConfig::load_or_default(&path).unwrap(),
            InferenceConfig::default()
        );

        std::fs::write(
            &path,
            r#"{"primary": {"type": "digitalocean", "api_url": "https://do.example"}}"#,
        )
        .unwrap();
        let config = InferenceConfig::load_or_default(&path).unwrap();
        assert_eq!(config.primary.kind, "digitalocean");
        assert!(config.backups.is_empty());
    }
}
