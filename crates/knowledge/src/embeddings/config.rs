//! Embedding configuration.

use crimestat_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Embedding settings, stored under `embedding:` in the knowledge config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "trigram" or "ollama"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Number of texts sent to the provider per call while building the index
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Provider-specific configuration (JSON object), e.g. `{"endpoint": "..."}`
    #[serde(default = "default_provider_config")]
    pub provider_config: serde_json::Value,
}

fn default_batch_size() -> usize {
    100
}

fn default_provider_config() -> serde_json::Value {
    serde_json::json!({})
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            batch_size: default_batch_size(),
            provider_config: default_provider_config(),
        }
    }
}

impl EmbeddingConfig {
    /// String value from `provider_config`, if set.
    pub fn provider_option(&self, key: &str) -> Option<&str> {
        self.provider_config.get(key).and_then(|v| v.as_str())
    }

    /// Reject settings no provider can honor.
    pub fn validate(&self) -> AppResult<()> {
        if self.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be greater than zero".to_string(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(AppError::Config(
                "Embedding model must not be empty".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(AppError::Config(
                "Embedding batch_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.provider, "trigram");
        assert_eq!(config.model, "trigram-v1");
        assert_eq!(config.dimensions, 384);
        assert_eq!(config.batch_size, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_defaults_fill_in() {
        let yaml = "provider: ollama\nmodel: nomic-embed-text\ndimensions: 768\n";
        let config: EmbeddingConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.provider_option("endpoint"), None);
    }

    #[test]
    fn test_provider_option() {
        let config = EmbeddingConfig {
            provider_config: serde_json::json!({"endpoint": "http://gpu-box:11434"}),
            ..Default::default()
        };
        assert_eq!(
            config.provider_option("endpoint"),
            Some("http://gpu-box:11434")
        );
    }

    #[test]
    fn test_validate_zero_dimensions() {
        let config = EmbeddingConfig {
            dimensions: 0,
            ..Default::default()
        };
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("dimensions"));
    }
}
