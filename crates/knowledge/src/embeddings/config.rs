//! Embedding configuration and the index manifest.
//!
//! The vectors in an index are only comparable with query vectors from the
//! same provider, model and dimension. The config used for the last rebuild
//! is written next to the index as `embedding.yaml` and checked before search.

use pigeon_core::{AppError, AppResult, EmbeddingSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const MANIFEST_FILE: &str = "embedding.yaml";

/// Embedding configuration for the corpus index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "mock", "ollama", "openai"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Maximum batch size for embedding requests
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Provider endpoint override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

fn default_batch_size() -> usize {
    100
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            batch_size: default_batch_size(),
            endpoint: None,
        }
    }
}

impl From<&EmbeddingSettings> for EmbeddingConfig {
    fn from(settings: &EmbeddingSettings) -> Self {
        Self {
            provider: settings.provider.clone(),
            model: settings.model.clone(),
            dimensions: settings.dimensions,
            batch_size: default_batch_size(),
            endpoint: settings.endpoint.clone(),
        }
    }
}

impl EmbeddingConfig {
    fn manifest_path(index_dir: &Path) -> PathBuf {
        index_dir.join(MANIFEST_FILE)
    }

    /// Load the manifest written by the last rebuild, if any.
    pub fn load(index_dir: &Path) -> AppResult<Option<Self>> {
        let path = Self::manifest_path(index_dir);

        if !path.exists() {
            tracing::debug!("No embedding manifest at {:?}", path);
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            AppError::Index(format!("Failed to read manifest at {:?}: {}", path, e))
        })?;

        let config = serde_yaml::from_str(&content).map_err(|e| {
            AppError::Index(format!("Failed to parse manifest at {:?}: {}", path, e))
        })?;

        Ok(Some(config))
    }

    /// Record this config as the one the index was built with.
    pub fn save(&self, index_dir: &Path) -> AppResult<()> {
        fs::create_dir_all(index_dir).map_err(|e| {
            AppError::Index(format!("Failed to create index directory: {}", e))
        })?;

        let yaml = serde_yaml::to_string(self)?;
        let path = Self::manifest_path(index_dir);

        fs::write(&path, yaml).map_err(|e| {
            AppError::Index(format!("Failed to write manifest to {:?}: {}", path, e))
        })?;

        tracing::debug!("Saved embedding manifest to {:?}", path);
        Ok(())
    }

    /// Check that an index built with `self` can be queried with `other`.
    pub fn validate_consistency(&self, other: &Self) -> AppResult<()> {
        if self.provider != other.provider {
            return Err(AppError::Index(format!(
                "Provider mismatch: index built with '{}', configured '{}'. Re-index required.",
                self.provider, other.provider
            )));
        }

        if self.model != other.model {
            return Err(AppError::Index(format!(
                "Model mismatch: index built with '{}', configured '{}'. Re-index required.",
                self.model, other.model
            )));
        }

        if self.dimensions != other.dimensions {
            return Err(AppError::Index(format!(
                "Dimension mismatch: index built with {}, configured {}. Re-index required.",
                self.dimensions, other.dimensions
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_settings() {
        let settings = EmbeddingSettings {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            endpoint: None,
            api_key_env: None,
        };
        let config = EmbeddingConfig::from(&settings);
        assert_eq!(config.provider, "openai");
        assert_eq!(config.dimensions, 1536);
        assert_eq!(config.batch_size, 100);
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        assert!(EmbeddingConfig::load(temp.path()).unwrap().is_none());

        let config = EmbeddingConfig {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            ..Default::default()
        };
        config.save(temp.path()).unwrap();

        let loaded = EmbeddingConfig::load(temp.path()).unwrap().unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_validate_consistency_success() {
        let config = EmbeddingConfig::default();
        assert!(config.validate_consistency(&config.clone()).is_ok());
    }

    #[test]
    fn test_validate_consistency_model_mismatch() {
        let config1 = EmbeddingConfig::default();
        let config2 = EmbeddingConfig {
            model: "other".to_string(),
            ..config1.clone()
        };

        let err = config1.validate_consistency(&config2).unwrap_err();
        assert!(matches!(err, AppError::Index(_)));
        assert!(err.to_string().contains("Model mismatch"));
    }

    #[test]
    fn test_validate_consistency_dimension_mismatch() {
        let config1 = EmbeddingConfig::default();
        let config2 = EmbeddingConfig {
            dimensions: 1536,
            ..config1.clone()
        };

        let result = config1.validate_consistency(&config2);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Dimension mismatch"));
    }
}
