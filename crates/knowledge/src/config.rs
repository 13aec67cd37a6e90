//! Knowledge configuration management.

use crate::types::KnowledgeConfig;
use crimestat_core::config::STATE_DIR;
use crimestat_core::{AppError, AppResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Load the knowledge configuration.
///
/// Loads from `.crimestat/knowledge.yaml` if it exists, otherwise returns
/// the defaults.
pub fn load_config(workspace: &Path) -> AppResult<KnowledgeConfig> {
    let config_path = get_config_path(workspace);

    if !config_path.exists() {
        tracing::debug!("Using default knowledge config (no config file found)");
        return Ok(KnowledgeConfig::default());
    }

    let content = fs::read_to_string(&config_path).map_err(|e| {
        AppError::Knowledge(format!("Failed to read config at {:?}: {}", config_path, e))
    })?;

    let config: KnowledgeConfig = serde_yaml::from_str(&content).map_err(|e| {
        AppError::Knowledge(format!("Failed to parse config at {:?}: {}", config_path, e))
    })?;

    tracing::debug!("Loaded knowledge config from {:?}", config_path);
    Ok(config)
}

/// Save the knowledge configuration.
pub fn save_config(workspace: &Path, config: &KnowledgeConfig) -> AppResult<()> {
    let config_path = get_config_path(workspace);

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            AppError::Knowledge(format!("Failed to create config directory: {}", e))
        })?;
    }

    let yaml = serde_yaml::to_string(config)
        .map_err(|e| AppError::Knowledge(format!("Failed to serialize config: {}", e)))?;

    fs::write(&config_path, yaml).map_err(|e| {
        AppError::Knowledge(format!("Failed to write config to {:?}: {}", config_path, e))
    })?;

    tracing::debug!("Saved knowledge config to {:?}", config_path);
    Ok(())
}

/// Get the path to the knowledge config file.
pub fn get_config_path(workspace: &Path) -> PathBuf {
    workspace.join(STATE_DIR).join("knowledge.yaml")
}

/// Get the SQLite embedding cache path.
pub fn get_cache_path(workspace: &Path) -> PathBuf {
    workspace.join(STATE_DIR).join("embeddings.sqlite")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_default_config() {
        let temp = TempDir::new().unwrap();
        let config = load_config(temp.path()).unwrap();

        assert_eq!(config.files.historical, "historicos.csv");
        assert_eq!(config.files.predictions, "predicciones.csv");
        assert_eq!(config.embedding.provider, "trigram");
        assert_eq!(config.chunking.max_groups, 10);
        assert_eq!(config.chunking.max_sample_records, 100);
        assert_eq!(config.top_k, 3);
        assert!(config.cache_embeddings);
    }

    #[test]
    fn test_save_and_load_config() {
        let temp = TempDir::new().unwrap();
        let mut config = KnowledgeConfig::default();
        config.chunking.max_groups = 25;
        config.cache_embeddings = false;

        save_config(temp.path(), &config).unwrap();
        assert!(get_config_path(temp.path()).exists());

        let loaded = load_config(temp.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let path = get_config_path(temp.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "top_k: 5\nchunking:\n  max_groups: 20\n").unwrap();

        let config = load_config(temp.path()).unwrap();
        assert_eq!(config.top_k, 5);
        assert_eq!(config.chunking.max_groups, 20);
        assert_eq!(config.chunking.max_sample_records, 100);
        assert_eq!(config.embedding.dimensions, 384);
    }

    #[test]
    fn test_invalid_yaml() {
        let temp = TempDir::new().unwrap();
        let path = get_config_path(temp.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "top_k: [not a number\n").unwrap();

        assert!(matches!(load_config(temp.path()), Err(AppError::Knowledge(_))));
    }
}
