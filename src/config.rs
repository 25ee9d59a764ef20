use crate::error::{Result, RegistrarError};
use serde::Deserialize;
use std::fs;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub backend: BackendConfig,
    #[serde(default)]
    pub tables: TableConfig,
}

/// Connection settings for the hosted persistence service.
#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    pub url: String,
    pub timeout_seconds: u64,
}

/// Stored table and bucket names; must match the service schema exactly
/// for persistence to round-trip.
#[derive(Debug, Clone, Deserialize)]
pub struct TableConfig {
    pub students: String,
    pub education: String,
    pub documents_bucket: String,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            students: "students".to_string(),
            education: "education_records".to_string(),
            documents_bucket: "student-documents".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = "config.toml";
        let config_content = fs::read_to_string(config_path)
            .map_err(|e| RegistrarError::Config(format!("Failed to read config file '{}': {}", config_path, e)))?;

        let config: Config = toml::from_str(&config_content)?;
        Ok(config)
    }
}
