//! Configuration management module
//!
//! Handles loading, saving, and validation of the endpoint configuration
//! the engine issues its transfers against. Test parameters themselves
//! (size, chunk granularity, duration) are driver-supplied per run and are
//! never persisted here.

use std::fs;
use std::path::{Path, PathBuf};

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::{ByrateError, Result, APP_NAME, CONFIG_FILE};

/// Endpoint configuration for a measurement engine instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Base URL of the download endpoint (streams filler bytes)
    pub download_url: String,
    /// Base URL of the upload endpoint (accepts octet-stream payloads)
    pub upload_url: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            download_url: "http://localhost:14000/download".to_string(),
            upload_url: "http://localhost:14000/upload".to_string(),
        }
    }
}

impl EndpointConfig {
    /// Create a new endpoint configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the download endpoint base URL
    pub fn with_download_url(mut self, url: impl Into<String>) -> Self {
        self.download_url = url.into();
        self
    }

    /// Set the upload endpoint base URL
    pub fn with_upload_url(mut self, url: impl Into<String>) -> Self {
        self.upload_url = url.into();
        self
    }

    /// Validate that both endpoint URLs are well-formed
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [("download", &self.download_url), ("upload", &self.upload_url)] {
            if url.is_empty() {
                return Err(ByrateError::ConfigError(format!(
                    "{} URL must not be empty",
                    name
                )));
            }

            Url::parse(url).map_err(|e| {
                ByrateError::ConfigError(format!("invalid {} URL {}: {}", name, url, e))
            })?;
        }

        Ok(())
    }

    /// Load configuration from the standard config file location
    /// Returns default configuration if the file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_file_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ByrateError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to the standard config file location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_file_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ByrateError::ConfigError(format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        self.save_to(&config_path)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;

        let content = toml::to_string_pretty(self)?;

        fs::write(path, content).map_err(|e| {
            ByrateError::ConfigError(format!(
                "Failed to write config file {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Get the standard configuration file path
    /// Uses the platform config dir, e.g. $HOME/.config/byrate/byrate.toml
    pub fn config_file_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            ByrateError::ConfigError("Unable to determine config directory".to_string())
        })?;

        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EndpointConfig::default().validate().is_ok());
    }

    #[test]
    fn test_empty_url_rejected() {
        let config = EndpointConfig::default().with_download_url("");
        assert!(matches!(
            config.validate(),
            Err(ByrateError::ConfigError(_))
        ));
    }

    #[test]
    fn test_malformed_url_rejected() {
        let config = EndpointConfig::default().with_upload_url("not a url");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builder_overrides() {
        let config = EndpointConfig::new()
            .with_download_url("https://example.com/down")
            .with_upload_url("https://example.com/up");

        assert_eq!(config.download_url, "https://example.com/down");
        assert_eq!(config.upload_url, "https://example.com/up");
    }

    #[test]
    fn test_toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        let config = EndpointConfig::new()
            .with_download_url("https://speed.example.com/download")
            .with_upload_url("https://speed.example.com/upload");

        config.save_to(&path).unwrap();
        let loaded = EndpointConfig::load_from(&path).unwrap();

        assert_eq!(loaded.download_url, config.download_url);
        assert_eq!(loaded.upload_url, config.upload_url);
    }

    #[test]
    fn test_config_file_path() {
        let path = EndpointConfig::config_file_path().unwrap();
        assert!(path.to_string_lossy().contains("byrate"));
        assert!(path.to_string_lossy().contains(CONFIG_FILE));
    }
}
