//! Application configuration management.
//!
//! Persisted defaults for flags a user tends to set once (size threshold,
//! paranoid verification, filesystem boundaries). CLI flags always win
//! over the file; a missing or unreadable file silently falls back to
//! the built-in defaults.

use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Persisted defaults for a dupelink run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Default minimum file size in bytes.
    #[serde(default)]
    pub min_size: Option<u64>,

    /// Verify matches byte-by-byte by default.
    #[serde(default)]
    pub paranoid: bool,

    /// Stay on one filesystem by default.
    #[serde(default)]
    pub one_file_system: bool,
}

impl Config {
    /// Load the configuration from the default platform-specific path.
    #[must_use]
    pub fn load() -> Self {
        match Self::load_internal() {
            Ok(config) => config,
            Err(e) => {
                log::debug!("Failed to load config, using defaults: {e}");
                Self::default()
            }
        }
    }

    fn load_internal() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save the configuration to the default platform-specific path.
    ///
    /// # Errors
    ///
    /// Fails when the config directory cannot be determined or written.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the default platform-specific configuration path.
    fn config_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("com", "dupelink", "dupelink")
            .ok_or_else(|| anyhow::anyhow!("Failed to determine project directories"))?;
        Ok(project_dirs.config_dir().join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.min_size.is_none());
        assert!(!config.paranoid);
        assert!(!config.one_file_system);
    }

    #[test]
    fn test_round_trip_through_json() {
        let config = Config {
            min_size: Some(4096),
            paranoid: true,
            one_file_system: false,
        };
        let json = serde_json::to_string(&config).unwrap();
        let restored: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.min_size, Some(4096));
        assert!(restored.paranoid);
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let restored: Config = serde_json::from_str("{}").unwrap();
        assert!(restored.min_size.is_none());
        assert!(!restored.paranoid);
        assert!(!restored.one_file_system);
    }
}
