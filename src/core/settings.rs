//! Application settings persistence
//!
//! Key-value settings backing the front-end: default download directory,
//! parallel-download bound, connectivity-test URL, plus the cosmetic keys
//! the UI persists. Stored as JSON under the platform config directory.

use anyhow::{Context, Result};
use directories::{ProjectDirs, UserDirs};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persisted application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub locale: String,
    pub dark: bool,
    /// Default destination directory offered for new batch jobs
    pub default_dir: String,
    /// Upper bound offered for parallel batches
    pub max_parallel_downloads: usize,
    /// Host probed by the pre-flight connectivity check
    pub conntest_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        let default_dir = UserDirs::new()
            .and_then(|dirs| dirs.video_dir().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            locale: "en_US".to_string(),
            dark: false,
            default_dir: default_dir.to_string_lossy().into_owned(),
            max_parallel_downloads: 10,
            conntest_url: "https://8.8.8.8".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from the platform config path, creating defaults if
    /// none exist yet
    pub fn load() -> Result<Self> {
        let path = Self::settings_path()?;
        if path.exists() {
            let settings = Self::load_from(&path)?;
            tracing::info!("Loaded settings from: {:?}", path);
            Ok(settings)
        } else {
            let settings = Self::default();
            settings.save()?;
            tracing::info!("Created default settings at: {:?}", path);
            Ok(settings)
        }
    }

    /// Save settings to the platform config path
    pub fn save(&self) -> Result<()> {
        let path = Self::settings_path()?;
        self.save_to(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {:?}", path))?;
        let settings: Settings =
            serde_json::from_str(&content).with_context(|| "Failed to parse settings file")?;
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create settings directory: {:?}", parent))?;
        }
        let content =
            serde_json::to_string_pretty(self).with_context(|| "Failed to serialize settings")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write settings file: {:?}", path))?;
        Ok(())
    }

    /// Path of the settings file under the platform config directory
    pub fn settings_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("com", "mediadownloader", "deluxe")
            .with_context(|| "Failed to get project directories")?;
        Ok(project_dirs.config_dir().join("settings.json"))
    }

    /// Reset to defaults and persist
    pub fn reset() -> Result<Self> {
        let settings = Self::default();
        settings.save()?;
        tracing::info!("Reset settings to defaults");
        Ok(settings)
    }

    /// Create a timestamped backup next to the settings file
    pub fn backup(&self) -> Result<PathBuf> {
        let path = Self::settings_path()?;
        let backup_path = path.with_extension(format!(
            "backup.{}.json",
            chrono::Utc::now().format("%Y%m%d_%H%M%S")
        ));
        self.save_to(&backup_path)?;
        tracing::info!("Created settings backup: {:?}", backup_path);
        Ok(backup_path)
    }

    /// Validate settings values
    pub fn validate(&self) -> Result<()> {
        if self.max_parallel_downloads == 0 {
            anyhow::bail!("max_parallel_downloads must be greater than 0");
        }
        if self.max_parallel_downloads > 20 {
            anyhow::bail!("max_parallel_downloads should not exceed 20");
        }

        if self.default_dir.is_empty() {
            anyhow::bail!("default_dir must not be empty");
        }

        let conntest = url::Url::parse(&self.conntest_url)
            .with_context(|| format!("Invalid conntest_url: {}", self.conntest_url))?;
        if conntest.scheme() != "http" && conntest.scheme() != "https" {
            anyhow::bail!("conntest_url must be an http(s) URL");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_validate() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.max_parallel_downloads, 10);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut settings = Settings::default();
        settings.dark = true;
        settings.max_parallel_downloads = 4;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert!(loaded.dark);
        assert_eq!(loaded.max_parallel_downloads, 4);
        assert_eq!(loaded.locale, settings.locale);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut settings = Settings::default();
        settings.max_parallel_downloads = 0;
        assert!(settings.validate().is_err());

        settings = Settings::default();
        settings.max_parallel_downloads = 50;
        assert!(settings.validate().is_err());

        settings = Settings::default();
        settings.conntest_url = "ftp://8.8.8.8".to_string();
        assert!(settings.validate().is_err());

        settings = Settings::default();
        settings.conntest_url = "not a url".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = Settings::load_from(&dir.path().join("nope.json"));
        assert!(result.is_err());
    }
}
