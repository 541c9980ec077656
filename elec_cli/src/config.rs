//! Configuration management for the elec CLI
//!
//! Config stored at: <config dir>/elec-calc/config.json

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::OutputFormat;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Default output format (table, json)
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Code tables TOML file used instead of the embedded NEC 2023 tables
    #[serde(default)]
    pub tables_path: Option<PathBuf>,

    /// Service voltage for `elec dwelling` without --voltage
    #[serde(default = "default_service_voltage")]
    pub default_service_voltage: i32,

    /// Name written to job lock files and new jobs
    #[serde(default)]
    pub user_id: Option<String>,
}

fn default_service_voltage() -> i32 {
    240
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::default(),
            tables_path: None,
            default_service_voltage: default_service_voltage(),
            user_id: None,
        }
    }
}

impl Config {
    pub fn config_dir() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .context("Could not determine the user config directory")?
            .join("elec-calc");
        Ok(dir)
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Load config from file, or the defaults when there is none
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config {}", path.display()))?;
        Ok(())
    }

    /// Configured user, else the login name, else "unknown"
    pub fn user(&self) -> String {
        self.user_id
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .or_else(|| std::env::var("USERNAME").ok())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

impl std::fmt::Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "elec Configuration")?;
        writeln!(f, "==================")?;
        writeln!(f)?;
        writeln!(f, "Output format:    {}", self.output_format)?;
        writeln!(
            f,
            "Code tables:      {}",
            self.tables_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(embedded NEC 2023)".to_string())
        )?;
        writeln!(f, "Service voltage:  {} V", self.default_service_voltage)?;
        write!(f, "User:             {}", self.user())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.default_service_voltage, 240);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "output_format": "json" }"#).unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.output_format, OutputFormat::Json);
        assert_eq!(config.default_service_voltage, 240);
        assert!(config.tables_path.is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            default_service_voltage: 208,
            user_id: Some("j.sparks".to_string()),
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
        assert_eq!(config.user(), "j.sparks");
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
