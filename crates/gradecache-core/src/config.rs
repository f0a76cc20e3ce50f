//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! an optional override of the grades endpoint, the pass mark used by the
//! solver, the request timeout and an optional cache directory.
//!
//! Configuration is stored at `~/.config/gradecache/config.json`.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::api::client::{DEFAULT_GRADES_URL, REQUEST_TIMEOUT_SECS};
use crate::solver::DEFAULT_TARGET;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "gradecache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub grades_url: Option<String>,
    #[serde(default)]
    pub target_average: Option<f64>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn grades_url(&self) -> &str {
        self.grades_url.as_deref().unwrap_or(DEFAULT_GRADES_URL)
    }

    pub fn target_average(&self) -> f64 {
        self.target_average.unwrap_or(DEFAULT_TARGET)
    }

    pub fn request_timeout_secs(&self) -> u64 {
        self.request_timeout_secs.unwrap_or(REQUEST_TIMEOUT_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.grades_url(), DEFAULT_GRADES_URL);
        assert_eq!(config.target_average(), 6.0);
        assert_eq!(config.request_timeout_secs(), 30);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"target_average": 6.5}"#).unwrap();
        assert_eq!(config.target_average(), 6.5);
        assert_eq!(config.grades_url(), DEFAULT_GRADES_URL);
    }

    #[test]
    fn test_cache_dir_override() {
        let config = Config {
            cache_dir: Some(PathBuf::from("/tmp/gradecache-test")),
            ..Default::default()
        };
        assert_eq!(config.cache_dir().unwrap(), PathBuf::from("/tmp/gradecache-test"));
    }
}
