// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Gateway configuration, stored as JSON in `~/.agentguard/config.json`.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::security::guard::DEFAULT_SESSION_TIMEOUT;
use crate::security::rate_limit::{DEFAULT_MAX_REQUESTS, DEFAULT_RATE_LIMIT_WINDOW};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Length of a rate-limit window in seconds (default: 60)
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,
    /// Requests admitted per window (default: 100)
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    /// Inactivity before a session expires, in seconds (default: 1800)
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,
    /// Default tracing filter when RUST_LOG is unset (default: "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Write masked records to a log file (default: true)
    #[serde(default = "default_file_log_enabled")]
    pub file_log_enabled: bool,
    /// Directory for log files (default: ~/.agentguard/logs)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_rate_limit_window_secs() -> u64 {
    DEFAULT_RATE_LIMIT_WINDOW.as_secs()
}

fn default_max_requests() -> u32 {
    DEFAULT_MAX_REQUESTS
}

fn default_session_timeout_secs() -> u64 {
    DEFAULT_SESSION_TIMEOUT.as_secs()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_file_log_enabled() -> bool {
    true
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            rate_limit_window_secs: default_rate_limit_window_secs(),
            max_requests: default_max_requests(),
            session_timeout_secs: default_session_timeout_secs(),
            log_level: default_log_level(),
            file_log_enabled: default_file_log_enabled(),
            log_dir: None,
        }
    }
}

impl GatewayConfig {
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    /// Reject settings that would make every request fail.
    pub fn validate(&self) -> Result<()> {
        if self.rate_limit_window_secs == 0 {
            bail!("rate_limit_window_secs must be greater than 0");
        }
        if self.max_requests == 0 {
            bail!("max_requests must be greater than 0");
        }
        if self.session_timeout_secs == 0 {
            bail!("session_timeout_secs must be greater than 0");
        }
        Ok(())
    }

    /// Log directory, falling back to `<config dir>/logs`.
    pub fn resolved_log_dir(&self) -> Result<PathBuf> {
        match &self.log_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(config_dir()?.join("logs")),
        }
    }

    /// Load from `path`, or defaults if the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let config: Self = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Could not read {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid config file {}", path.display()))?
        } else {
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// `~/.agentguard`
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(".agentguard"))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.json"))
}

pub fn load_config() -> Result<GatewayConfig> {
    GatewayConfig::load_from(&config_path()?)
}

pub fn save_config(config: &GatewayConfig) -> Result<()> {
    config.save_to(&config_path()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.rate_limit_window(), Duration::from_secs(60));
        assert_eq!(config.max_requests, 100);
        assert_eq!(config.session_timeout(), Duration::from_secs(30 * 60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: GatewayConfig = serde_json::from_str(r#"{"max_requests": 5}"#).unwrap();
        assert_eq!(config.max_requests, 5);
        assert_eq!(config.rate_limit_window_secs, 60);
        assert_eq!(config.session_timeout_secs, 1800);
        assert!(config.file_log_enabled);
    }

    #[test]
    fn test_validate_rejects_zeroes() {
        let config = GatewayConfig { max_requests: 0, ..Default::default() };
        assert!(config.validate().is_err());

        let config = GatewayConfig { rate_limit_window_secs: 0, ..Default::default() };
        assert!(config.validate().is_err());

        let config = GatewayConfig { session_timeout_secs: 0, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = GatewayConfig {
            max_requests: 10,
            log_dir: Some(dir.path().join("logs")),
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        assert_eq!(GatewayConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = GatewayConfig::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, GatewayConfig::default());
    }

    #[test]
    fn test_load_invalid_values_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"session_timeout_secs": 0}"#).unwrap();

        assert!(GatewayConfig::load_from(&path).is_err());
    }
}
