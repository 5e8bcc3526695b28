//! Configuration management for Ragline
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{RaglineError, Result};
use crate::session::ChunkPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for Ragline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend connection settings
    #[serde(default)]
    pub backend: BackendConfig,
    /// Chat/session behavior settings
    #[serde(default)]
    pub chat: ChatConfig,
    /// Health monitor settings
    #[serde(default)]
    pub health: HealthConfig,
}

/// Backend connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend base URL
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP connect timeout (seconds)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

fn default_host() -> String {
    "http://localhost:8000".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

impl BackendConfig {
    /// Connect timeout as a [`Duration`]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

/// Chat/session behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// How chunk text relates to the accumulated reply:
    /// `replace` (chunks carry the full response so far) or
    /// `append` (chunks carry incremental deltas)
    #[serde(default)]
    pub chunk_policy: ChunkPolicy,

    /// Debounce before the post-stream conversation-list refresh (ms)
    #[serde(default = "default_refresh_debounce_ms")]
    pub refresh_debounce_ms: u64,
}

fn default_refresh_debounce_ms() -> u64 {
    500
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            chunk_policy: ChunkPolicy::default(),
            refresh_debounce_ms: default_refresh_debounce_ms(),
        }
    }
}

impl ChatConfig {
    /// Refresh debounce as a [`Duration`]
    pub fn refresh_debounce(&self) -> Duration {
        Duration::from_millis(self.refresh_debounce_ms)
    }
}

/// Health monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Seconds between liveness polls
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
}

fn default_poll_interval() -> u64 {
    15
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: default_poll_interval(),
        }
    }
}

impl HealthConfig {
    /// Poll interval as a [`Duration`]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RaglineError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| RaglineError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(host) = std::env::var("RAGLINE_HOST") {
            self.backend.host = host;
        }

        if let Ok(policy) = std::env::var("RAGLINE_CHUNK_POLICY") {
            self.chat.chunk_policy = match policy.to_lowercase().as_str() {
                "replace" => ChunkPolicy::Replace,
                "append" => ChunkPolicy::Append,
                _ => {
                    tracing::warn!("Invalid RAGLINE_CHUNK_POLICY: {}, using default", policy);
                    ChunkPolicy::default()
                }
            };
        }

        if let Ok(interval) = std::env::var("RAGLINE_HEALTH_INTERVAL_SECONDS") {
            if let Ok(value) = interval.parse() {
                self.health.poll_interval_seconds = value;
            } else {
                tracing::warn!("Invalid RAGLINE_HEALTH_INTERVAL_SECONDS: {}", interval);
            }
        }

        if let Ok(debounce) = std::env::var("RAGLINE_REFRESH_DEBOUNCE_MS") {
            if let Ok(value) = debounce.parse() {
                self.chat.refresh_debounce_ms = value;
            } else {
                tracing::warn!("Invalid RAGLINE_REFRESH_DEBOUNCE_MS: {}", debounce);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(host) = &cli.host {
            self.backend.host = host.clone();
        }
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }
    }

    /// Validate the configuration
    ///
    /// Ensures all configuration values are within acceptable ranges
    /// and that required fields are properly set.
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.backend.host.is_empty() {
            return Err(RaglineError::Config("backend.host cannot be empty".to_string()).into());
        }

        let parsed = url::Url::parse(&self.backend.host)
            .map_err(|e| RaglineError::Config(format!("Invalid backend.host: {}", e)))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(RaglineError::Config(format!(
                "backend.host must use http or https, got: {}",
                parsed.scheme()
            ))
            .into());
        }

        if self.backend.connect_timeout_seconds == 0 {
            return Err(RaglineError::Config(
                "backend.connect_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.health.poll_interval_seconds == 0 {
            return Err(RaglineError::Config(
                "health.poll_interval_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.chat.refresh_debounce_ms > 60_000 {
            return Err(RaglineError::Config(
                "chat.refresh_debounce_ms must be at most 60000".to_string(),
            )
            .into());
        }

        Ok(())
    }
}
