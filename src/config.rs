//! Configuration management for the Findastro client
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{FindastroError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable that overrides the backend base URL
pub const API_BASE_ENV: &str = "FINDASTRO_API_BASE";

/// Main configuration structure for the Findastro client
///
/// This structure holds all configuration needed by the client,
/// including backend connection settings, chat session behavior,
/// and reveal animation timing.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Backend connection configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Chat session behavior configuration
    #[serde(default)]
    pub chat: ChatConfig,

    /// Reveal animation timing configuration
    #[serde(default)]
    pub reveal: RevealConfig,
}

/// Backend connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the Findastro backend
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Shared request timeout in seconds
    ///
    /// The backend performs slow generative work (astrology reports, RAG),
    /// so this is deliberately long. Callers must stay responsive while a
    /// call is outstanding rather than assume low latency.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout() -> u64 {
    120
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl ApiConfig {
    /// The shared request timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Chat session behavior configuration
///
/// Timing knobs for the session controller: how often the readiness
/// status is polled, how long to wait before assuming readiness when the
/// status endpoint is silent, and how long a session may idle before the
/// inactivity prompt is raised.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Interval between readiness polls while the profile is processing (seconds)
    #[serde(default = "default_poll_interval")]
    pub status_poll_interval_seconds: u64,

    /// How long to wait for a first status response before forcing readiness (seconds)
    #[serde(default = "default_status_fallback")]
    pub status_fallback_seconds: u64,

    /// Idle time before the inactivity prompt is raised (seconds)
    #[serde(default = "default_inactivity_timeout")]
    pub inactivity_timeout_seconds: u64,
}

fn default_poll_interval() -> u64 {
    3
}

fn default_status_fallback() -> u64 {
    10
}

fn default_inactivity_timeout() -> u64 {
    600
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            status_poll_interval_seconds: default_poll_interval(),
            status_fallback_seconds: default_status_fallback(),
            inactivity_timeout_seconds: default_inactivity_timeout(),
        }
    }
}

/// Reveal animation timing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealConfig {
    /// Whether advisor replies are animated at all
    #[serde(default = "default_animate")]
    pub animate: bool,

    /// Composing indicator duration before each segment (seconds)
    #[serde(default = "default_composing")]
    pub composing_seconds: u64,

    /// Pause after each segment before the next composing phase (seconds)
    #[serde(default = "default_pause")]
    pub pause_seconds: u64,
}

fn default_animate() -> bool {
    true
}

fn default_composing() -> u64 {
    3
}

fn default_pause() -> u64 {
    2
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            animate: default_animate(),
            composing_seconds: default_composing(),
            pause_seconds: default_pause(),
        }
    }
}

impl RevealConfig {
    /// Composing indicator duration as a [`Duration`]
    pub fn composing_delay(&self) -> Duration {
        Duration::from_secs(self.composing_seconds)
    }

    /// Inter-segment pause as a [`Duration`]
    pub fn pause_delay(&self) -> Duration {
        Duration::from_secs(self.pause_seconds)
    }
}

impl Config {
    /// Load configuration from a YAML file with overrides applied
    ///
    /// Missing files are not an error: the client runs fine on defaults,
    /// so a missing config file simply yields the default configuration.
    /// After parsing, the backend base URL may be overridden by the
    /// `FINDASTRO_API_BASE` environment variable and then by the
    /// `--api-base` CLI flag (CLI wins).
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the YAML configuration file
    /// * `api_base_override` - Optional base URL override from the CLI
    ///
    /// # Errors
    ///
    /// Returns `FindastroError::Yaml` if the file exists but fails to parse.
    pub fn load(path: &str, api_base_override: Option<&str>) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            let contents = std::fs::read_to_string(path)?;
            serde_yaml::from_str(&contents).map_err(FindastroError::Yaml)?
        } else {
            tracing::debug!("No config file at {}, using defaults", path);
            Self::default()
        };

        if let Ok(base) = std::env::var(API_BASE_ENV) {
            if !base.trim().is_empty() {
                config.api.base_url = base;
            }
        }

        if let Some(base) = api_base_override {
            config.api.base_url = base.to_string();
        }

        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `FindastroError::Config` if the base URL is not a valid URL
    /// or any timing knob is zero.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.api.base_url).map_err(|e| {
            FindastroError::Config(format!("invalid api.base_url '{}': {}", self.api.base_url, e))
        })?;

        if self.api.timeout_seconds == 0 {
            return Err(
                FindastroError::Config("api.timeout_seconds must be greater than 0".into()).into(),
            );
        }
        if self.chat.status_poll_interval_seconds == 0 {
            return Err(FindastroError::Config(
                "chat.status_poll_interval_seconds must be greater than 0".into(),
            )
            .into());
        }
        if self.chat.status_fallback_seconds == 0 {
            return Err(FindastroError::Config(
                "chat.status_fallback_seconds must be greater than 0".into(),
            )
            .into());
        }
        if self.chat.inactivity_timeout_seconds == 0 {
            return Err(FindastroError::Config(
                "chat.inactivity_timeout_seconds must be greater than 0".into(),
            )
            .into());
        }

        Ok(())
    }
}
