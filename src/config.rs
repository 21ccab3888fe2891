//! Configuration for chat-relay.
//!
//! Configuration lives at `~/.chat-relay/config.json`. Every field has a
//! default, so a missing file means the service starts with defaults.
//!
//! # Configuration Priority
//!
//! 1. Environment variables
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `CHAT_RELAY_PORT` → service.port
//! - `CHAT_RELAY_BIND_ADDRESS` → network.bind
//! - `CHAT_RELAY_LOG_LEVEL` → observability.log_level
//! - `GEMINI_API_KEY` / `GOOGLE_API_KEY` → secrets.google

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".chat-relay"),
        |dirs| dirs.home_dir().join(".chat-relay"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Network Configuration
// ============================================================================

/// Bind address configuration.
///
/// Default is `127.0.0.1` (local only). Set to `0.0.0.0` for remote access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_bind_address")]
    pub bind: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: default_bind_address(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".into()
}

// ============================================================================
// Service Configuration
// ============================================================================

/// HTTP service configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServiceConfig {
    /// Port to listen on (default 8000)
    #[serde(default)]
    pub port: Option<u16>,
}

// ============================================================================
// Chat Configuration
// ============================================================================

/// Chat behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Gemini model used for every conversation
    #[serde(default = "default_model")]
    pub model: String,

    /// System instruction seeded into each new conversation
    #[serde(default = "default_system_instruction")]
    pub system_instruction: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Response token cap
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: i64,

    /// Override for the Gemini API base URL (tests, self-hosted proxies)
    #[serde(default)]
    pub api_base: Option<String>,

    /// Evict sessions idle for longer than this many seconds.
    ///
    /// Unset means sessions live until deleted or the process exits.
    #[serde(default)]
    pub idle_timeout_secs: Option<u64>,
}

impl ChatConfig {
    /// Idle eviction threshold, when configured.
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            system_instruction: default_system_instruction(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            api_base: None,
            idle_timeout_secs: None,
        }
    }
}

fn default_model() -> String {
    "gemini-2.5-flash".into()
}

fn default_system_instruction() -> String {
    "You are an intelligent assistant specializing in Python and FastAPI \
     programming best practices. Answer clearly and concisely, with code \
     examples when appropriate."
        .into()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_output_tokens() -> i64 {
    8192
}

// ============================================================================
// Secrets Configuration
// ============================================================================

/// API credentials.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SecretsConfig {
    /// Google AI Studio API key for Gemini
    #[serde(default)]
    pub google: Option<String>,
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure for the relay.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Bind address
    #[serde(default)]
    pub network: NetworkConfig,

    /// HTTP service settings
    #[serde(default)]
    pub service: ServiceConfig,

    /// Chat behavior
    #[serde(default)]
    pub chat: ChatConfig,

    /// Credentials
    #[serde(default)]
    pub secrets: SecretsConfig,

    /// Logging
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides applied.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("CHAT_RELAY_PORT") {
            if let Ok(p) = port.parse() {
                self.service.port = Some(p);
            }
        }

        if let Ok(bind) = std::env::var("CHAT_RELAY_BIND_ADDRESS") {
            self.network.bind = bind;
        }

        if let Ok(level) = std::env::var("CHAT_RELAY_LOG_LEVEL") {
            self.observability.log_level = level;
        }

        if let Ok(key) =
            std::env::var("GEMINI_API_KEY").or_else(|_| std::env::var("GOOGLE_API_KEY"))
        {
            self.secrets.google = Some(key);
        }
    }

    /// Get the effective bind address.
    pub fn bind_address(&self) -> &str {
        &self.network.bind
    }

    /// Get the effective service port.
    pub fn port(&self) -> u16 {
        self.service.port.unwrap_or(8000)
    }

    /// Get the Gemini API key, if configured.
    pub fn google_api_key(&self) -> Option<String> {
        self.secrets.google.clone()
    }
}
