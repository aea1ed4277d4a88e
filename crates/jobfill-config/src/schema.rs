//! Configuration schema definitions.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use jobfill_protocols::Locator;

use crate::loader::ConfigLoader;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bridge: BridgeConfig,

    #[serde(default)]
    pub discovery: DiscoveryConfig,

    #[serde(default)]
    pub fields: FieldsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Answer bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Channel name both contexts listen on.
    #[serde(default = "default_channel")]
    pub channel: String,

    /// Per-request timeout. `0` waits forever.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl BridgeConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            channel: default_channel(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

fn default_channel() -> String {
    "jobfill".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

/// Field discovery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Attribute written onto claimed elements.
    #[serde(default = "default_marker_attribute")]
    pub marker_attribute: String,

    /// Rediscover on document insertions and release removed fields.
    #[serde(default = "default_true")]
    pub watch_mutations: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            marker_attribute: default_marker_attribute(),
            watch_mutations: true,
        }
    }
}

fn default_marker_attribute() -> String {
    "job-app-filler".to_string()
}

fn default_true() -> bool {
    true
}

/// Per-kind settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldsConfig {
    #[serde(default)]
    pub text_input: TextInputConfig,

    #[serde(default)]
    pub password_input: KindConfig,

    #[serde(default)]
    pub checkbox: KindConfig,
}

/// Settings shared by every field kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KindConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Replaces the kind's built-in locator.
    #[serde(default)]
    pub locator: Option<Locator>,
}

impl Default for KindConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            locator: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextInputConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub locator: Option<Locator>,

    /// Ancestor attribute naming the repeating group a field belongs to.
    #[serde(default)]
    pub section_attribute: Option<String>,
}

impl Default for TextInputConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            locator: None,
            section_attribute: None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for rolling log files.
    #[serde(default)]
    pub dir: Option<String>,
}

impl LoggingConfig {
    /// Resolved log directory, `~/.jobfill/logs` unless configured.
    pub fn log_dir(&self) -> PathBuf {
        match &self.dir {
            Some(dir) => PathBuf::from(ConfigLoader::expand_path(dir)),
            None => dirs::home_dir()
                .map(|home| home.join(".jobfill").join("logs"))
                .unwrap_or_else(|| PathBuf::from("logs")),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
