//! Typed configuration models.

use std::fmt;
use std::time::Duration;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_LOG_LEVEL, DEFAULT_NAME, DEFAULT_PORT, DEFAULT_RPC_TIMEOUT_SECS,
    DEFAULT_SCAN_INTERVAL_SECS, DEFAULT_SETUP_RETRY_SECS, UNLIMITED_SPEED,
};

/// Root configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SluiceConfig {
    /// Daemon connection and switch settings.
    pub deluge: DelugeConfig,
    /// Host runtime cadence.
    #[serde(default)]
    pub host: HostSettings,
    /// Logging preferences.
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Deluge daemon connection and switch settings.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DelugeConfig {
    /// Daemon host name or IP literal.
    #[serde(default)]
    pub host: String,
    /// Daemon RPC port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Daemon account name.
    #[serde(default)]
    pub username: String,
    /// Daemon account password. The key must be present, but may be empty.
    #[serde(default)]
    pub password: Option<String>,
    /// Display name prefix for the registered switches.
    #[serde(default = "default_name")]
    pub name: String,
    /// Download cap that defines the alt-speed profile.
    #[serde(
        default = "unlimited_speed",
        deserialize_with = "deserialize_speed"
    )]
    pub download_alt_speed: f64,
    /// Upload cap that defines the alt-speed profile.
    #[serde(
        default = "unlimited_speed",
        deserialize_with = "deserialize_speed"
    )]
    pub upload_alt_speed: f64,
}

impl DelugeConfig {
    /// Render the `host:port` pair used in logs and errors.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for DelugeConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("DelugeConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .field("download_alt_speed", &self.download_alt_speed)
            .field("upload_alt_speed", &self.upload_alt_speed)
            .finish()
    }
}

/// Poll, retry, and timeout cadence for the host runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostSettings {
    /// Seconds between entity refreshes.
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,
    /// Seconds to wait before retrying a not-ready setup.
    #[serde(default = "default_setup_retry")]
    pub setup_retry_secs: u64,
    /// Upper bound in seconds for each remote call.
    #[serde(default = "default_rpc_timeout")]
    pub rpc_timeout_secs: u64,
}

impl HostSettings {
    /// Poll interval as a [`Duration`].
    #[must_use]
    pub const fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    /// Setup retry delay as a [`Duration`].
    #[must_use]
    pub const fn setup_retry_interval(&self) -> Duration {
        Duration::from_secs(self.setup_retry_secs)
    }

    /// Remote call timeout as a [`Duration`].
    #[must_use]
    pub const fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            scan_interval_secs: DEFAULT_SCAN_INTERVAL_SECS,
            setup_retry_secs: DEFAULT_SETUP_RETRY_SECS,
            rpc_timeout_secs: DEFAULT_RPC_TIMEOUT_SECS,
        }
    }
}

/// Output format requested for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormatSetting {
    /// Human-readable output.
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormatSetting {
    /// Parse a case-insensitive format name.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Logging preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Explicit output format; the build profile decides when absent.
    #[serde(default)]
    pub format: Option<LogFormatSetting>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
        }
    }
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_name() -> String {
    DEFAULT_NAME.to_string()
}

const fn unlimited_speed() -> f64 {
    UNLIMITED_SPEED
}

const fn default_scan_interval() -> u64 {
    DEFAULT_SCAN_INTERVAL_SECS
}

const fn default_setup_retry() -> u64 {
    DEFAULT_SETUP_RETRY_SECS
}

const fn default_rpc_timeout() -> u64 {
    DEFAULT_RPC_TIMEOUT_SECS
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

/// Accept speeds written as YAML numbers or numeric strings.
fn deserialize_speed<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    struct SpeedVisitor;

    impl Visitor<'_> for SpeedVisitor {
        type Value = f64;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a number or numeric string")
        }

        #[allow(clippy::cast_precision_loss)]
        fn visit_i64<E: de::Error>(self, value: i64) -> Result<f64, E> {
            Ok(value as f64)
        }

        #[allow(clippy::cast_precision_loss)]
        fn visit_u64<E: de::Error>(self, value: u64) -> Result<f64, E> {
            Ok(value as f64)
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<f64, E> {
            Ok(value)
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<f64, E> {
            value
                .trim()
                .parse::<f64>()
                .map_err(|_| E::invalid_value(de::Unexpected::Str(value), &self))
        }
    }

    deserializer.deserialize_any(SpeedVisitor)
}
