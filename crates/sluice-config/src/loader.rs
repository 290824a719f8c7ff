//! Loading configuration documents from disk and the environment.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{LogFormatSetting, SluiceConfig};
use crate::validate::validate;

/// Environment variable overriding `deluge.host`.
pub const ENV_DELUGE_HOST: &str = "SLUICE_DELUGE_HOST";
/// Environment variable overriding `deluge.port`.
pub const ENV_DELUGE_PORT: &str = "SLUICE_DELUGE_PORT";
/// Environment variable overriding `deluge.username`.
pub const ENV_DELUGE_USERNAME: &str = "SLUICE_DELUGE_USERNAME";
/// Environment variable overriding `deluge.password`.
pub const ENV_DELUGE_PASSWORD: &str = "SLUICE_DELUGE_PASSWORD";
/// Environment variable overriding `logging.level`.
pub const ENV_LOG_LEVEL: &str = "SLUICE_LOG_LEVEL";
/// Environment variable overriding `logging.format`.
pub const ENV_LOG_FORMAT: &str = "SLUICE_LOG_FORMAT";

/// Read, parse, override from the process environment, and validate a file.
///
/// # Errors
///
/// Returns `ConfigError::Io` when the file cannot be read, `ConfigError::Parse`
/// for malformed YAML, and `ConfigError::InvalidField` when validation fails.
pub fn load_from_path(path: &Path) -> ConfigResult<SluiceConfig> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        operation: "read_config",
        path: path.to_path_buf(),
        source,
    })?;
    let mut config = serde_yaml::from_str::<SluiceConfig>(&raw).map_err(|source| {
        ConfigError::Parse {
            path: Some(path.to_path_buf()),
            source,
        }
    })?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate(&config)?;
    debug!(path = %path.display(), address = %config.deluge.address(), "configuration loaded");
    Ok(config)
}

/// Parse and validate an in-memory document without consulting the environment.
///
/// # Errors
///
/// Returns `ConfigError::Parse` or `ConfigError::InvalidField`.
pub fn parse_document(raw: &str) -> ConfigResult<SluiceConfig> {
    let config = serde_yaml::from_str::<SluiceConfig>(raw)
        .map_err(|source| ConfigError::Parse { path: None, source })?;
    validate(&config)?;
    Ok(config)
}

/// Apply `SLUICE_*` overrides resolved through `lookup`.
///
/// # Errors
///
/// Returns `ConfigError::InvalidField` when an override cannot be parsed.
pub fn apply_env_overrides<F>(config: &mut SluiceConfig, lookup: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup(ENV_DELUGE_HOST) {
        config.deluge.host = host;
    }
    if let Some(raw) = lookup(ENV_DELUGE_PORT) {
        config.deluge.port = raw.trim().parse::<u16>().map_err(|_| {
            ConfigError::invalid("deluge", "port", Some(raw.clone()), "not_a_port")
        })?;
    }
    if let Some(username) = lookup(ENV_DELUGE_USERNAME) {
        config.deluge.username = username;
    }
    if let Some(password) = lookup(ENV_DELUGE_PASSWORD) {
        config.deluge.password = Some(password);
    }
    if let Some(level) = lookup(ENV_LOG_LEVEL) {
        config.logging.level = level;
    }
    if let Some(raw) = lookup(ENV_LOG_FORMAT) {
        let format = LogFormatSetting::parse(&raw).ok_or_else(|| {
            ConfigError::invalid("logging", "format", Some(raw.clone()), "unknown_format")
        })?;
        config.logging.format = Some(format);
    }
    Ok(())
}
