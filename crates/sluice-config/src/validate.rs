//! Validation rules applied after parsing and environment overrides.

use crate::defaults::UNLIMITED_SPEED;
use crate::error::{ConfigError, ConfigResult};
use crate::model::{DelugeConfig, HostSettings, LoggingSettings, SluiceConfig};

/// Validate a fully merged configuration document.
///
/// # Errors
///
/// Returns the first `ConfigError::InvalidField` encountered.
pub fn validate(config: &SluiceConfig) -> ConfigResult<()> {
    validate_deluge(&config.deluge)?;
    validate_host(&config.host)?;
    validate_logging(&config.logging)
}

fn validate_deluge(deluge: &DelugeConfig) -> ConfigResult<()> {
    require_non_empty("deluge", "host", &deluge.host)?;
    require_non_empty("deluge", "username", &deluge.username)?;
    require_non_empty("deluge", "name", &deluge.name)?;
    if deluge.password.is_none() {
        return Err(ConfigError::invalid("deluge", "password", None, "required"));
    }
    if deluge.port == 0 {
        return Err(ConfigError::invalid(
            "deluge",
            "port",
            Some(deluge.port.to_string()),
            "out_of_range",
        ));
    }
    validate_speed("download_alt_speed", deluge.download_alt_speed)?;
    validate_speed("upload_alt_speed", deluge.upload_alt_speed)
}

fn validate_host(host: &HostSettings) -> ConfigResult<()> {
    for (field, value) in [
        ("scan_interval_secs", host.scan_interval_secs),
        ("setup_retry_secs", host.setup_retry_secs),
        ("rpc_timeout_secs", host.rpc_timeout_secs),
    ] {
        if value == 0 {
            return Err(ConfigError::invalid(
                "host",
                field,
                Some(value.to_string()),
                "must_be_positive",
            ));
        }
    }
    Ok(())
}

fn validate_logging(logging: &LoggingSettings) -> ConfigResult<()> {
    require_non_empty("logging", "level", &logging.level)
}

fn require_non_empty(section: &'static str, field: &'static str, value: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::invalid(section, field, None, "required"));
    }
    Ok(())
}

#[allow(clippy::float_cmp)]
fn validate_speed(field: &'static str, value: f64) -> ConfigResult<()> {
    if !value.is_finite() {
        return Err(ConfigError::invalid(
            "deluge",
            field,
            Some(value.to_string()),
            "not_finite",
        ));
    }
    if value != UNLIMITED_SPEED && value < 0.0 {
        return Err(ConfigError::invalid(
            "deluge",
            field,
            Some(value.to_string()),
            "negative_speed",
        ));
    }
    Ok(())
}
