//! Default values applied when optional configuration keys are omitted.
//!
//! # Design
//! - Keep defaults in one place so the serde model and docs agree.
//! - `UNLIMITED_SPEED` doubles as the "alt speed disabled" sentinel.

/// Default daemon RPC port.
pub const DEFAULT_PORT: u16 = 58846;
/// Default display name prefix for the registered switches.
pub const DEFAULT_NAME: &str = "Deluge";
/// Daemon sentinel meaning "no bandwidth cap".
pub const UNLIMITED_SPEED: f64 = -1.0;
/// Default poll interval in seconds.
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 30;
/// Default delay before retrying a not-ready setup, in seconds.
pub const DEFAULT_SETUP_RETRY_SECS: u64 = 30;
/// Default per-call RPC timeout in seconds.
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 10;
/// Default log level directive.
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// Default configuration file path when none is supplied.
pub const DEFAULT_CONFIG_PATH: &str = "sluice.yaml";
