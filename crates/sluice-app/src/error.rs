//! # Design
//!
//! - Centralize host and bootstrap errors.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use std::io;

use thiserror::Error;

/// Result alias for host operations.
pub type HostResult<T> = Result<T, HostError>;

/// Errors surfaced through [`crate::HostHandle`] and the worker task.
#[derive(Debug, Error)]
pub enum HostError {
    /// No registered entity carries the requested name.
    #[error("unknown entity")]
    UnknownEntity {
        /// Requested entity name.
        name: String,
    },
    /// Platform setup has not completed yet.
    #[error("host is not ready")]
    NotReady,
    /// The worker task has stopped.
    #[error("host worker stopped")]
    Stopped,
    /// A switch command failed.
    #[error("switch command failed")]
    Switch {
        /// Entity display name.
        entity: String,
        /// Source switch error.
        #[source]
        source: sluice_switch::SwitchError,
    },
    /// Platform setup failed permanently.
    #[error("platform setup failed")]
    Setup {
        /// Source platform error.
        #[source]
        source: sluice_switch::PlatformError,
    },
}

/// Result alias for application bootstrap.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration loading failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        #[source]
        source: sluice_config::ConfigError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        #[source]
        source: sluice_telemetry::TelemetryError,
    },
    /// Host runtime failed.
    #[error("host operation failed")]
    Host {
        /// Operation identifier.
        operation: &'static str,
        /// Source host error.
        #[source]
        source: HostError,
    },
    /// Waiting for the shutdown signal failed.
    #[error("signal handling failed")]
    Signal {
        /// Source IO error.
        #[source]
        source: io::Error,
    },
}

impl AppError {
    pub(crate) const fn config(operation: &'static str, source: sluice_config::ConfigError) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: sluice_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn host(operation: &'static str, source: HostError) -> Self {
        Self::Host { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn host_errors_keep_constant_messages() {
        let unknown = HostError::UnknownEntity {
            name: "Nope".into(),
        };
        assert_eq!(unknown.to_string(), "unknown entity");
        assert_eq!(HostError::Stopped.to_string(), "host worker stopped");
    }

    #[test]
    fn app_error_wraps_sources() {
        let err = AppError::host("host.join", HostError::NotReady);
        assert_eq!(err.to_string(), "host operation failed");
        assert!(err.source().is_some());

        let signal = AppError::Signal {
            source: io::Error::other("no signal"),
        };
        assert!(signal.source().is_some());
    }
}
