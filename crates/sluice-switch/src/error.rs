//! Error types for switch and platform operations.
//!
//! # Design
//! - Constant messages; the entity and operation travel as fields.
//! - Lost connections during `update` never reach these types; the entities
//!   absorb them into their availability flag.

use sluice_rpc::RpcError;
use thiserror::Error;

/// Errors raised by switch commands and non-recoverable update failures.
#[derive(Debug, Error)]
pub enum SwitchError {
    /// A remote call made on behalf of an entity failed.
    #[error("switch remote call failed")]
    Rpc {
        /// Operation being performed (`turn_on`, `turn_off`, `update`).
        operation: &'static str,
        /// Entity display name.
        entity: String,
        /// Underlying client error.
        #[source]
        source: RpcError,
    },
}

impl SwitchError {
    pub(crate) fn rpc(operation: &'static str, entity: &str, source: RpcError) -> Self {
        Self::Rpc {
            operation,
            entity: entity.to_string(),
            source,
        }
    }

    /// Underlying client error.
    #[must_use]
    pub const fn rpc_error(&self) -> &RpcError {
        match self {
            Self::Rpc { source, .. } => source,
        }
    }
}

/// Convenience alias for switch results.
pub type SwitchResult<T> = Result<T, SwitchError>;

/// Errors raised while setting up the platform.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The daemon refused the connection; setup may be retried later.
    #[error("deluge daemon not ready")]
    NotReady {
        /// Daemon address that refused the connection.
        address: String,
        /// Underlying client error.
        #[source]
        source: RpcError,
    },
    /// Setup failed for a reason retrying will not fix.
    #[error("deluge platform setup failed")]
    Setup {
        /// Daemon address.
        address: String,
        /// Underlying client error.
        #[source]
        source: RpcError,
    },
}

impl PlatformError {
    /// Whether the host should retry setup later.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::NotReady { .. })
    }
}
