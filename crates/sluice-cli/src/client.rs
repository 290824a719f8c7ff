//! Shared context, platform connection, and error types for the CLI.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use sluice_app::HostError;
use sluice_config::{ConfigError, SluiceConfig};
use sluice_rpc::Connector;
use sluice_switch::{PlatformError, ToggleEntity, setup_platform};

use crate::cli::OutputFormat;

/// CLI-level error type; the variant decides the exit code.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    NotReady(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
            Self::NotReady(_) => 4,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) | Self::NotReady(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        let detail = match &err {
            ConfigError::InvalidField {
                section,
                field,
                value,
                reason,
            } => match value {
                Some(value) => format!("{section}.{field}: {reason} (got '{value}')"),
                None => format!("{section}.{field}: {reason}"),
            },
            ConfigError::Parse { source, .. } => source.to_string(),
            ConfigError::Io { path, source, .. } => format!("{}: {source}", path.display()),
        };
        Self::Validation(format!("invalid configuration: {detail}"))
    }
}

impl From<PlatformError> for CliError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::NotReady { address, .. } => {
                Self::NotReady(format!("deluge daemon at {address} is not accepting connections"))
            }
            other @ PlatformError::Setup { .. } => Self::failure(other),
        }
    }
}

impl From<HostError> for CliError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::UnknownEntity { name } => Self::validation(format!("unknown entity '{name}'")),
            other => Self::failure(other),
        }
    }
}

/// Loaded configuration plus the connector and output selection.
pub(crate) struct CliContext {
    pub(crate) config: SluiceConfig,
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) output: OutputFormat,
}

/// Connect once and build the entities.
pub(crate) async fn connect(ctx: &CliContext) -> CliResult<Vec<Box<dyn ToggleEntity>>> {
    Ok(setup_platform(&ctx.config.deluge, ctx.connector.as_ref()).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_rpc::RpcError;

    #[test]
    fn exit_codes_follow_error_kind() {
        assert_eq!(CliError::validation("bad").exit_code(), 2);
        assert_eq!(CliError::failure(anyhow::anyhow!("boom")).exit_code(), 3);
        assert_eq!(CliError::NotReady("later".into()).exit_code(), 4);
    }

    #[test]
    fn platform_errors_map_to_not_ready_or_failure() {
        let not_ready = CliError::from(PlatformError::NotReady {
            address: "nas:58846".into(),
            source: RpcError::ConnectionRefused {
                address: "nas:58846".into(),
            },
        });
        assert_eq!(not_ready.exit_code(), 4);
        assert!(not_ready.display_message().contains("nas:58846"));

        let setup = CliError::from(PlatformError::Setup {
            address: "nas:58846".into(),
            source: RpcError::InvalidServerName { host: "x y".into() },
        });
        assert_eq!(setup.exit_code(), 3);
        assert_eq!(setup.display_message(), "deluge platform setup failed: invalid tls server name");
    }

    #[test]
    fn config_errors_are_validation_failures() {
        let err = CliError::from(ConfigError::InvalidField {
            section: "deluge",
            field: "port",
            value: Some("0".into()),
            reason: "out_of_range",
        });
        assert_eq!(err.exit_code(), 2);
        assert_eq!(
            err.display_message(),
            "invalid configuration: deluge.port: out_of_range (got '0')"
        );
    }

    #[test]
    fn unknown_entity_is_a_validation_failure() {
        let err = CliError::from(HostError::UnknownEntity {
            name: "Nope".into(),
        });
        assert_eq!(err.exit_code(), 2);
        assert_eq!(CliError::from(HostError::Stopped).exit_code(), 3);
    }
}
