//! Wiring for the `sluice` binary: config path, logging, and the daemon connector.

use std::path::PathBuf;
use std::sync::Arc;

use sluice_config::defaults::DEFAULT_CONFIG_PATH;
use sluice_config::{LogFormatSetting, LoggingSettings, SluiceConfig, load_from_path};
use sluice_events::EventBus;
use sluice_rpc::{ConnectionSettings, Connector, DelugeConnector};
use sluice_telemetry::{GlobalContextGuard, LogFormat, LoggingConfig};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::host::Host;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "SLUICE_CONFIG";

/// Configuration path from `SLUICE_CONFIG`, falling back to `sluice.yaml`.
#[must_use]
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV).map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Map file-level logging settings onto the subscriber configuration.
#[must_use]
pub fn logging_config(settings: &LoggingSettings) -> LoggingConfig<'_> {
    let format = match settings.format {
        Some(LogFormatSetting::Json) => LogFormat::Json,
        Some(LogFormatSetting::Pretty) => LogFormat::Pretty,
        None => LogFormat::infer(),
    };
    LoggingConfig {
        level: &settings.level,
        format,
        ..LoggingConfig::default()
    }
}

/// Build the production connector for the configured daemon.
#[must_use]
pub fn connector_for(config: &SluiceConfig) -> Arc<dyn Connector> {
    let deluge = &config.deluge;
    Arc::new(DelugeConnector::new(ConnectionSettings {
        host: deluge.host.clone(),
        port: deluge.port,
        username: deluge.username.clone(),
        password: deluge.password.clone().unwrap_or_default(),
        timeout: config.host.rpc_timeout(),
    }))
}

/// Entry point for the host binary.
///
/// # Errors
///
/// Returns an error if configuration or logging cannot be initialised, if
/// setup fails permanently, or if the shutdown signal cannot be awaited.
pub async fn run_app() -> AppResult<()> {
    let path = config_path();
    let config = load_from_path(&path).map_err(|err| AppError::config("config.load", err))?;
    sluice_telemetry::init_logging(&logging_config(&config.logging))
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new("host");

    info!(config = %path.display(), address = %config.deluge.address(), "Sluice host starting");
    run_host(&config, connector_for(&config), EventBus::new()).await
}

/// Run the host with injected dependencies until Ctrl-C or a setup failure.
pub(crate) async fn run_host(
    config: &SluiceConfig,
    connector: Arc<dyn Connector>,
    events: EventBus,
) -> AppResult<()> {
    let host = Host::start(config, connector, events);
    let handle = host.handle();
    let mut joined = std::pin::pin!(host.join());

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(|source| AppError::Signal { source })?;
            info!("shutdown requested");
            handle.shutdown().await;
            joined.await.map_err(|err| AppError::host("host.join", err))
        }
        outcome = &mut joined => outcome.map_err(|err| AppError::host("host.run", err)),
    }
}
