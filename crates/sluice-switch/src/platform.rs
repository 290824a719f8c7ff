//! Platform setup: one connection, two entities.

use sluice_config::DelugeConfig;
use sluice_rpc::Connector;
use tracing::{error, info};

use crate::alt_speed::{AltSpeedSwitch, AltSpeedThresholds};
use crate::entity::ToggleEntity;
use crate::error::PlatformError;
use crate::pause::TorrentPauseSwitch;

/// Connect to the daemon and build the entities to register with the host.
///
/// Returns the alt-speed switch followed by the pause switch, both sharing the
/// same client.
///
/// # Errors
///
/// Returns [`PlatformError::NotReady`] when the daemon refuses the connection
/// and [`PlatformError::Setup`] for any other connection failure.
pub async fn setup_platform(
    config: &DelugeConfig,
    connector: &dyn Connector,
) -> Result<Vec<Box<dyn ToggleEntity>>, PlatformError> {
    let address = connector.address();
    let client = match connector.connect().await {
        Ok(client) => client,
        Err(source) if source.is_connection_refused() => {
            error!(address = %address, error = %source, "Connection to Deluge Daemon failed");
            return Err(PlatformError::NotReady { address, source });
        }
        Err(source) => {
            error!(address = %address, error = %source, "deluge platform setup failed");
            return Err(PlatformError::Setup { address, source });
        }
    };

    info!(address = %address, name = %config.name, "deluge platform ready");
    Ok(vec![
        Box::new(AltSpeedSwitch::new(
            format!("{} Alt Speed", config.name),
            client.clone(),
            AltSpeedThresholds::from_config(config),
        )),
        Box::new(TorrentPauseSwitch::new(format!("{} Switch", config.name), client)),
    ])
}
