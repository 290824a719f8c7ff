//! Configuration and payload builders.

use serde_json::{Map, Value, json};
use sluice_config::{DelugeConfig, HostSettings, LoggingSettings, SluiceConfig};

/// Daemon settings pointing at a scripted host with the given alt-speed thresholds.
#[must_use]
pub fn deluge_config(download_alt_speed: f64, upload_alt_speed: f64) -> DelugeConfig {
    DelugeConfig {
        host: "deluge.test".to_string(),
        port: 58846,
        username: "localclient".to_string(),
        password: Some("secret".to_string()),
        name: "Deluge".to_string(),
        download_alt_speed,
        upload_alt_speed,
    }
}

/// Full document with default host cadence and logging.
#[must_use]
pub fn sluice_config(download_alt_speed: f64, upload_alt_speed: f64) -> SluiceConfig {
    SluiceConfig {
        deluge: deluge_config(download_alt_speed, upload_alt_speed),
        host: HostSettings::default(),
        logging: LoggingSettings::default(),
    }
}

/// Build a `core.get_torrents_status` reply from `(id, paused)` pairs.
#[must_use]
pub fn torrents_status(torrents: &[(&str, bool)]) -> Value {
    let mut status = Map::new();
    for (id, paused) in torrents {
        status.insert((*id).to_string(), json!({ "paused": paused }));
    }
    Value::Object(status)
}

/// Build a `core.get_session_state` reply from torrent ids.
#[must_use]
pub fn session_state(ids: &[&str]) -> Value {
    json!(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn torrents_status_maps_ids_to_paused_flags() {
        let status = torrents_status(&[("a", true), ("b", false)]);
        assert_eq!(status, json!({"a": {"paused": true}, "b": {"paused": false}}));
    }

    #[test]
    fn config_fixture_is_addressable() {
        let config = sluice_config(100.0, 50.0);
        assert_eq!(config.deluge.address(), "deluge.test:58846");
        assert_eq!(config.host, HostSettings::default());
    }
}
