//! Switch that toggles the daemon's alternate bandwidth caps.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use sluice_config::DelugeConfig;
use sluice_config::defaults::UNLIMITED_SPEED;
use sluice_rpc::{RemoteClient, RpcError, RpcResult};

use crate::entity::{EntityStatus, SwitchState, ToggleEntity};
use crate::error::{SwitchError, SwitchResult};
use crate::methods::{GET_CONFIG_VALUE, MAX_DOWNLOAD_SPEED, MAX_UPLOAD_SPEED, SET_CONFIG};

/// Configured alternate-speed caps; `-1` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AltSpeedThresholds {
    upload: f64,
    download: f64,
}

impl AltSpeedThresholds {
    /// Value the daemon uses for "no cap".
    pub const UNLIMITED: f64 = UNLIMITED_SPEED;

    /// Build thresholds from explicit caps.
    #[must_use]
    pub const fn new(upload: f64, download: f64) -> Self {
        Self { upload, download }
    }

    /// Thresholds taken from the daemon configuration.
    #[must_use]
    pub const fn from_config(config: &DelugeConfig) -> Self {
        Self::new(config.upload_alt_speed, config.download_alt_speed)
    }

    /// Upload cap.
    #[must_use]
    pub const fn upload(&self) -> f64 {
        self.upload
    }

    /// Download cap.
    #[must_use]
    pub const fn download(&self) -> f64 {
        self.download
    }
}

/// On while the daemon's caps exactly equal the configured thresholds.
pub struct AltSpeedSwitch {
    client: Arc<dyn RemoteClient>,
    thresholds: AltSpeedThresholds,
    status: EntityStatus,
}

impl AltSpeedSwitch {
    /// Build a switch named `name` over the shared daemon client.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        client: Arc<dyn RemoteClient>,
        thresholds: AltSpeedThresholds,
    ) -> Self {
        Self {
            client,
            thresholds,
            status: EntityStatus::new(name.into()),
        }
    }

    /// Configured thresholds.
    #[must_use]
    pub const fn thresholds(&self) -> AltSpeedThresholds {
        self.thresholds
    }

    async fn apply_caps(&self, upload: f64, download: f64, operation: &'static str) -> SwitchResult<()> {
        for (key, value) in [(MAX_UPLOAD_SPEED, upload), (MAX_DOWNLOAD_SPEED, download)] {
            let mut change = Map::new();
            change.insert(key.to_string(), json!(value));
            self.client
                .call(SET_CONFIG, vec![Value::Object(change)])
                .await
                .map_err(|err| SwitchError::rpc(operation, &self.status.name, err))?;
        }
        Ok(())
    }

    async fn config_value(&self, key: &str) -> RpcResult<f64> {
        self.client
            .call(GET_CONFIG_VALUE, vec![json!(key)])
            .await?
            .as_f64()
            .ok_or_else(|| RpcError::UnexpectedResponse {
                method: GET_CONFIG_VALUE.to_string(),
                reason: "config_value_not_a_number",
            })
    }

    #[allow(clippy::float_cmp)]
    async fn fetch_state(&self) -> RpcResult<SwitchState> {
        let upload = self.config_value(MAX_UPLOAD_SPEED).await?;
        if upload != self.thresholds.upload {
            return Ok(SwitchState::Off);
        }
        let download = self.config_value(MAX_DOWNLOAD_SPEED).await?;
        Ok(SwitchState::from_bool(download == self.thresholds.download))
    }
}

#[async_trait]
impl ToggleEntity for AltSpeedSwitch {
    fn name(&self) -> &str {
        &self.status.name
    }

    fn state(&self) -> SwitchState {
        self.status.state
    }

    fn available(&self) -> bool {
        self.status.available
    }

    async fn turn_on(&self) -> SwitchResult<()> {
        self.apply_caps(self.thresholds.upload, self.thresholds.download, "turn_on")
            .await
    }

    async fn turn_off(&self) -> SwitchResult<()> {
        self.apply_caps(
            AltSpeedThresholds::UNLIMITED,
            AltSpeedThresholds::UNLIMITED,
            "turn_off",
        )
        .await
    }

    async fn update(&mut self) -> SwitchResult<()> {
        let outcome = self.fetch_state().await;
        self.status.apply(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_test_support::ScriptedClient;
    use sluice_test_support::fixtures::deluge_config;

    fn switch(client: &Arc<ScriptedClient>, upload: f64, download: f64) -> AltSpeedSwitch {
        let shared: Arc<dyn RemoteClient> = client.clone();
        AltSpeedSwitch::new(
            "Deluge Alt Speed",
            shared,
            AltSpeedThresholds::new(upload, download),
        )
    }

    #[test]
    fn thresholds_follow_config_fields() {
        let thresholds = AltSpeedThresholds::from_config(&deluge_config(100.0, 50.0));
        assert_eq!(thresholds, AltSpeedThresholds::new(50.0, 100.0));
        assert!((thresholds.download() - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn upload_mismatch_skips_download_read() -> anyhow::Result<()> {
        let client = Arc::new(ScriptedClient::new());
        client.reply(GET_CONFIG_VALUE, json!(49.0));
        let mut entity = switch(&client, 50.0, 100.0);
        entity.update().await?;
        assert_eq!(entity.state(), SwitchState::Off);
        assert!(entity.available());
        assert_eq!(
            client.calls_to(GET_CONFIG_VALUE),
            vec![vec![json!("max_upload_speed")]]
        );
        Ok(())
    }

    #[tokio::test]
    async fn integer_replies_compare_against_float_thresholds() -> anyhow::Result<()> {
        let client = Arc::new(ScriptedClient::new());
        client
            .reply(GET_CONFIG_VALUE, json!(-1))
            .reply(GET_CONFIG_VALUE, json!(-1));
        let mut entity = switch(&client, -1.0, -1.0);
        entity.update().await?;
        assert!(entity.is_on());
        Ok(())
    }

    #[tokio::test]
    async fn near_miss_is_not_a_match() -> anyhow::Result<()> {
        let client = Arc::new(ScriptedClient::new());
        client
            .reply(GET_CONFIG_VALUE, json!(50.0))
            .reply(GET_CONFIG_VALUE, json!(100.000_001));
        let mut entity = switch(&client, 50.0, 100.0);
        entity.update().await?;
        assert_eq!(entity.state(), SwitchState::Off);
        Ok(())
    }

    #[tokio::test]
    async fn non_numeric_config_value_propagates() {
        let client = Arc::new(ScriptedClient::new());
        client.reply(GET_CONFIG_VALUE, json!("fast"));
        let mut entity = switch(&client, 50.0, 100.0);
        let err = entity.update().await.expect_err("shape error propagates");
        assert!(matches!(
            err.rpc_error(),
            RpcError::UnexpectedResponse {
                reason: "config_value_not_a_number",
                ..
            }
        ));
        assert!(!entity.available());
    }
}
