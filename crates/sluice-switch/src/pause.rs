//! Switch that pauses or resumes every torrent in the session.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use sluice_rpc::{RemoteClient, RpcError, RpcResult};
use tracing::debug;

use crate::entity::{EntityStatus, SwitchState, ToggleEntity};
use crate::error::{SwitchError, SwitchResult};
use crate::methods::{
    GET_SESSION_STATE, GET_TORRENTS_STATUS, PAUSE_TORRENT, PAUSED_FIELD, RESUME_TORRENT,
};

/// On while at least one torrent is running.
pub struct TorrentPauseSwitch {
    client: Arc<dyn RemoteClient>,
    status: EntityStatus,
}

impl TorrentPauseSwitch {
    /// Build a switch named `name` over the shared daemon client.
    #[must_use]
    pub fn new(name: impl Into<String>, client: Arc<dyn RemoteClient>) -> Self {
        Self {
            client,
            status: EntityStatus::new(name.into()),
        }
    }

    async fn apply_to_all(&self, method: &str, operation: &'static str) -> SwitchResult<()> {
        let name = &self.status.name;
        let ids = self
            .client
            .call(GET_SESSION_STATE, Vec::new())
            .await
            .map_err(|err| SwitchError::rpc(operation, name, err))?;
        debug!(entity = %name, method, torrents = ids.as_array().map_or(0, Vec::len), "forwarding session torrents");
        self.client
            .call(method, vec![ids])
            .await
            .map_err(|err| SwitchError::rpc(operation, name, err))?;
        Ok(())
    }

    async fn fetch_state(&self) -> RpcResult<SwitchState> {
        let status = self
            .client
            .call(
                GET_TORRENTS_STATUS,
                vec![Value::Object(Map::new()), json!([PAUSED_FIELD])],
            )
            .await?;
        any_running(&status).map(SwitchState::from_bool)
    }
}

/// `true` when any torrent record reports `paused == false`.
fn any_running(status: &Value) -> RpcResult<bool> {
    let Value::Object(torrents) = status else {
        return Err(unexpected("status_not_a_mapping"));
    };
    let mut running = false;
    for record in torrents.values() {
        let paused = record
            .get(PAUSED_FIELD)
            .and_then(Value::as_bool)
            .ok_or_else(|| unexpected("missing_paused_field"))?;
        running |= !paused;
    }
    Ok(running)
}

fn unexpected(reason: &'static str) -> RpcError {
    RpcError::UnexpectedResponse {
        method: GET_TORRENTS_STATUS.to_string(),
        reason,
    }
}

#[async_trait]
impl ToggleEntity for TorrentPauseSwitch {
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
        self.apply_to_all(RESUME_TORRENT, "turn_on").await
    }

    async fn turn_off(&self) -> SwitchResult<()> {
        self.apply_to_all(PAUSE_TORRENT, "turn_off").await
    }

    async fn update(&mut self) -> SwitchResult<()> {
        let outcome = self.fetch_state().await;
        self.status.apply(outcome)
    }
}
