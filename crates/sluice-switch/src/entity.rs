//! The capability contract shared by both switches.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sluice_rpc::RpcError;
use tracing::error;

use crate::error::{SwitchError, SwitchResult};

/// Last observed on/off state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchState {
    /// Switch is on.
    On,
    /// Switch is off.
    #[default]
    Off,
}

impl SwitchState {
    /// Lowercase label used in logs and output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }

    /// `On` when `flag` is true.
    #[must_use]
    pub const fn from_bool(flag: bool) -> Self {
        if flag { Self::On } else { Self::Off }
    }
}

impl fmt::Display for SwitchState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Serializable view of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// Display name.
    pub name: String,
    /// Last observed state.
    pub state: SwitchState,
    /// Whether the most recent update reached the daemon.
    pub available: bool,
}

/// Switch surface exposed to the host.
///
/// `turn_on` and `turn_off` only issue remote commands; the effect is observed
/// by the next `update`, which is the sole writer of state and availability.
#[async_trait]
pub trait ToggleEntity: Send + Sync {
    /// Display name, fixed at construction.
    fn name(&self) -> &str;

    /// Last observed state.
    fn state(&self) -> SwitchState;

    /// Whether the most recent update reached the daemon.
    fn available(&self) -> bool;

    /// `true` when the last observed state is [`SwitchState::On`].
    fn is_on(&self) -> bool {
        self.state() == SwitchState::On
    }

    /// Ask the daemon to switch on.
    async fn turn_on(&self) -> SwitchResult<()>;

    /// Ask the daemon to switch off.
    async fn turn_off(&self) -> SwitchResult<()>;

    /// Refresh state and availability from the daemon.
    ///
    /// A lost connection is absorbed: availability drops, state is kept, and
    /// `Ok(())` is returned. Other failures propagate unchanged.
    async fn update(&mut self) -> SwitchResult<()>;

    /// Serializable view of the current state.
    fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            name: self.name().to_string(),
            state: self.state(),
            available: self.available(),
        }
    }
}

/// Name, state, and availability shared by the switch implementations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EntityStatus {
    pub(crate) name: String,
    pub(crate) state: SwitchState,
    pub(crate) available: bool,
}

impl EntityStatus {
    pub(crate) const fn new(name: String) -> Self {
        Self {
            name,
            state: SwitchState::Off,
            available: false,
        }
    }

    /// Fold the outcome of an update pass into the status.
    pub(crate) fn apply(&mut self, outcome: Result<SwitchState, RpcError>) -> SwitchResult<()> {
        match outcome {
            Ok(state) => {
                self.state = state;
                self.available = true;
                Ok(())
            }
            Err(err) if err.is_connection_lost() => {
                error!(entity = %self.name, error = %err, "Connection to Deluge Daemon Lost");
                self.available = false;
                Ok(())
            }
            Err(err) => Err(SwitchError::rpc("update", &self.name, err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lost() -> RpcError {
        RpcError::ConnectionLost {
            method: "core.get_torrents_status".into(),
            source: Box::new(RpcError::ConnectionRefused {
                address: "nas:58846".into(),
            }),
        }
    }

    #[test]
    fn state_labels_and_defaults() {
        assert_eq!(SwitchState::On.as_str(), "on");
        assert_eq!(SwitchState::Off.to_string(), "off");
        assert_eq!(SwitchState::default(), SwitchState::Off);
        assert_eq!(SwitchState::from_bool(true), SwitchState::On);
    }

    #[test]
    fn snapshot_serializes_lowercase_state() -> serde_json::Result<()> {
        let snapshot = EntitySnapshot {
            name: "Deluge Switch".into(),
            state: SwitchState::On,
            available: true,
        };
        assert_eq!(
            serde_json::to_value(&snapshot)?,
            serde_json::json!({"name": "Deluge Switch", "state": "on", "available": true})
        );
        Ok(())
    }

    #[test]
    fn new_status_is_off_and_unavailable() {
        let status = EntityStatus::new("Deluge Switch".into());
        assert_eq!(status.state, SwitchState::Off);
        assert!(!status.available);
    }

    #[test]
    fn lost_connection_keeps_state_and_drops_availability() {
        let mut status = EntityStatus::new("Deluge Switch".into());
        assert!(status.apply(Ok(SwitchState::On)).is_ok());
        assert!(status.available);

        assert!(status.apply(Err(lost())).is_ok());
        assert_eq!(status.state, SwitchState::On);
        assert!(!status.available);
    }

    #[test]
    fn other_failures_propagate_without_touching_status() {
        let mut status = EntityStatus::new("Deluge Alt Speed".into());
        assert!(status.apply(Ok(SwitchState::On)).is_ok());
        let err = status
            .apply(Err(RpcError::UnexpectedResponse {
                method: "core.get_config_value".into(),
                reason: "not_a_number",
            }))
            .expect_err("shape errors propagate");
        assert!(matches!(err, SwitchError::Rpc { operation: "update", .. }));
        assert_eq!(status.state, SwitchState::On);
        assert!(status.available);
    }
}
