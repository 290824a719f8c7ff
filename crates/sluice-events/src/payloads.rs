//! Event payloads published by the host.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sluice_switch::SwitchState;

/// Identifier assigned to each published event.
pub type EventId = u64;

/// Typed events surfaced by the host runtime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// An entity was registered after platform setup.
    EntityRegistered {
        /// Entity display name.
        entity: String,
    },
    /// State or availability differs from the previous observation.
    StateChanged {
        /// Entity display name.
        entity: String,
        /// Newly observed state.
        state: SwitchState,
        /// Newly observed availability.
        available: bool,
    },
    /// An update failed with an error that was not absorbed by the entity.
    UpdateFailed {
        /// Entity display name.
        entity: String,
        /// Rendered error.
        message: String,
    },
    /// Setup found the daemon not ready and will retry.
    SetupRetry {
        /// One-based attempt that failed.
        attempt: u32,
        /// Seconds until the next attempt.
        retry_in_secs: u64,
    },
    /// Setup failed permanently.
    SetupFailed {
        /// Rendered error.
        message: String,
    },
    /// A turn-on or turn-off command was sent to the daemon.
    CommandIssued {
        /// Entity display name.
        entity: String,
        /// Requested state.
        target: SwitchState,
    },
}

impl Event {
    /// Machine-friendly discriminator for log and CLI consumers.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::EntityRegistered { .. } => "entity_registered",
            Self::StateChanged { .. } => "state_changed",
            Self::UpdateFailed { .. } => "update_failed",
            Self::SetupRetry { .. } => "setup_retry",
            Self::SetupFailed { .. } => "setup_failed",
            Self::CommandIssued { .. } => "command_issued",
        }
    }

    /// Entity the event concerns, when it is entity-scoped.
    #[must_use]
    pub fn entity(&self) -> Option<&str> {
        match self {
            Self::EntityRegistered { entity }
            | Self::StateChanged { entity, .. }
            | Self::UpdateFailed { entity, .. }
            | Self::CommandIssued { entity, .. } => Some(entity),
            Self::SetupRetry { .. } | Self::SetupFailed { .. } => None,
        }
    }
}

/// Event plus the identifier and timestamp assigned at publish time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Sequential identifier.
    pub id: EventId,
    /// Publish time.
    pub timestamp: DateTime<Utc>,
    /// Payload.
    pub event: Event,
}
