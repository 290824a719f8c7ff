//! Event bus error primitives.

use thiserror::Error;

use crate::payloads::EventId;

/// Result wrapper for event bus operations.
pub type EventBusResult<T> = Result<T, EventBusError>;

/// Errors raised while publishing onto the bus.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventBusError {
    /// The event was recorded for replay but no live subscriber received it.
    #[error("event published without live subscribers")]
    NoSubscribers {
        /// Identifier assigned to the event.
        event_id: EventId,
        /// Event kind string for filtering in logs.
        event_kind: &'static str,
        /// Entity the event concerns, when it names one.
        entity: Option<String>,
    },
}
