#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]

//! Event bus for the Sluice host.
//!
//! The bus assigns sequential identifiers and keeps a bounded replay ring so a
//! late subscriber (for example `sluice watch`) can catch up on what happened
//! during setup. Internally it uses `tokio::broadcast`; when the channel
//! overflows, the oldest events are dropped.

pub mod error;
pub mod payloads;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::broadcast::{self, Receiver, Sender};

pub use error::{EventBusError, EventBusResult};
pub use payloads::{Event, EventEnvelope, EventId};

/// Default buffer size for the in-memory replay ring.
const DEFAULT_REPLAY_CAPACITY: usize = 256;

/// Shared publish/subscribe hub.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<EventEnvelope>,
    buffer: Arc<Mutex<VecDeque<EventEnvelope>>>,
    next_id: Arc<AtomicU64>,
    replay_capacity: usize,
}

impl EventBus {
    /// Construct a bus with the provided broadcast and replay capacity.
    ///
    /// A zero capacity is raised to one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            buffer: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            next_id: Arc::new(AtomicU64::new(1)),
            replay_capacity: capacity,
        }
    }

    /// Construct a bus with the default replay size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    fn buffer(&self) -> MutexGuard<'_, VecDeque<EventEnvelope>> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish an event, assigning it the next sequential identifier.
    ///
    /// Events are retained for replay even when nobody is subscribed.
    pub fn publish(&self, event: Event) -> EventId {
        match self.try_publish(event) {
            Ok(id) | Err(EventBusError::NoSubscribers { event_id: id, .. }) => id,
        }
    }

    /// Publish an event and report whether any live subscriber received it.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::NoSubscribers`] when the broadcast channel has no
    /// receivers. The event is still recorded in the replay ring.
    pub fn try_publish(&self, event: Event) -> EventBusResult<EventId> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let event_kind = event.kind();
        let entity = event.entity().map(str::to_string);
        let envelope = EventEnvelope {
            id,
            timestamp: Utc::now(),
            event,
        };

        {
            let mut buffer = self.buffer();
            if buffer.len() == self.replay_capacity {
                buffer.pop_front();
            }
            buffer.push_back(envelope.clone());
        }

        self.sender
            .send(envelope)
            .map(|_| id)
            .map_err(|_| EventBusError::NoSubscribers {
                event_id: id,
                event_kind,
                entity,
            })
    }

    /// Subscribe, replaying buffered events newer than `since_id`.
    ///
    /// `Some(0)` replays the whole ring; `None` only yields live events.
    #[must_use]
    pub fn subscribe(&self, since_id: Option<EventId>) -> EventStream {
        let buffer = self.buffer();
        let backlog = since_id.map_or_else(VecDeque::new, |since| {
            buffer
                .iter()
                .filter(|item| item.id > since)
                .cloned()
                .collect()
        });
        let receiver = self.sender.subscribe();
        drop(buffer);
        EventStream { backlog, receiver }
    }

    /// Identifier of the most recent event, if any.
    #[must_use]
    pub fn last_event_id(&self) -> Option<EventId> {
        self.buffer().back().map(|event| event.id)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Yields replayed events first, then live ones.
pub struct EventStream {
    backlog: VecDeque<EventEnvelope>,
    receiver: Receiver<EventEnvelope>,
}

impl EventStream {
    /// Receive the next event, or `None` once every bus handle is dropped.
    pub async fn next(&mut self) -> Option<EventEnvelope> {
        if let Some(event) = self.backlog.pop_front() {
            return Some(event);
        }

        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next already-delivered event without waiting.
    pub fn try_next(&mut self) -> Option<EventEnvelope> {
        if let Some(event) = self.backlog.pop_front() {
            return Some(event);
        }

        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => {}
                Err(_) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    fn registered(index: usize) -> Event {
        Event::EntityRegistered {
            entity: format!("entity-{index}"),
        }
    }

    #[tokio::test]
    async fn sequential_ids_and_replay() {
        let bus = EventBus::with_capacity(16);

        let mut last_id = 0;
        for i in 0..5 {
            last_id = bus.publish(registered(i));
        }
        assert_eq!(last_id, 5);
        assert_eq!(bus.last_event_id(), Some(5));

        let mut stream = bus.subscribe(Some(2));
        let mut received = Vec::new();
        for _ in 0..3 {
            if let Some(event) = stream.next().await {
                received.push(event.id);
            }
        }
        assert_eq!(received, vec![3, 4, 5]);
    }

    #[tokio::test]
    async fn replay_ring_drops_oldest_events() {
        let bus = EventBus::with_capacity(2);
        for i in 0..4 {
            bus.publish(registered(i));
        }
        let mut stream = bus.subscribe(Some(0));
        assert_eq!(stream.next().await.map(|event| event.id), Some(3));
        assert_eq!(stream.next().await.map(|event| event.id), Some(4));
    }

    #[tokio::test]
    async fn try_publish_reports_missing_subscribers() {
        let bus = EventBus::new();
        let err = bus
            .try_publish(registered(0))
            .expect_err("nobody is listening");
        assert_eq!(
            err,
            EventBusError::NoSubscribers {
                event_id: 1,
                event_kind: "entity_registered",
                entity: Some("entity-0".to_string()),
            }
        );

        let mut stream = bus.subscribe(None);
        assert_eq!(bus.try_publish(registered(1)), Ok(2));
        let received = timeout(Duration::from_secs(1), stream.next()).await;
        assert_eq!(received.ok().flatten().map(|event| event.id), Some(2));
    }

    #[tokio::test]
    async fn try_next_drains_without_waiting() {
        let bus = EventBus::new();
        bus.publish(registered(0));
        let mut stream = bus.subscribe(Some(0));
        bus.publish(registered(1));
        drop(bus);

        assert_eq!(stream.try_next().map(|event| event.id), Some(1));
        assert_eq!(stream.try_next().map(|event| event.id), Some(2));
        assert!(stream.try_next().is_none());
    }

    #[tokio::test]
    async fn stream_ends_when_bus_is_dropped() {
        let bus = EventBus::new();
        let mut stream = bus.subscribe(None);
        drop(bus);
        assert!(stream.next().await.is_none());
    }
}
