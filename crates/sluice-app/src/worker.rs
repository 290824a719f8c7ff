//! Host worker task.
//!
//! # Design
//! - Setup is retried at a fixed interval while the daemon refuses connections.
//! - Entities are owned by the worker; polls and commands are served from one
//!   `select!` loop, so calls on the shared connection never overlap.
//! - Events are published only when an entity's state or availability changes.

#![allow(clippy::redundant_pub_crate)]

use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use sluice_config::{DelugeConfig, HostSettings};
use sluice_events::{Event, EventBus};
use sluice_rpc::Connector;
use sluice_switch::{EntitySnapshot, SwitchState, ToggleEntity, setup_platform};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};
use tracing::{debug, error, info, warn};

use crate::command::HostCommand;
use crate::error::{HostError, HostResult};

pub(crate) struct WorkerDeps {
    pub(crate) deluge: DelugeConfig,
    pub(crate) settings: HostSettings,
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) events: EventBus,
}

/// Set up the platform, then poll and serve commands until shutdown.
pub(crate) async fn run(
    deps: WorkerDeps,
    mut commands: mpsc::Receiver<HostCommand>,
) -> HostResult<()> {
    let WorkerDeps {
        deluge,
        settings,
        connector,
        events,
    } = deps;

    let Some(entities) = setup(
        &deluge,
        connector.as_ref(),
        settings.setup_retry_interval(),
        &events,
        &mut commands,
    )
    .await?
    else {
        info!("host shut down before setup completed");
        return Ok(());
    };

    let mut worker = Worker::new(entities, events);
    worker.register();
    worker.refresh_all().await;

    let scan_interval = settings.scan_interval();
    let mut poll = interval_at(Instant::now() + scan_interval, scan_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            command = commands.recv() => {
                match command {
                    Some(HostCommand::Shutdown) | None => break,
                    Some(command) => worker.handle(command).await,
                }
            }
            _ = poll.tick() => worker.refresh_all().await,
        }
    }
    info!("host worker stopped");
    Ok(())
}

/// Retry a not-ready setup on a fixed interval. `Ok(None)` means shutdown was
/// requested while waiting.
async fn setup(
    deluge: &DelugeConfig,
    connector: &dyn Connector,
    retry_interval: Duration,
    events: &EventBus,
    commands: &mut mpsc::Receiver<HostCommand>,
) -> HostResult<Option<Vec<Box<dyn ToggleEntity>>>> {
    let mut attempt: u32 = 0;
    loop {
        attempt = attempt.saturating_add(1);
        match setup_platform(deluge, connector).await {
            Ok(entities) => return Ok(Some(entities)),
            Err(err) if err.is_retryable() => {
                let retry_in_secs = retry_interval.as_secs();
                warn!(attempt, retry_in_secs, error = %err, "deluge daemon not ready; retrying setup");
                events.publish(Event::SetupRetry {
                    attempt,
                    retry_in_secs,
                });
                let mut delay = pin!(sleep(retry_interval));
                loop {
                    tokio::select! {
                        () = &mut delay => break,
                        command = commands.recv() => match command {
                            Some(HostCommand::Shutdown) | None => return Ok(None),
                            Some(command) => command.reject_not_ready(),
                        },
                    }
                }
            }
            Err(err) => {
                error!(error = %err, "deluge platform setup failed permanently");
                events.publish(Event::SetupFailed {
                    message: err.to_string(),
                });
                return Err(HostError::Setup { source: err });
            }
        }
    }
}

struct Tracked {
    entity: Box<dyn ToggleEntity>,
    observed: (SwitchState, bool),
}

struct Worker {
    entities: Vec<Tracked>,
    events: EventBus,
}

impl Worker {
    fn new(entities: Vec<Box<dyn ToggleEntity>>, events: EventBus) -> Self {
        let entities = entities
            .into_iter()
            .map(|entity| Tracked {
                observed: (entity.state(), entity.available()),
                entity,
            })
            .collect();
        Self { entities, events }
    }

    fn register(&self) {
        for tracked in &self.entities {
            info!(entity = %tracked.entity.name(), "entity registered");
            self.events.publish(Event::EntityRegistered {
                entity: tracked.entity.name().to_string(),
            });
        }
    }

    async fn refresh_all(&mut self) {
        for tracked in &mut self.entities {
            let name = tracked.entity.name().to_string();
            if let Err(err) = tracked.entity.update().await {
                warn!(entity = %name, error = %err, "entity update failed");
                self.events.publish(Event::UpdateFailed {
                    entity: name,
                    message: err.to_string(),
                });
                continue;
            }
            let current = (tracked.entity.state(), tracked.entity.available());
            if current != tracked.observed {
                debug!(entity = %name, state = %current.0, available = current.1, "entity state changed");
                tracked.observed = current;
                self.events.publish(Event::StateChanged {
                    entity: name,
                    state: current.0,
                    available: current.1,
                });
            }
        }
    }

    fn snapshots(&self) -> Vec<EntitySnapshot> {
        self.entities
            .iter()
            .map(|tracked| tracked.entity.snapshot())
            .collect()
    }

    fn find(&self, name: &str) -> HostResult<&dyn ToggleEntity> {
        self.entities
            .iter()
            .find(|tracked| tracked.entity.name() == name)
            .map(|tracked| tracked.entity.as_ref())
            .ok_or_else(|| HostError::UnknownEntity {
                name: name.to_string(),
            })
    }

    async fn switch(&self, name: &str, target: SwitchState) -> HostResult<()> {
        let entity = self.find(name)?;
        let outcome = match target {
            SwitchState::On => entity.turn_on().await,
            SwitchState::Off => entity.turn_off().await,
        };
        outcome.map_err(|source| HostError::Switch {
            entity: name.to_string(),
            source,
        })?;
        info!(entity = %name, target = %target, "switch command issued");
        self.events.publish(Event::CommandIssued {
            entity: name.to_string(),
            target,
        });
        Ok(())
    }

    async fn handle(&mut self, command: HostCommand) {
        match command {
            HostCommand::TurnOn { entity, respond_to } => {
                let _ = respond_to.send(self.switch(&entity, SwitchState::On).await);
            }
            HostCommand::TurnOff { entity, respond_to } => {
                let _ = respond_to.send(self.switch(&entity, SwitchState::Off).await);
            }
            HostCommand::Refresh { respond_to } => {
                self.refresh_all().await;
                let _ = respond_to.send(Ok(self.snapshots()));
            }
            HostCommand::Snapshot { respond_to } => {
                let _ = respond_to.send(Ok(self.snapshots()));
            }
            HostCommand::Shutdown => {}
        }
    }
}
