//! Host lifecycle and the cloneable command handle.

use std::sync::Arc;

use sluice_config::SluiceConfig;
use sluice_events::EventBus;
use sluice_rpc::Connector;
use sluice_switch::EntitySnapshot;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::command::HostCommand;
use crate::error::{HostError, HostResult};
use crate::worker::{self, WorkerDeps};

const COMMAND_BUFFER: usize = 32;

/// Running host: the worker task plus a handle for sending it commands.
pub struct Host {
    handle: HostHandle,
    worker: JoinHandle<HostResult<()>>,
}

impl Host {
    /// Spawn the worker task.
    ///
    /// The worker sets up the platform (retrying while the daemon is not
    /// ready), registers the entities, and polls them every scan interval.
    #[must_use]
    pub fn start(config: &SluiceConfig, connector: Arc<dyn Connector>, events: EventBus) -> Self {
        let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
        let deps = WorkerDeps {
            deluge: config.deluge.clone(),
            settings: config.host,
            connector,
            events,
        };
        let worker = tokio::spawn(worker::run(deps, rx));
        Self {
            handle: HostHandle { commands },
            worker,
        }
    }

    /// Cloneable handle for issuing commands.
    #[must_use]
    pub fn handle(&self) -> HostHandle {
        self.handle.clone()
    }

    /// Wait for the worker to finish.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Setup`] when setup failed permanently and
    /// [`HostError::Stopped`] if the worker task panicked.
    pub async fn join(self) -> HostResult<()> {
        self.worker.await.map_err(|_| HostError::Stopped)?
    }
}

/// Cloneable handle to a running [`Host`].
#[derive(Clone)]
pub struct HostHandle {
    commands: mpsc::Sender<HostCommand>,
}

impl HostHandle {
    /// Ask the named entity to switch on.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::UnknownEntity`] for unregistered names,
    /// [`HostError::NotReady`] before setup completes, and
    /// [`HostError::Switch`] when the remote command fails.
    pub async fn turn_on(&self, entity: &str) -> HostResult<()> {
        self.request(|respond_to| HostCommand::TurnOn {
            entity: entity.to_string(),
            respond_to,
        })
        .await
    }

    /// Ask the named entity to switch off.
    ///
    /// # Errors
    ///
    /// Same as [`HostHandle::turn_on`].
    pub async fn turn_off(&self, entity: &str) -> HostResult<()> {
        self.request(|respond_to| HostCommand::TurnOff {
            entity: entity.to_string(),
            respond_to,
        })
        .await
    }

    /// Update every entity now and return the resulting snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::NotReady`] before setup completes and
    /// [`HostError::Stopped`] once the worker has exited.
    pub async fn refresh(&self) -> HostResult<Vec<EntitySnapshot>> {
        self.request(|respond_to| HostCommand::Refresh { respond_to })
            .await
    }

    /// Last observed state of every entity.
    ///
    /// # Errors
    ///
    /// Same as [`HostHandle::refresh`].
    pub async fn snapshot(&self) -> HostResult<Vec<EntitySnapshot>> {
        self.request(|respond_to| HostCommand::Snapshot { respond_to })
            .await
    }

    /// Ask the worker to stop. Idempotent.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(HostCommand::Shutdown).await;
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<HostResult<T>>) -> HostCommand,
    ) -> HostResult<T> {
        let (respond_to, rx) = oneshot::channel();
        self.commands
            .send(build(respond_to))
            .await
            .map_err(|_| HostError::Stopped)?;
        rx.await.map_err(|_| HostError::Stopped)?
    }
}
