//! Commands sent from [`crate::HostHandle`] to the worker.

use sluice_switch::EntitySnapshot;
use tokio::sync::oneshot;

use crate::error::{HostError, HostResult};

pub(crate) enum HostCommand {
    TurnOn {
        entity: String,
        respond_to: oneshot::Sender<HostResult<()>>,
    },
    TurnOff {
        entity: String,
        respond_to: oneshot::Sender<HostResult<()>>,
    },
    Refresh {
        respond_to: oneshot::Sender<HostResult<Vec<EntitySnapshot>>>,
    },
    Snapshot {
        respond_to: oneshot::Sender<HostResult<Vec<EntitySnapshot>>>,
    },
    Shutdown,
}

impl HostCommand {
    /// Answer a command received before setup completed.
    pub(crate) fn reject_not_ready(self) {
        match self {
            Self::TurnOn { respond_to, .. } | Self::TurnOff { respond_to, .. } => {
                let _ = respond_to.send(Err(HostError::NotReady));
            }
            Self::Refresh { respond_to } | Self::Snapshot { respond_to } => {
                let _ = respond_to.send(Err(HostError::NotReady));
            }
            Self::Shutdown => {}
        }
    }
}
