//! The notification service: one task owning the cache, driven by commands.
//!
//! [`NotificationService`] spawns the task and owns its lifetime; any number of
//! [`NotificationServiceHandle`] clones talk to it.

mod actor;
mod command;
mod handle;

pub use command::ServiceStatus;
pub use handle::NotificationServiceHandle;

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::api::{ApiClient, HttpTransport, Session, Transport};
use crate::config::SyncSettings;
use crate::error::SyncError;
use crate::observer::ObserverSet;
use actor::ServiceActor;

const COMMAND_CHANNEL_CAPACITY: usize = 64;

pub struct NotificationService {
    handle: NotificationServiceHandle,
    shutdown_token: CancellationToken,
    join_handle: JoinHandle<()>,
}

impl NotificationService {
    /// Spawns the service on the current runtime. Polling does not begin until
    /// [`NotificationServiceHandle::start`] is called.
    pub fn spawn(
        settings: SyncSettings,
        session: Arc<Session>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self::spawn_with_rng(settings, session, transport, StdRng::from_os_rng())
    }

    /// Like [`spawn`](Self::spawn) with a caller-provided random source for
    /// backoff and bot decisions.
    pub fn spawn_with_rng(
        settings: SyncSettings,
        session: Arc<Session>,
        transport: Arc<dyn Transport>,
        rng: StdRng,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (status_tx, status_rx) = watch::channel(ServiceStatus::Stopped);
        let observers = Arc::new(ObserverSet::new());
        let shutdown_token = CancellationToken::new();

        let api = ApiClient::new(transport, Arc::clone(&session));
        let actor = ServiceActor::new(
            settings,
            session,
            api,
            Arc::clone(&observers),
            rng,
            command_rx,
            status_tx,
            shutdown_token.clone(),
        );
        let join_handle = tokio::spawn(actor.run());

        Self {
            handle: NotificationServiceHandle::new(command_tx, status_rx, observers),
            shutdown_token,
            join_handle,
        }
    }

    /// Spawns the service talking HTTP to `settings.server_api_url`.
    pub fn connect(settings: SyncSettings, session: Arc<Session>) -> Result<Self, SyncError> {
        let transport =
            HttpTransport::new(&settings.server_api_url, settings.request_timeout_secs)?;
        info!("Using server API at {}", transport.base_url());
        Ok(Self::spawn(settings, session, Arc::new(transport)))
    }

    pub fn handle(&self) -> NotificationServiceHandle {
        self.handle.clone()
    }

    /// Stops the service and waits for in-flight requests to wind down.
    /// Pending and later calls on any handle fail with
    /// [`SyncError::ServiceStopped`].
    pub async fn shutdown(self) {
        self.shutdown_token.cancel();
        if let Err(e) = self.join_handle.await {
            error!("Notification service task failed: {}", e);
        }
    }
}
