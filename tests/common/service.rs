//! Service harness wiring a [`ScriptedTransport`] and a channel observer.

use std::sync::Arc;
use std::time::Duration;

use geoconfess_sync::api::Session;
use geoconfess_sync::{
    ChannelObserver, NotificationEvent, NotificationService, NotificationServiceHandle,
    ServiceStatus, SyncSettings,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc::UnboundedReceiver;

use super::constants::*;
use super::fixtures::penitent_session;
use super::transport::ScriptedTransport;

pub struct TestService {
    service: NotificationService,
    pub handle: NotificationServiceHandle,
    pub transport: Arc<ScriptedTransport>,
    /// Kept alive for the service's weak registration.
    _observer: Arc<ChannelObserver>,
    events: UnboundedReceiver<NotificationEvent>,
}

impl TestService {
    /// Spawns a service for a penitent. Polling is not started.
    pub fn spawn(settings: SyncSettings, transport: Arc<ScriptedTransport>) -> Self {
        Self::spawn_with_session(settings, penitent_session(), transport)
    }

    pub fn spawn_with_session(
        settings: SyncSettings,
        session: Arc<Session>,
        transport: Arc<ScriptedTransport>,
    ) -> Self {
        let service = NotificationService::spawn_with_rng(
            settings,
            session,
            transport.clone(),
            StdRng::seed_from_u64(TEST_SEED),
        );
        let handle = service.handle();
        let (observer, events) = ChannelObserver::new();
        handle.add_observer(&observer);
        Self {
            service,
            handle,
            transport,
            _observer: observer,
            events,
        }
    }

    /// Next observer callback, panicking if none arrives in time.
    pub async fn next_event(&mut self) -> NotificationEvent {
        tokio::time::timeout(Duration::from_secs(EVENT_TIMEOUT_SECS), self.events.recv())
            .await
            .expect("timed out waiting for an observer event")
            .expect("observer channel closed")
    }

    /// Observer callback already delivered, if any.
    pub fn try_next_event(&mut self) -> Option<NotificationEvent> {
        self.events.try_recv().ok()
    }

    pub async fn wait_for_status(&self, expected: ServiceStatus) {
        let mut status = self.handle.subscribe_status();
        tokio::time::timeout(
            Duration::from_secs(EVENT_TIMEOUT_SECS),
            status.wait_for(|s| *s == expected),
        )
        .await
        .expect("timed out waiting for status")
        .expect("status channel closed");
    }

    pub async fn shutdown(self) {
        self.service.shutdown().await;
    }
}
