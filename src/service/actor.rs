//! The task owning every piece of notification state.
//!
//! All cache mutation and observer dispatch happens here. Network requests run
//! as separate tasks in a [`JoinSet`] and hand their outcome back to this loop,
//! so nothing in the cache is ever touched from another task.

use std::sync::Arc;

use rand::rngs::StdRng;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinError, JoinSet};
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::command::{Reply, ServiceCommand, ServiceStatus};
use crate::api::{ApiClient, Session};
use crate::bots::{BotSpawner, FIRST_TICK_DELAY};
use crate::cache::{MarkRead, NotificationCache};
use crate::config::SyncSettings;
use crate::error::SyncError;
use crate::model::codec::{
    decode_meet_request, decode_message, decode_message_list, decode_notification_list,
};
use crate::model::{
    DecodeMode, MeetRequest, Message, Notification, NotificationSequence, ResourceId,
};
use crate::observer::{NotificationObserver, ObserverSet};
use crate::polling::{FailureAction, FetchTicket, PollScheduler, RetryPolicy};

/// Outcome of a request task.
enum Completion {
    Fetch {
        ticket: FetchTicket,
        result: Result<Value, SyncError>,
    },
    History {
        epoch: u64,
        result: Result<Value, SyncError>,
    },
    MarkedRead {
        id: ResourceId,
        epoch: u64,
        result: Result<(), SyncError>,
        response: Reply<()>,
    },
    MessageSent {
        epoch: u64,
        result: Result<Value, SyncError>,
        response: Reply<Message>,
    },
    MeetRequestSent {
        epoch: u64,
        result: Result<Value, SyncError>,
        response: Reply<MeetRequest>,
    },
    Replied {
        id: ResourceId,
        epoch: u64,
        result: Result<(), SyncError>,
        response: Reply<()>,
    },
    AvailabilityConfirmed {
        result: Result<(), SyncError>,
        response: Reply<()>,
    },
}

pub(crate) struct ServiceActor {
    settings: SyncSettings,
    session: Arc<Session>,
    api: ApiClient,
    mode: DecodeMode,

    cache: NotificationCache,
    observers: Arc<ObserverSet<dyn NotificationObserver>>,
    scheduler: PollScheduler,
    fetch_task: Option<AbortHandle>,
    spawner: BotSpawner,
    bot_deadline: Option<Instant>,
    rng: StdRng,

    /// Bumped by every configuration reset. Request outcomes from an older
    /// epoch are reported to their caller but never applied to the cache.
    epoch: u64,
    history_requested: bool,
    pending_pushes: Vec<(ResourceId, Reply<Notification>)>,

    tasks: JoinSet<Completion>,
    command_rx: mpsc::Receiver<ServiceCommand>,
    status_tx: watch::Sender<ServiceStatus>,
    shutdown_token: CancellationToken,
}

impl ServiceActor {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        settings: SyncSettings,
        session: Arc<Session>,
        api: ApiClient,
        observers: Arc<ObserverSet<dyn NotificationObserver>>,
        rng: StdRng,
        command_rx: mpsc::Receiver<ServiceCommand>,
        status_tx: watch::Sender<ServiceStatus>,
        shutdown_token: CancellationToken,
    ) -> Self {
        Self {
            mode: settings.decode_mode(),
            scheduler: PollScheduler::new(settings.refresh_rate(), RetryPolicy::new(&settings)),
            spawner: BotSpawner::new(&settings, &session),
            cache: NotificationCache::new(Arc::clone(&observers)),
            settings,
            session,
            api,
            observers,
            fetch_task: None,
            bot_deadline: None,
            rng,
            epoch: 0,
            history_requested: false,
            pending_pushes: Vec::new(),
            tasks: JoinSet::new(),
            command_rx,
            status_tx,
            shutdown_token,
        }
    }

    /// Main service loop.
    pub(crate) async fn run(mut self) {
        info!(
            "Starting notification service for user {} ({})",
            self.session.user_id(),
            self.session.role().as_str()
        );

        loop {
            let fetch_deadline = self.scheduler.next_deadline();
            let bot_deadline = self.bot_deadline;

            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    info!("Notification service received shutdown signal");
                    break;
                }
                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        debug!("All service handles dropped");
                        break;
                    }
                },
                Some(joined) = self.tasks.join_next() => {
                    self.handle_joined(joined);
                }
                _ = sleep_until_deadline(fetch_deadline) => {
                    self.fetch_if_due();
                }
                _ = sleep_until_deadline(bot_deadline) => {
                    self.tick_bots();
                }
            }
        }

        self.shutdown().await;
        info!("Notification service stopped");
    }

    /// Drains every request task before returning.
    async fn shutdown(&mut self) {
        self.scheduler.stop();
        self.bot_deadline = None;
        self.tasks.shutdown().await;
        self.fail_pending_pushes(SyncError::ServiceStopped);
        self.status_tx.send_replace(ServiceStatus::Stopped);
    }

    fn handle_command(&mut self, command: ServiceCommand) {
        match command {
            ServiceCommand::Start { response } => {
                self.start();
                let _ = response.send(Ok(()));
            }
            ServiceCommand::Stop { response } => {
                self.stop();
                let _ = response.send(Ok(()));
            }
            ServiceCommand::DidReceivePush {
                id,
                action,
                response,
            } => {
                info!("Push notification {} ({}), fetching now", id, action.as_str());
                self.pending_pushes.push((id, response));
                self.preempt();
            }
            ServiceCommand::DidReceivePriestAvailability { notice, response } => {
                info!(
                    "Priest availability reminder for recurrence {} at {}",
                    notice.recurrence_id, notice.spot_name
                );
                self.observers
                    .notify(|o| o.did_receive_priest_availability(&notice));
                let _ = response.send(Ok(()));
            }
            ServiceCommand::ConfirmAvailability {
                recurrence_id,
                response,
            } => {
                let api = self.api.clone();
                self.tasks.spawn(async move {
                    Completion::AvailabilityConfirmed {
                        result: api.confirm_availability(recurrence_id).await,
                        response,
                    }
                });
            }
            ServiceCommand::MarkAsRead { id, response } => self.mark_as_read(id, response),
            ServiceCommand::SendMessage {
                recipient_id,
                text,
                response,
            } => {
                let api = self.api.clone();
                let epoch = self.epoch;
                self.tasks.spawn(async move {
                    Completion::MessageSent {
                        epoch,
                        result: api.send_message(recipient_id, &text).await,
                        response,
                    }
                });
            }
            ServiceCommand::SendMeetRequest {
                priest_id,
                location,
                response,
            } => {
                let api = self.api.clone();
                let epoch = self.epoch;
                self.tasks.spawn(async move {
                    Completion::MeetRequestSent {
                        epoch,
                        result: api.create_meet_request(priest_id, location).await,
                        response,
                    }
                });
            }
            ServiceCommand::ReplyToMeetRequest {
                id,
                reply,
                response,
            } => {
                if let Err(e) = self.cache.begin_reply(id, reply) {
                    let _ = response.send(Err(e));
                    return;
                }
                let api = self.api.clone();
                let epoch = self.epoch;
                self.tasks.spawn(async move {
                    Completion::Replied {
                        id,
                        epoch,
                        result: api.reply_meet_request(id, reply).await,
                        response,
                    }
                });
            }
            ServiceCommand::ConfigurationUpdated { settings, response } => {
                let result = self.apply_configuration(*settings);
                let _ = response.send(result);
            }
            ServiceCommand::Query(query) => query(&self.cache),
        }
    }

    fn handle_joined(&mut self, joined: Result<Completion, JoinError>) {
        let completion = match joined {
            Ok(completion) => completion,
            Err(e) if e.is_cancelled() => return,
            Err(e) => {
                error!("Request task failed: {}", e);
                return;
            }
        };
        match completion {
            Completion::Fetch { ticket, result } => self.on_fetch_complete(ticket, result),
            Completion::History { epoch, result } => self.on_history_complete(epoch, result),
            Completion::MarkedRead {
                id,
                epoch,
                result,
                response,
            } => {
                if epoch == self.epoch {
                    match &result {
                        Ok(()) => self.cache.confirm_read(id),
                        Err(e) => {
                            warn!("Marking notification {} as read failed: {}", id, e);
                            self.cache.rollback_read(id);
                        }
                    }
                }
                let _ = response.send(result);
            }
            Completion::MessageSent {
                epoch,
                result,
                response,
            } => {
                let result = result.and_then(|value| {
                    decode_message(&value, self.mode).map_err(SyncError::from)
                });
                if let Ok(message) = &result {
                    if epoch == self.epoch {
                        self.cache.insert_sent_message(message.clone());
                    }
                }
                let _ = response.send(result);
            }
            Completion::MeetRequestSent {
                epoch,
                result,
                response,
            } => {
                let result = result.and_then(|value| {
                    decode_meet_request(&value, self.mode).map_err(SyncError::from)
                });
                if let Ok(meet_request) = &result {
                    if epoch == self.epoch {
                        self.cache.insert_meet_request(meet_request.clone());
                    }
                }
                let _ = response.send(result);
            }
            Completion::Replied {
                id,
                epoch,
                result,
                response,
            } => {
                if epoch == self.epoch {
                    match &result {
                        Ok(()) => {
                            self.cache.settle_reply(id);
                        }
                        Err(e) => {
                            warn!("Replying to meet request {} failed: {}", id, e);
                            self.cache.rollback_reply(id);
                        }
                    }
                }
                let _ = response.send(result);
            }
            Completion::AvailabilityConfirmed { result, response } => {
                let _ = response.send(result);
            }
        }
    }

    // =========================================================================
    // Polling
    // =========================================================================

    fn start(&mut self) {
        let now = Instant::now();
        if self.scheduler.start(now) {
            info!("Starting notifications polling");
            self.abort_fetch();
        }
        self.start_bots(now);
        if !self.history_requested {
            self.fetch_history();
        }
        self.status_tx.send_replace(ServiceStatus::Running);
    }

    fn stop(&mut self) {
        if self.scheduler.stop() {
            info!("Stopping notifications polling");
        }
        self.bot_deadline = None;
        self.fail_pending_pushes(SyncError::InvalidState(
            "polling stopped before the push was resolved".to_string(),
        ));
        self.status_tx.send_replace(ServiceStatus::Stopped);
    }

    fn preempt(&mut self) {
        let now = Instant::now();
        if self.scheduler.preempt(now) {
            debug!("Push supersedes the fetch in flight");
        }
        // Whatever was in flight is stale now.
        self.abort_fetch();
        self.start_bots(now);
        self.status_tx.send_replace(ServiceStatus::Running);
    }

    fn abort_fetch(&mut self) {
        if let Some(task) = self.fetch_task.take() {
            task.abort();
        }
    }

    fn fetch_if_due(&mut self) {
        let Some(ticket) = self.scheduler.due(Instant::now()) else {
            return;
        };
        debug!("Updating notifications...");
        let api = self.api.clone();
        let task = self.tasks.spawn(async move {
            Completion::Fetch {
                ticket,
                result: api.get_notifications().await,
            }
        });
        self.fetch_task = Some(task);
    }

    fn on_fetch_complete(&mut self, ticket: FetchTicket, result: Result<Value, SyncError>) {
        if !self.scheduler.accepts(ticket) {
            debug!("Discarding result of a superseded fetch");
            return;
        }
        self.fetch_task = None;
        let now = Instant::now();
        let decoded = result.and_then(|value| {
            decode_notification_list(&value, self.mode).map_err(SyncError::from)
        });

        match decoded {
            Ok(window) => {
                let diff = self.cache.merge_fetched(window);
                self.scheduler.complete_success(ticket, now);
                let notifications = self.cache.notifications();
                info!(
                    "Updating notifications... OK ({} new, {} meet reqs, {} messages, {} seen)",
                    diff.inserted.len(),
                    notifications.meet_request_count(),
                    notifications.message_count(),
                    self.cache.returned_count()
                );
                self.resolve_pushes();
            }
            Err(e) => {
                match self
                    .scheduler
                    .complete_failure(ticket, &e, now, &mut self.rng)
                {
                    FailureAction::Retry(delay) => {
                        error!(
                            "Updating notifications... FAILED ({}), retrying in {:.1}s",
                            e,
                            delay.as_secs_f64()
                        );
                    }
                    FailureAction::Halted => {
                        error!("Updating notifications... FAILED ({}), polling stopped", e);
                        self.bot_deadline = None;
                        let status = match e {
                            SyncError::Authentication => ServiceStatus::AuthenticationRequired,
                            _ => ServiceStatus::Stopped,
                        };
                        self.fail_pending_pushes(e);
                        self.status_tx.send_replace(status);
                    }
                    FailureAction::Discarded => {}
                }
            }
        }
    }

    fn resolve_pushes(&mut self) {
        for (id, response) in std::mem::take(&mut self.pending_pushes) {
            match self.cache.notification(id).cloned() {
                Some(notification) => {
                    self.observers
                        .notify(|o| o.did_receive_push_notification(&notification));
                    let _ = response.send(Ok(notification));
                }
                None => {
                    warn!("Pushed notification {} not found after update", id);
                    let _ = response.send(Err(SyncError::NotFound(format!(
                        "notification {}",
                        id
                    ))));
                }
            }
        }
    }

    fn fail_pending_pushes(&mut self, error: SyncError) {
        for (_, response) in std::mem::take(&mut self.pending_pushes) {
            let _ = response.send(Err(error.clone()));
        }
    }

    // =========================================================================
    // Bots
    // =========================================================================

    fn start_bots(&mut self, now: Instant) {
        if self.spawner.is_enabled() && self.bot_deadline.is_none() {
            self.bot_deadline = Some(now + FIRST_TICK_DELAY);
        }
    }

    fn tick_bots(&mut self) {
        let generated = self.spawner.tick(&mut self.rng, self.mode);
        for notification in generated {
            self.cache.queue_synthetic(notification);
        }
        if self.cache.pending_synthetic() > 0 {
            debug!(
                "{} fake notifications waiting for the next update",
                self.cache.pending_synthetic()
            );
        }
        self.bot_deadline = Some(Instant::now() + self.spawner.next_delay(&mut self.rng));
    }

    // =========================================================================
    // Messages
    // =========================================================================

    fn fetch_history(&mut self) {
        self.history_requested = true;
        let api = self.api.clone();
        let epoch = self.epoch;
        debug!("Getting all messages...");
        self.tasks.spawn(async move {
            Completion::History {
                epoch,
                result: api.get_messages().await,
            }
        });
    }

    fn on_history_complete(&mut self, epoch: u64, result: Result<Value, SyncError>) {
        if epoch != self.epoch {
            return;
        }
        let decoded = result
            .and_then(|value| decode_message_list(&value, self.mode).map_err(SyncError::from));
        match decoded {
            Ok(history) => {
                let downloaded = history.len();
                let added = self.cache.merge_message_history(history);
                info!(
                    "Getting all messages... OK ({} downloaded, {} new)",
                    downloaded,
                    added.len()
                );
            }
            Err(e) => {
                error!("Getting all messages... FAILED ({})", e);
                // Retried on the next start.
                self.history_requested = false;
            }
        }
    }

    // =========================================================================
    // Read state
    // =========================================================================

    fn mark_as_read(&mut self, id: ResourceId, response: Reply<()>) {
        match self.cache.begin_mark_read(id) {
            Err(e) => {
                let _ = response.send(Err(e));
            }
            Ok(MarkRead::AlreadyRead) | Ok(MarkRead::Local) => {
                let _ = response.send(Ok(()));
            }
            Ok(MarkRead::Remote) => {
                let api = self.api.clone();
                let epoch = self.epoch;
                self.tasks.spawn(async move {
                    Completion::MarkedRead {
                        id,
                        epoch,
                        result: api.mark_notification_read(id).await,
                        response,
                    }
                });
            }
        }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    fn apply_configuration(&mut self, settings: SyncSettings) -> Result<(), SyncError> {
        settings
            .validate()
            .map_err(|e| SyncError::InvalidState(format!("invalid configuration: {:#}", e)))?;
        info!("Resetting notifications for new configuration...");

        self.scheduler.stop();
        self.abort_fetch();
        self.bot_deadline = None;
        let old_count = self.cache.notifications().len();
        self.cache.reset();
        self.epoch += 1;

        if settings.server_api_url != self.settings.server_api_url
            || settings.request_timeout_secs != self.settings.request_timeout_secs
        {
            warn!("Transport settings change takes effect on the next session");
        }
        self.scheduler = PollScheduler::new(settings.refresh_rate(), RetryPolicy::new(&settings));
        self.spawner = BotSpawner::new(&settings, &self.session);
        self.mode = settings.decode_mode();
        self.settings = settings;
        self.history_requested = false;

        info!(
            "Resetting notifications for new configuration... OK ({} deleted)",
            old_count
        );
        self.start();
        Ok(())
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

