use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};

use super::command::{Reply, ServiceCommand, ServiceStatus};
use crate::api::GeoPoint;
use crate::cache::{NotificationCache, ReadState, ReplyState};
use crate::config::SyncSettings;
use crate::error::SyncError;
use crate::model::{
    MeetReply, MeetRequest, Message, Notification, NotificationAction, NotificationSequence,
    PriestAvailabilityNotification, ResourceId, UserInfo,
};
use crate::observer::{NotificationObserver, ObserverId, ObserverSet};

/// Handle to interact with a running notification service.
///
/// Cheap to clone. Every operation is forwarded to the service task, so calls
/// from different handles are applied in the order they reach it.
#[derive(Clone)]
pub struct NotificationServiceHandle {
    command_tx: mpsc::Sender<ServiceCommand>,
    status_rx: watch::Receiver<ServiceStatus>,
    observers: Arc<ObserverSet<dyn NotificationObserver>>,
}

impl NotificationServiceHandle {
    pub(crate) fn new(
        command_tx: mpsc::Sender<ServiceCommand>,
        status_rx: watch::Receiver<ServiceStatus>,
        observers: Arc<ObserverSet<dyn NotificationObserver>>,
    ) -> Self {
        Self {
            command_tx,
            status_rx,
            observers,
        }
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> ServiceCommand,
    ) -> Result<T, SyncError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.command_tx
            .send(command(response_tx))
            .await
            .map_err(|_| SyncError::ServiceStopped)?;
        response_rx.await.map_err(|_| SyncError::ServiceStopped)?
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Starts polling (and bots, if enabled). The first fetch happens at once.
    pub async fn start(&self) -> Result<(), SyncError> {
        self.request(|response| ServiceCommand::Start { response })
            .await
    }

    /// Stops polling. A fetch already in flight completes but its result is
    /// discarded.
    pub async fn stop(&self) -> Result<(), SyncError> {
        self.request(|response| ServiceCommand::Stop { response })
            .await
    }

    pub fn status(&self) -> ServiceStatus {
        *self.status_rx.borrow()
    }

    /// Receiver following every status change.
    pub fn subscribe_status(&self) -> watch::Receiver<ServiceStatus> {
        self.status_rx.clone()
    }

    /// Applies new settings. The cache is emptied, observers are told about
    /// every deleted notification and polling restarts from scratch.
    pub async fn configuration_updated(&self, settings: SyncSettings) -> Result<(), SyncError> {
        self.request(|response| ServiceCommand::ConfigurationUpdated {
            settings: Box::new(settings),
            response,
        })
        .await
    }

    // =========================================================================
    // Push entry points
    // =========================================================================

    /// Forces an immediate fetch and resolves to the pushed notification once
    /// it is in the cache.
    ///
    /// Fails with [`SyncError::NotFound`] if the fetch succeeded without
    /// returning it.
    pub async fn did_receive_push(
        &self,
        id: ResourceId,
        action: NotificationAction,
    ) -> Result<Notification, SyncError> {
        self.request(|response| ServiceCommand::DidReceivePush {
            id,
            action,
            response,
        })
        .await
    }

    pub async fn did_receive_priest_availability(
        &self,
        notice: PriestAvailabilityNotification,
    ) -> Result<(), SyncError> {
        self.request(|response| ServiceCommand::DidReceivePriestAvailability { notice, response })
            .await
    }

    /// Confirms the priest will be at the recurrence.
    ///
    /// `notice` is marked confirmed before the request is sent and restored if
    /// the server refuses.
    pub async fn confirm_availability(
        &self,
        notice: &mut PriestAvailabilityNotification,
    ) -> Result<(), SyncError> {
        if notice.confirmed {
            return Err(SyncError::InvalidState(format!(
                "availability for recurrence {} already confirmed",
                notice.recurrence_id
            )));
        }
        notice.confirmed = true;
        let recurrence_id = notice.recurrence_id;
        let result = self
            .request(|response| ServiceCommand::ConfirmAvailability {
                recurrence_id,
                response,
            })
            .await;
        if result.is_err() {
            notice.confirmed = false;
        }
        result
    }

    // =========================================================================
    // User actions
    // =========================================================================

    /// Marks a notification as read. The local flag flips at once and is
    /// restored if the server call fails.
    pub async fn mark_as_read(&self, id: ResourceId) -> Result<(), SyncError> {
        self.request(|response| ServiceCommand::MarkAsRead { id, response })
            .await
    }

    pub async fn send_message(
        &self,
        recipient_id: ResourceId,
        text: impl Into<String>,
    ) -> Result<Message, SyncError> {
        let text = text.into();
        self.request(|response| ServiceCommand::SendMessage {
            recipient_id,
            text,
            response,
        })
        .await
    }

    pub async fn send_meet_request(
        &self,
        priest_id: ResourceId,
        location: GeoPoint,
    ) -> Result<MeetRequest, SyncError> {
        self.request(|response| ServiceCommand::SendMeetRequest {
            priest_id,
            location,
            response,
        })
        .await
    }

    /// Accepts or refuses a pending meet request. The cached status changes
    /// provisionally and is rolled back if the server call fails.
    pub async fn reply_to_meet_request(
        &self,
        id: ResourceId,
        reply: MeetReply,
    ) -> Result<(), SyncError> {
        self.request(|response| ServiceCommand::ReplyToMeetRequest {
            id,
            reply,
            response,
        })
        .await
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Runs `query` against the cache on the service task.
    pub async fn with_cache<R, F>(&self, query: F) -> Result<R, SyncError>
    where
        R: Send + 'static,
        F: FnOnce(&NotificationCache) -> R + Send + 'static,
    {
        let (response_tx, response_rx) = oneshot::channel();
        let query = Box::new(move |cache: &NotificationCache| {
            let _ = response_tx.send(query(cache));
        });
        self.command_tx
            .send(ServiceCommand::Query(query))
            .await
            .map_err(|_| SyncError::ServiceStopped)?;
        response_rx.await.map_err(|_| SyncError::ServiceStopped)
    }

    /// All cached notifications, oldest first.
    pub async fn notifications(&self) -> Result<Vec<Notification>, SyncError> {
        self.with_cache(|cache| cache.notifications().to_vec()).await
    }

    /// Latest notification for each meet request and message.
    pub async fn user_level_notifications(&self) -> Result<Vec<Notification>, SyncError> {
        self.with_cache(|cache| cache.user_level_notifications())
            .await
    }

    pub async fn unread_count(&self) -> Result<usize, SyncError> {
        self.with_cache(|cache| cache.notifications().unread_count())
            .await
    }

    pub async fn messages(&self) -> Result<Vec<Message>, SyncError> {
        self.with_cache(|cache| cache.messages()).await
    }

    pub async fn meet_requests(&self) -> Result<Vec<MeetRequest>, SyncError> {
        self.with_cache(|cache| cache.meet_requests()).await
    }

    pub async fn meet_request(&self, id: ResourceId) -> Result<Option<MeetRequest>, SyncError> {
        self.with_cache(move |cache| cache.meet_request(id).cloned())
            .await
    }

    pub async fn meet_request_for_priest(
        &self,
        priest_id: ResourceId,
    ) -> Result<Option<MeetRequest>, SyncError> {
        self.with_cache(move |cache| cache.meet_request_for_priest(priest_id).cloned())
            .await
    }

    pub async fn latest_notification_about(
        &self,
        meet_request_id: ResourceId,
    ) -> Result<Option<Notification>, SyncError> {
        self.with_cache(move |cache| cache.latest_notification_about(meet_request_id).cloned())
            .await
    }

    pub async fn user_from_id(&self, user_id: ResourceId) -> Result<Option<UserInfo>, SyncError> {
        self.with_cache(move |cache| cache.user_from_id(user_id).cloned())
            .await
    }

    pub async fn read_state(&self, id: ResourceId) -> Result<Option<ReadState>, SyncError> {
        self.with_cache(move |cache| cache.read_state(id)).await
    }

    pub async fn reply_state(&self, id: ResourceId) -> Result<Option<ReplyState>, SyncError> {
        self.with_cache(move |cache| cache.reply_state(id)).await
    }

    // =========================================================================
    // Observers
    // =========================================================================

    /// Registers an observer. The service only keeps a weak reference; the
    /// caller owns the observer and should deregister it on teardown.
    pub fn add_observer<O: NotificationObserver + 'static>(&self, observer: &Arc<O>) -> ObserverId {
        let observer: Arc<dyn NotificationObserver> = observer.clone();
        self.observers.add(&observer)
    }

    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }
}
