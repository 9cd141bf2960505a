use serde::Serialize;
use tokio::sync::oneshot;

use crate::api::GeoPoint;
use crate::cache::NotificationCache;
use crate::config::SyncSettings;
use crate::error::SyncError;
use crate::model::{
    MeetReply, MeetRequest, Message, Notification, NotificationAction,
    PriestAvailabilityNotification, ResourceId,
};

/// Lifecycle of the notification service, as published on its status channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    Stopped,
    Running,
    /// The server rejected the session; polling stopped until a new login.
    AuthenticationRequired,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Stopped => "stopped",
            ServiceStatus::Running => "running",
            ServiceStatus::AuthenticationRequired => "authentication_required",
        }
    }
}

pub(crate) type Reply<T> = oneshot::Sender<Result<T, SyncError>>;

/// Read-only access to the cache, run on the service task.
pub(crate) type CacheQuery = Box<dyn FnOnce(&NotificationCache) + Send>;

/// Command sent to the service task.
pub(crate) enum ServiceCommand {
    Start {
        response: Reply<()>,
    },
    Stop {
        response: Reply<()>,
    },
    DidReceivePush {
        id: ResourceId,
        action: NotificationAction,
        response: Reply<Notification>,
    },
    DidReceivePriestAvailability {
        notice: PriestAvailabilityNotification,
        response: Reply<()>,
    },
    ConfirmAvailability {
        recurrence_id: ResourceId,
        response: Reply<()>,
    },
    MarkAsRead {
        id: ResourceId,
        response: Reply<()>,
    },
    SendMessage {
        recipient_id: ResourceId,
        text: String,
        response: Reply<Message>,
    },
    SendMeetRequest {
        priest_id: ResourceId,
        location: GeoPoint,
        response: Reply<MeetRequest>,
    },
    ReplyToMeetRequest {
        id: ResourceId,
        reply: MeetReply,
        response: Reply<()>,
    },
    ConfigurationUpdated {
        settings: Box<SyncSettings>,
        response: Reply<()>,
    },
    Query(CacheQuery),
}
