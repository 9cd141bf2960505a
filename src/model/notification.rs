//! Notifications: the server's record of something that happened to a
//! meet request or a message of the current user.

use std::collections::HashMap;

use serde::{Deserialize, Serialize, Serializer};

use super::ids::ResourceId;
use super::meet_request::MeetRequest;
use super::message::Message;

/// What a notification reports about its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationAction {
    /// Meet request or message sent by the user.
    Sent,
    /// Meet request or message received by the user.
    Received,
    /// Meet request accepted by the priest.
    Accepted,
    /// Meet request refused by the priest.
    Refused,
}

impl NotificationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationAction::Sent => "sent",
            NotificationAction::Received => "received",
            NotificationAction::Accepted => "accepted",
            NotificationAction::Refused => "refused",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sent" => Some(NotificationAction::Sent),
            "received" => Some(NotificationAction::Received),
            "accepted" => Some(NotificationAction::Accepted),
            "refused" => Some(NotificationAction::Refused),
            _ => None,
        }
    }
}

/// The object embedded in a notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NotificationModel {
    MeetRequest(MeetRequest),
    Message(Message),
}

impl NotificationModel {
    /// Discriminator used on the wire (`"model"` field).
    pub fn kind(&self) -> &'static str {
        match self {
            NotificationModel::MeetRequest(_) => MODEL_MEET_REQUEST,
            NotificationModel::Message(_) => MODEL_MESSAGE,
        }
    }
}

pub(crate) const MODEL_MEET_REQUEST: &str = "MeetRequest";
pub(crate) const MODEL_MESSAGE: &str = "Message";

/// A single notification. Equality is structural; ordering is by id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Notification {
    pub id: ResourceId,
    pub model: NotificationModel,
    pub action: NotificationAction,
    /// Has this notification been read by the user?
    pub unread: bool,
}

impl Notification {
    pub fn new(
        id: ResourceId,
        model: NotificationModel,
        action: NotificationAction,
        unread: bool,
    ) -> Self {
        Self {
            id,
            model,
            action,
            unread,
        }
    }

    pub fn meet_request(&self) -> Option<&MeetRequest> {
        match &self.model {
            NotificationModel::MeetRequest(meet_request) => Some(meet_request),
            NotificationModel::Message(_) => None,
        }
    }

    pub fn message(&self) -> Option<&Message> {
        match &self.model {
            NotificationModel::Message(message) => Some(message),
            NotificationModel::MeetRequest(_) => None,
        }
    }

    /// Key of the object this notification is about, for per-object grouping.
    pub fn notifiable_key(&self) -> NotifiableKey {
        match &self.model {
            NotificationModel::MeetRequest(meet_request) => {
                NotifiableKey::MeetRequest(meet_request.id)
            }
            NotificationModel::Message(message) => NotifiableKey::Sender(message.sender_id),
        }
    }

    /// Encodes the notification as a server envelope.
    pub fn to_json(&self) -> serde_json::Value {
        // Serializing plain data into a Value cannot fail.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    id: ResourceId,
    unread: bool,
    model: &'static str,
    action: NotificationAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    meet_request: Option<&'a MeetRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a Message>,
}

impl Serialize for Notification {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Envelope {
            id: self.id,
            unread: self.unread,
            model: self.model.kind(),
            action: self.action,
            meet_request: self.meet_request(),
            message: self.message(),
        }
        .serialize(serializer)
    }
}

/// Identity of the object a notification talks about.
///
/// Meet requests are grouped by their own id, messages by their sender, so a
/// conversation shows up once per counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifiableKey {
    MeetRequest(ResourceId),
    Sender(ResourceId),
}

/// Sorts notifications in chronological order (newest last).
pub fn sort_chronologically(notifications: &mut [Notification]) {
    notifications.sort_by_key(|n| n.id);
}

/// Aggregate views over a list of notifications.
pub trait NotificationSequence {
    /// Only the latest notification per notifiable object, oldest first.
    ///
    /// This is the list presented to the user.
    fn latest_per_object(&self) -> Vec<Notification>;

    fn unread_count(&self) -> usize;

    fn meet_request_count(&self) -> usize;

    fn message_count(&self) -> usize;
}

impl NotificationSequence for [Notification] {
    fn latest_per_object(&self) -> Vec<Notification> {
        let mut latest: HashMap<NotifiableKey, &Notification> = HashMap::new();
        for notification in self {
            let key = notification.notifiable_key();
            match latest.get(&key) {
                Some(current) if current.id >= notification.id => {}
                _ => {
                    latest.insert(key, notification);
                }
            }
        }
        let mut result: Vec<Notification> = latest.into_values().cloned().collect();
        sort_chronologically(&mut result);
        result
    }

    fn unread_count(&self) -> usize {
        self.iter().filter(|n| n.unread).count()
    }

    fn meet_request_count(&self) -> usize {
        self.iter().filter(|n| n.meet_request().is_some()).count()
    }

    fn message_count(&self) -> usize {
        self.iter().filter(|n| n.message().is_some()).count()
    }
}
