//! Common bot plumbing: identity and the JSON round trip every event takes.

use rand::rngs::StdRng;
use serde_json::{json, Value};
use tracing::error;

use super::ids::SyntheticIds;
use crate::model::codec::round_trip_notification;
use crate::model::{
    DecodeMode, MeetRequestStatus, Notification, NotificationAction, ResourceId, Timestamp,
    UserInfo, UserRole,
};

/// A synthetic user driving a scripted conversation with the current user.
pub trait UserBot: Send {
    /// Advances the bot by one step. `None` means the bot is done.
    fn next_notification(
        &mut self,
        ids: &mut SyntheticIds,
        rng: &mut StdRng,
        mode: DecodeMode,
    ) -> Option<Notification>;

    /// The user the bot impersonates.
    fn user(&self) -> &UserInfo;
}

/// Builds the user a new bot impersonates, e.g. `Priest_Bot_3 Bot`.
pub(crate) fn bot_user(role: UserRole, ids: &mut SyntheticIds) -> UserInfo {
    let id = ids.next_user_id();
    let key = ids.next_bot_key();
    let mut prefix = role.as_str().to_string();
    if let Some(first) = prefix.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    UserInfo::new(id, format!("{}_Bot_{}", prefix, key), "Bot")
}

pub(crate) fn meet_request_json(
    id: ResourceId,
    penitent: Value,
    priest: Value,
    status: MeetRequestStatus,
) -> Value {
    json!({
        "id": id,
        "penitent": penitent,
        "priest": priest,
        "status": status.as_str(),
    })
}

pub(crate) fn message_json(
    ids: &mut SyntheticIds,
    sender_id: ResourceId,
    recipient_id: ResourceId,
    text: &str,
) -> Value {
    let now = Timestamp::now().to_wire();
    json!({
        "id": ids.next_message_id(),
        "sender_id": sender_id,
        "recipient_id": recipient_id,
        "text": text,
        "created_at": now,
        "updated_at": now,
    })
}

pub(crate) fn meet_request_event(
    ids: &mut SyntheticIds,
    action: NotificationAction,
    meet_request: Value,
    mode: DecodeMode,
) -> Option<Notification> {
    let envelope = json!({
        "id": ids.next_notification_id(),
        "unread": true,
        "model": "MeetRequest",
        "action": action.as_str(),
        "meet_request": meet_request,
    });
    decode(envelope, mode)
}

pub(crate) fn message_event(
    ids: &mut SyntheticIds,
    action: NotificationAction,
    message: Value,
    mode: DecodeMode,
) -> Option<Notification> {
    let envelope = json!({
        "id": ids.next_notification_id(),
        "unread": true,
        "model": "Message",
        "action": action.as_str(),
        "message": message,
    });
    decode(envelope, mode)
}

/// Synthetic events take the same text decoding path as server traffic.
fn decode(envelope: Value, mode: DecodeMode) -> Option<Notification> {
    match round_trip_notification(&envelope, mode) {
        Ok(notification) => Some(notification),
        Err(e) => {
            error!("Bot produced an undecodable notification: {}", e);
            None
        }
    }
}
