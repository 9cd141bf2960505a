//! JSON payloads and settings used across tests.

use std::sync::Arc;

use geoconfess_sync::model::{ResourceId, UserInfo, UserRole};
use geoconfess_sync::{Session, StaticToken, SyncSettings};
use serde_json::{json, Value};

use super::constants::*;

const TEST_DATE: &str = "2016-06-14T10:00:00.000+0000";

/// Default settings: 30s refresh, 3-8s retry backoff, strict decoding, no bots.
pub fn test_settings() -> SyncSettings {
    SyncSettings::new(TEST_SERVER_URL)
}

pub fn session_with_role(role: UserRole) -> Arc<Session> {
    Arc::new(Session::new(
        UserInfo::anonymous(ResourceId(USER_ID)),
        role,
        Arc::new(StaticToken::new(TEST_ACCESS_TOKEN)),
    ))
}

pub fn penitent_session() -> Arc<Session> {
    session_with_role(UserRole::Penitent)
}

pub fn priest_session() -> Arc<Session> {
    session_with_role(UserRole::Priest)
}

/// Meet request between the test user (penitent) and [`OTHER_USER_ID`] (priest).
pub fn meet_request_json(id: u64, status: &str) -> Value {
    json!({
        "id": id,
        "status": status,
        "penitent": {"id": USER_ID},
        "priest": {"id": OTHER_USER_ID, "name": "Jean", "surname": "Vianney"},
    })
}

/// Meet request sent to the test user acting as a priest.
pub fn incoming_meet_request_json(id: u64, status: &str) -> Value {
    json!({
        "id": id,
        "status": status,
        "penitent": {"id": OTHER_USER_ID, "name": "Marie", "surname": "Curie"},
        "priest": {"id": USER_ID},
    })
}

pub fn message_json(id: u64, sender_id: u64, recipient_id: u64, text: &str) -> Value {
    json!({
        "id": id,
        "sender_id": sender_id,
        "recipient_id": recipient_id,
        "text": text,
        "created_at": TEST_DATE,
        "updated_at": TEST_DATE,
    })
}

pub fn meet_request_notification(id: u64, action: &str, meet_request: Value) -> Value {
    json!({
        "id": id,
        "unread": true,
        "model": "MeetRequest",
        "action": action,
        "meet_request": meet_request,
    })
}

pub fn message_notification(id: u64, message: Value) -> Value {
    json!({
        "id": id,
        "unread": true,
        "model": "Message",
        "action": "received",
        "message": message,
    })
}
