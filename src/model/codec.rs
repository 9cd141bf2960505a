//! JSON decoding of server payloads.
//!
//! Only the core fields are checked with a recoverable error: the JSON shape,
//! the `id`, and the presence of the `model`/`action` discriminators. Anything
//! else that is malformed means the client and server disagree on the contract;
//! in [`DecodeMode::Strict`] that is a fatal panic, in [`DecodeMode::Lenient`]
//! it is reported as [`DecodeError::ProtocolViolation`].

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, warn};

use super::ids::ResourceId;
use super::meet_request::MeetRequest;
use super::message::Message;
use super::notification::{
    Notification, NotificationAction, NotificationModel, MODEL_MEET_REQUEST, MODEL_MESSAGE,
};

/// How to react to a malformed non-core field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeMode {
    /// Contract violations abort the process.
    #[default]
    Strict,
    /// Contract violations are returned as errors.
    Lenient,
}

impl DecodeMode {
    pub fn from_strict_flag(strict: bool) -> Self {
        if strict {
            DecodeMode::Strict
        } else {
            DecodeMode::Lenient
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("expected a JSON object")]
    NotAnObject,

    #[error("missing or malformed core field `{0}`")]
    CoreField(&'static str),

    #[error("protocol violation at `{field}`: {reason}")]
    ProtocolViolation { field: String, reason: String },
}

impl DecodeError {
    /// True for the errors callers are expected to recover from.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, DecodeError::ProtocolViolation { .. })
    }
}

fn violation(mode: DecodeMode, field: &str, reason: impl Into<String>) -> DecodeError {
    let reason = reason.into();
    match mode {
        DecodeMode::Strict => panic!("protocol violation at `{field}`: {reason}"),
        DecodeMode::Lenient => DecodeError::ProtocolViolation {
            field: field.to_string(),
            reason,
        },
    }
}

fn core_id(value: &Value) -> Result<ResourceId, DecodeError> {
    let object = value.as_object().ok_or(DecodeError::NotAnObject)?;
    object
        .get("id")
        .and_then(Value::as_u64)
        .map(ResourceId)
        .ok_or(DecodeError::CoreField("id"))
}

fn decode_payload<T: DeserializeOwned>(
    value: &Value,
    field: &str,
    mode: DecodeMode,
) -> Result<T, DecodeError> {
    serde_json::from_value(value.clone()).map_err(|e| violation(mode, field, e.to_string()))
}

pub fn decode_meet_request(value: &Value, mode: DecodeMode) -> Result<MeetRequest, DecodeError> {
    core_id(value)?;
    decode_payload(value, "meet_request", mode)
}

pub fn decode_message(value: &Value, mode: DecodeMode) -> Result<Message, DecodeError> {
    core_id(value)?;
    decode_payload(value, "message", mode)
}

/// Decodes a single notification envelope.
pub fn decode_notification(value: &Value, mode: DecodeMode) -> Result<Notification, DecodeError> {
    let id = core_id(value)?;
    let object = value.as_object().ok_or(DecodeError::NotAnObject)?;
    let model_name = object
        .get("model")
        .and_then(Value::as_str)
        .ok_or(DecodeError::CoreField("model"))?;
    let action_name = object
        .get("action")
        .and_then(Value::as_str)
        .ok_or(DecodeError::CoreField("action"))?;

    let model = match model_name {
        MODEL_MEET_REQUEST => {
            let payload = object
                .get("meet_request")
                .ok_or_else(|| violation(mode, "meet_request", "missing payload"))?;
            NotificationModel::MeetRequest(decode_meet_request(payload, mode).map_err(|e| {
                nested(mode, "meet_request", e)
            })?)
        }
        MODEL_MESSAGE => {
            let payload = object
                .get("message")
                .ok_or_else(|| violation(mode, "message", "missing payload"))?;
            NotificationModel::Message(
                decode_message(payload, mode).map_err(|e| nested(mode, "message", e))?,
            )
        }
        other => return Err(violation(mode, "model", format!("unexpected model {other}"))),
    };

    let action = NotificationAction::from_str(action_name)
        .ok_or_else(|| violation(mode, "action", format!("unexpected action {action_name}")))?;
    let unread = object
        .get("unread")
        .and_then(Value::as_bool)
        .ok_or_else(|| violation(mode, "unread", "expected a boolean"))?;

    Ok(Notification::new(id, model, action, unread))
}

/// A payload failing its own core checks is still a contract break for the envelope.
fn nested(mode: DecodeMode, field: &str, error: DecodeError) -> DecodeError {
    match error {
        DecodeError::ProtocolViolation { .. } => error,
        other => violation(mode, field, other.to_string()),
    }
}

/// Decodes the `GET /notifications` response.
///
/// Envelopes failing a core check are skipped with a warning; in lenient mode
/// envelopes violating the contract are skipped as well.
pub fn decode_notification_list(
    value: &Value,
    mode: DecodeMode,
) -> Result<Vec<Notification>, DecodeError> {
    let items = value
        .as_array()
        .ok_or_else(|| violation(mode, "notifications", "expected an array"))?;
    let mut notifications = Vec::with_capacity(items.len());
    for item in items {
        match decode_notification(item, mode) {
            Ok(notification) => notifications.push(notification),
            Err(e) if e.is_recoverable() => {
                warn!("Skipping notification envelope: {}", e);
            }
            Err(e) => {
                error!("Skipping notification breaking the server contract: {}", e);
            }
        }
    }
    Ok(notifications)
}

/// Decodes the `GET /messages` response.
pub fn decode_message_list(value: &Value, mode: DecodeMode) -> Result<Vec<Message>, DecodeError> {
    let items = value
        .as_array()
        .ok_or_else(|| violation(mode, "messages", "expected an array"))?;
    let mut messages = Vec::with_capacity(items.len());
    for item in items {
        match decode_message(item, mode) {
            Ok(message) => messages.push(message),
            Err(e) => warn!("Skipping message: {}", e),
        }
    }
    Ok(messages)
}

/// Serializes an envelope to text and decodes it again, exercising the exact
/// path server traffic takes.
pub fn round_trip_notification(
    envelope: &Value,
    mode: DecodeMode,
) -> Result<Notification, DecodeError> {
    let text = envelope.to_string();
    let reparsed: Value = serde_json::from_str(&text)
        .map_err(|e| violation(mode, "notification", e.to_string()))?;
    decode_notification(&reparsed, mode)
}
