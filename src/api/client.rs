//! Typed wrappers over the REST endpoints used by the engine.

use std::sync::Arc;

use serde_json::{json, Value};

use super::session::Session;
use super::transport::{ApiRequest, HttpMethod, Transport};
use crate::error::SyncError;
use crate::model::{MeetReply, ResourceId};

/// Geographic position attached to a new meet request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Client for the notification, message and meet-request endpoints.
///
/// Responses are returned as raw JSON; decoding is left to the caller so it
/// happens on the engine's own task under its decode mode.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    session: Arc<Session>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<Session>) -> Self {
        Self { transport, session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    async fn call(
        &self,
        method: HttpMethod,
        path: String,
        body: Option<Value>,
    ) -> Result<Value, SyncError> {
        let token = self.session.access_token()?;
        let mut request = ApiRequest::new(method, path, token);
        if let Some(body) = body {
            request = request.with_body(body);
        }
        self.transport.execute(request).await
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    /// The user's last 99 notifications no older than one month.
    pub async fn get_notifications(&self) -> Result<Value, SyncError> {
        self.call(HttpMethod::Get, "/notifications".to_string(), None)
            .await
    }

    pub async fn mark_notification_read(&self, id: ResourceId) -> Result<(), SyncError> {
        self.call(HttpMethod::Put, format!("/notifications/{}/mark_read", id), None)
            .await
            .map(|_| ())
    }

    // =========================================================================
    // Messages
    // =========================================================================

    /// Complete chat history of the user.
    pub async fn get_messages(&self) -> Result<Value, SyncError> {
        self.call(HttpMethod::Get, "/messages".to_string(), None).await
    }

    pub async fn send_message(
        &self,
        recipient_id: ResourceId,
        text: &str,
    ) -> Result<Value, SyncError> {
        let body = json!({
            "message": {
                "sender_id": self.session.user_id(),
                "recipient_id": recipient_id,
                "text": text,
            }
        });
        self.call(HttpMethod::Post, "/messages".to_string(), Some(body))
            .await
    }

    // =========================================================================
    // Meet Requests
    // =========================================================================

    pub async fn create_meet_request(
        &self,
        priest_id: ResourceId,
        location: GeoPoint,
    ) -> Result<Value, SyncError> {
        let body = json!({
            "request": {
                "priest_id": priest_id,
                "latitude": location.latitude,
                "longitude": location.longitude,
            }
        });
        self.call(HttpMethod::Post, "/requests".to_string(), Some(body))
            .await
    }

    pub async fn reply_meet_request(
        &self,
        id: ResourceId,
        reply: MeetReply,
    ) -> Result<(), SyncError> {
        self.call(
            HttpMethod::Put,
            format!("/requests/{}/{}", id, reply.as_str()),
            None,
        )
        .await
        .map(|_| ())
    }

    // =========================================================================
    // Recurrences
    // =========================================================================

    pub async fn confirm_availability(&self, recurrence_id: ResourceId) -> Result<(), SyncError> {
        self.call(
            HttpMethod::Put,
            format!("/recurrences/{}/confirm_availability", recurrence_id),
            None,
        )
        .await
        .map(|_| ())
    }
}
