//! A priest answering the meet request of the current penitent, then chatting.

use rand::rngs::StdRng;
use rand::Rng;
use serde_json::json;

use super::bot::{
    bot_user, meet_request_event, meet_request_json, message_event, message_json, UserBot,
};
use super::ids::SyntheticIds;
use crate::model::{
    DecodeMode, MeetRequestStatus, Notification, NotificationAction, ResourceId, UserInfo,
    UserRole,
};

/// Chance, per step, that an accepted conversation ends.
const CHAT_STOP_PROBABILITY: f64 = 0.20;

/// Hard cap on the messages one bot sends.
pub const MAX_CHAT_MESSAGES: u32 = 50;

pub struct PriestBot {
    user: UserInfo,
    penitent_id: ResourceId,
    meet_request_id: ResourceId,
    status: Option<MeetRequestStatus>,
    message_count: u32,
}

impl PriestBot {
    /// Creates a bot that will meet with the given penitent.
    pub fn new(penitent_id: ResourceId, ids: &mut SyntheticIds) -> Self {
        let meet_request_id = ids.next_meet_request_id();
        Self {
            user: bot_user(UserRole::Priest, ids),
            penitent_id,
            meet_request_id,
            status: None,
            message_count: 0,
        }
    }

    pub fn status(&self) -> Option<MeetRequestStatus> {
        self.status
    }

    fn meet_request_event(
        &self,
        ids: &mut SyntheticIds,
        action: NotificationAction,
        status: MeetRequestStatus,
        mode: DecodeMode,
    ) -> Option<Notification> {
        let meet_request = meet_request_json(
            self.meet_request_id,
            json!({ "id": self.penitent_id }),
            json!(self.user),
            status,
        );
        meet_request_event(ids, action, meet_request, mode)
    }
}

impl UserBot for PriestBot {
    fn next_notification(
        &mut self,
        ids: &mut SyntheticIds,
        rng: &mut StdRng,
        mode: DecodeMode,
    ) -> Option<Notification> {
        match self.status {
            None => {
                self.status = Some(MeetRequestStatus::Pending);
                self.meet_request_event(
                    ids,
                    NotificationAction::Sent,
                    MeetRequestStatus::Pending,
                    mode,
                )
            }
            Some(MeetRequestStatus::Pending) => {
                let (status, action) = if rng.random_bool(0.5) {
                    (MeetRequestStatus::Accepted, NotificationAction::Accepted)
                } else {
                    (MeetRequestStatus::Refused, NotificationAction::Refused)
                };
                self.status = Some(status);
                self.meet_request_event(ids, action, status, mode)
            }
            Some(MeetRequestStatus::Accepted) => {
                if self.message_count >= MAX_CHAT_MESSAGES
                    || rng.random::<f64>() < CHAT_STOP_PROBABILITY
                {
                    return None;
                }
                let text = format!("Priest says hello ({})", self.message_count);
                self.message_count += 1;
                let message = message_json(ids, self.user.id, self.penitent_id, &text);
                message_event(ids, NotificationAction::Received, message, mode)
            }
            Some(MeetRequestStatus::Refused) => None,
        }
    }

    fn user(&self) -> &UserInfo {
        &self.user
    }
}
