//! A penitent asking the current priest for a meeting.

use rand::rngs::StdRng;
use rand::Rng;
use serde_json::json;

use super::bot::{bot_user, meet_request_event, meet_request_json, UserBot};
use super::ids::SyntheticIds;
use crate::model::{
    DecodeMode, MeetRequestStatus, Notification, NotificationAction, ResourceId, UserInfo,
    UserRole,
};

pub struct PenitentBot {
    user: UserInfo,
    priest_id: ResourceId,
    meet_request_id: ResourceId,
    status: Option<MeetRequestStatus>,
}

impl PenitentBot {
    /// Creates a bot that will ask the given priest for a meeting.
    pub fn new(priest_id: ResourceId, ids: &mut SyntheticIds) -> Self {
        let meet_request_id = ids.next_meet_request_id();
        Self {
            user: bot_user(UserRole::Penitent, ids),
            priest_id,
            meet_request_id,
            status: None,
        }
    }
}

impl UserBot for PenitentBot {
    fn next_notification(
        &mut self,
        ids: &mut SyntheticIds,
        rng: &mut StdRng,
        mode: DecodeMode,
    ) -> Option<Notification> {
        let (status, action) = match self.status {
            None => (MeetRequestStatus::Pending, NotificationAction::Sent),
            Some(MeetRequestStatus::Pending) => {
                if rng.random_bool(0.5) {
                    (MeetRequestStatus::Accepted, NotificationAction::Accepted)
                } else {
                    (MeetRequestStatus::Refused, NotificationAction::Refused)
                }
            }
            Some(MeetRequestStatus::Accepted) | Some(MeetRequestStatus::Refused) => return None,
        };
        self.status = Some(status);
        let meet_request = meet_request_json(
            self.meet_request_id,
            json!(self.user),
            json!({ "id": self.priest_id }),
            status,
        );
        meet_request_event(ids, action, meet_request, mode)
    }

    fn user(&self) -> &UserInfo {
        &self.user
    }
}
