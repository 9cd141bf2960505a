//! Meet requests between a penitent and a priest.

use serde::{Deserialize, Serialize};

use super::ids::ResourceId;
use super::user::{UserInfo, UserRole};

/// Lifecycle of a meet request: `Pending` moves to either terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeetRequestStatus {
    Pending,
    Accepted,
    Refused,
}

impl MeetRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeetRequestStatus::Pending => "pending",
            MeetRequestStatus::Accepted => "accepted",
            MeetRequestStatus::Refused => "refused",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, MeetRequestStatus::Pending)
    }
}

/// A priest's answer to a pending meet request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeetReply {
    Accept,
    Refuse,
}

impl MeetReply {
    /// Path segment of the reply endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            MeetReply::Accept => "accept",
            MeetReply::Refuse => "refuse",
        }
    }

    /// Status the request settles in once the reply is confirmed.
    pub fn target_status(&self) -> MeetRequestStatus {
        match self {
            MeetReply::Accept => MeetRequestStatus::Accepted,
            MeetReply::Refuse => MeetRequestStatus::Refused,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeetRequest {
    pub id: ResourceId,
    pub status: MeetRequestStatus,
    pub penitent: UserInfo,
    pub priest: UserInfo,
}

impl MeetRequest {
    pub fn user_with_role(&self, role: UserRole) -> Option<&UserInfo> {
        match role {
            UserRole::Penitent => Some(&self.penitent),
            UserRole::Priest => Some(&self.priest),
            UserRole::Admin => None,
        }
    }

    /// Role played by `user_id` in this request, if any.
    pub fn role_of(&self, user_id: ResourceId) -> Option<UserRole> {
        if self.penitent.id == user_id {
            Some(UserRole::Penitent)
        } else if self.priest.id == user_id {
            Some(UserRole::Priest)
        } else {
            None
        }
    }

    /// The participant that is not `user_id`.
    pub fn counterpart_of(&self, user_id: ResourceId) -> Option<&UserInfo> {
        match self.role_of(user_id)? {
            UserRole::Penitent => Some(&self.priest),
            UserRole::Priest => Some(&self.penitent),
            UserRole::Admin => None,
        }
    }
}
