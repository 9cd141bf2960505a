//! Chat messages between users.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::ids::{ResourceId, Timestamp};

/// An immutable chat record. Ordered by id, i.e. chronologically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    pub id: ResourceId,
    pub sender_id: ResourceId,
    pub recipient_id: ResourceId,
    pub text: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Message {
    /// The other party of the conversation, seen from `user_id`.
    pub fn counterpart_of(&self, user_id: ResourceId) -> ResourceId {
        if self.sender_id == user_id {
            self.recipient_id
        } else {
            self.sender_id
        }
    }
}

impl PartialOrd for Message {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Message {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id
            .cmp(&other.id)
            .then_with(|| self.created_at.cmp(&other.created_at))
            .then_with(|| self.updated_at.cmp(&other.updated_at))
            .then_with(|| self.sender_id.cmp(&other.sender_id))
            .then_with(|| self.recipient_id.cmp(&other.recipient_id))
            .then_with(|| self.text.cmp(&other.text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_message(id: u64, sender: u64, recipient: u64) -> Message {
        let now = Timestamp::parse_wire("2016-06-14T10:00:00.000+0000").unwrap();
        Message {
            id: ResourceId(id),
            sender_id: ResourceId(sender),
            recipient_id: ResourceId(recipient),
            text: "Hello".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_messages_sort_by_id() {
        let mut messages = vec![make_message(3, 1, 2), make_message(1, 2, 1)];
        messages.sort();
        assert_eq!(messages[0].id, ResourceId(1));
    }

    #[test]
    fn test_counterpart() {
        let message = make_message(1, 10, 20);
        assert_eq!(message.counterpart_of(ResourceId(10)), ResourceId(20));
        assert_eq!(message.counterpart_of(ResourceId(20)), ResourceId(10));
    }

    #[test]
    fn test_message_wire_fields() {
        let json = serde_json::to_value(make_message(1, 10, 20)).unwrap();
        assert_eq!(json["sender_id"], 10);
        assert_eq!(json["recipient_id"], 20);
        assert_eq!(json["created_at"], "2016-06-14T10:00:00.000+0000");
    }
}
