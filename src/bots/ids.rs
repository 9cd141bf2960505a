//! Id allocation for synthetic entities.

use crate::model::ResourceId;

/// Hands out ids for everything the bots fabricate.
///
/// Each entity kind has its own counter, all starting at the same base so
/// synthetic ids are easy to tell apart from server ones in logs.
#[derive(Debug, Clone)]
pub struct SyntheticIds {
    next_bot_key: u64,
    next_user: u64,
    next_meet_request: u64,
    next_message: u64,
    next_notification: u64,
}

impl SyntheticIds {
    pub fn new(base: u64) -> Self {
        Self {
            next_bot_key: 0,
            next_user: base,
            next_meet_request: base,
            next_message: base,
            next_notification: base,
        }
    }

    /// Sequence number used in bot names.
    pub fn next_bot_key(&mut self) -> u64 {
        bump(&mut self.next_bot_key)
    }

    pub fn next_user_id(&mut self) -> ResourceId {
        ResourceId(bump(&mut self.next_user))
    }

    pub fn next_meet_request_id(&mut self) -> ResourceId {
        ResourceId(bump(&mut self.next_meet_request))
    }

    pub fn next_message_id(&mut self) -> ResourceId {
        ResourceId(bump(&mut self.next_message))
    }

    pub fn next_notification_id(&mut self) -> ResourceId {
        ResourceId(bump(&mut self.next_notification))
    }
}

fn bump(counter: &mut u64) -> u64 {
    let value = *counter;
    *counter += 1;
    value
}
