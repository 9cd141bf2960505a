//! Reconciliation cache: the notification ledger and its derived indexes.

mod notification_cache;

pub use notification_cache::{MarkRead, NotificationCache, NotificationDiff, ReadState, ReplyState};
