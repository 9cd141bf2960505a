//! In-memory notification ledger and the indexes derived from it.
//!
//! The cache is owned by a single task; nothing in here locks. Every mutation
//! that changes what observers can see is followed by the matching callback.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::SyncError;
use crate::model::{
    sort_chronologically, MeetReply, MeetRequest, MeetRequestStatus, Message, Notification,
    NotificationModel, NotificationSequence, ResourceId, UserInfo,
};
use crate::observer::{NotificationObserver, ObserverSet};

/// Read state of a cached notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    Unread,
    /// Marked read locally, server confirmation in flight.
    Confirming,
    Read,
}

/// Status of a cached meet request, including an in-flight reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyState {
    Settled(MeetRequestStatus),
    /// A reply was sent and the server has not answered yet.
    Provisional {
        previous: MeetRequestStatus,
        requested: MeetReply,
    },
}

/// How a mark-as-read request must proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkRead {
    /// Nothing to do.
    AlreadyRead,
    /// Synthetic notification, marked read without a server round trip.
    Local,
    /// Marked read optimistically; confirm or roll back once the server answers.
    Remote,
}

/// Result of a notification set replacement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationDiff {
    pub inserted: Vec<Notification>,
    pub deleted: Vec<Notification>,
}

impl NotificationDiff {
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.deleted.is_empty()
    }
}

/// A derived value and the id of the notification that introduced it.
///
/// Values inserted directly from an API response have no source and are
/// superseded by any notification about the same object.
#[derive(Debug, Clone)]
struct Derived<T> {
    value: T,
    source: Option<ResourceId>,
}

impl<T> Derived<T> {
    fn superseded_by(&self, source: ResourceId) -> bool {
        self.source.map_or(true, |current| source >= current)
    }
}

/// A reply in flight and the notification the provisional status replaced.
#[derive(Debug, Clone, Copy)]
struct PendingReply {
    previous: MeetRequestStatus,
    requested: MeetReply,
    source: Option<ResourceId>,
}

pub struct NotificationCache {
    /// Always sorted by id.
    notifications: Vec<Notification>,
    meet_requests: HashMap<ResourceId, Derived<MeetRequest>>,
    messages: BTreeMap<ResourceId, Derived<Message>>,
    /// Every notification id ever handed to observers. Never shrinks during a
    /// session; only a configuration reset clears it.
    returned_ids: HashSet<ResourceId>,
    synthetic_queue: Vec<Notification>,
    synthetic_ids: HashSet<ResourceId>,
    pending_reads: HashSet<ResourceId>,
    pending_replies: HashMap<ResourceId, PendingReply>,
    observers: Arc<ObserverSet<dyn NotificationObserver>>,
}

impl NotificationCache {
    pub fn new(observers: Arc<ObserverSet<dyn NotificationObserver>>) -> Self {
        Self {
            notifications: Vec::new(),
            meet_requests: HashMap::new(),
            messages: BTreeMap::new(),
            returned_ids: HashSet::new(),
            synthetic_queue: Vec::new(),
            synthetic_ids: HashSet::new(),
            pending_reads: HashSet::new(),
            pending_replies: HashMap::new(),
            observers,
        }
    }

    // =========================================================================
    // Notification set
    // =========================================================================

    /// Replaces the notification list, updating the derived indexes from the
    /// inserted notifications and notifying observers of the difference.
    ///
    /// Additions are delivered before deletions, each only when non-empty.
    pub fn replace_notification_set(&mut self, new: Vec<Notification>) -> NotificationDiff {
        let mut next: Vec<Notification> = Vec::with_capacity(new.len());
        {
            let mut seen: HashSet<&Notification> = HashSet::with_capacity(new.len());
            for notification in &new {
                if seen.insert(notification) {
                    next.push(notification.clone());
                }
            }
        }
        sort_chronologically(&mut next);

        let diff = {
            let old: HashSet<&Notification> = self.notifications.iter().collect();
            let current: HashSet<&Notification> = next.iter().collect();
            let inserted: Vec<Notification> = next
                .iter()
                .filter(|n| !old.contains(n))
                .cloned()
                .collect();
            let deleted: Vec<Notification> = self
                .notifications
                .iter()
                .filter(|n| !current.contains(n))
                .cloned()
                .collect();
            NotificationDiff { inserted, deleted }
        };

        self.notifications = next;
        self.update_meet_requests(&diff.inserted);
        let added_messages = self.update_messages(&diff.inserted);

        if !diff.inserted.is_empty() {
            self.observers
                .notify(|o| o.did_add_notifications(&diff.inserted));
        }
        if !diff.deleted.is_empty() {
            self.observers
                .notify(|o| o.did_delete_notifications(&diff.deleted));
        }
        if !added_messages.is_empty() {
            self.observers.notify(|o| o.did_add_messages(&added_messages));
        }
        diff
    }

    /// Appends notifications to the current list.
    pub fn append_notifications(&mut self, new: Vec<Notification>) -> NotificationDiff {
        let mut next = self.notifications.clone();
        next.extend(new);
        self.replace_notification_set(next)
    }

    /// Keeps only notifications never returned before and remembers their ids.
    pub fn filter_new(&mut self, candidates: Vec<Notification>) -> Vec<Notification> {
        candidates
            .into_iter()
            .filter(|n| self.returned_ids.insert(n.id))
            .collect()
    }

    /// Queues a synthetic notification for the next successful fetch.
    pub fn queue_synthetic(&mut self, notification: Notification) {
        self.synthetic_ids.insert(notification.id);
        self.synthetic_queue.push(notification);
    }

    pub fn pending_synthetic(&self) -> usize {
        self.synthetic_queue.len()
    }

    pub fn is_synthetic(&self, id: ResourceId) -> bool {
        self.synthetic_ids.contains(&id)
    }

    /// Merges a successfully fetched server window.
    ///
    /// Only notifications never returned before are added, together with the
    /// queued synthetic ones. Server notifications that fell out of the window
    /// are evicted. Returns the resulting diff.
    pub fn merge_fetched(&mut self, window: Vec<Notification>) -> NotificationDiff {
        let window_ids: HashSet<ResourceId> = window.iter().map(|n| n.id).collect();
        let synthetic = std::mem::take(&mut self.synthetic_queue);

        let mut candidates = window;
        candidates.extend(synthetic);
        let fresh = self.filter_new(candidates);

        let mut next: Vec<Notification> = self
            .notifications
            .iter()
            .filter(|n| window_ids.contains(&n.id) || self.synthetic_ids.contains(&n.id))
            .cloned()
            .collect();
        let evicted = self.notifications.len() - next.len();
        if evicted > 0 {
            debug!("Evicting {} notifications outside the server window", evicted);
        }
        next.extend(fresh);
        self.replace_notification_set(next)
    }

    fn update_meet_requests(&mut self, inserted: &[Notification]) {
        let mut latest: HashMap<ResourceId, (ResourceId, &MeetRequest)> = HashMap::new();
        for notification in inserted.iter().rev() {
            if let NotificationModel::MeetRequest(meet_request) = &notification.model {
                latest
                    .entry(meet_request.id)
                    .or_insert((notification.id, meet_request));
            }
        }
        for (id, (source, meet_request)) in latest {
            match self.meet_requests.get(&id) {
                Some(current) if !current.superseded_by(source) => {}
                _ => {
                    self.meet_requests.insert(
                        id,
                        Derived {
                            value: meet_request.clone(),
                            source: Some(source),
                        },
                    );
                }
            }
        }
    }

    /// Returns the messages that were new or changed.
    fn update_messages(&mut self, inserted: &[Notification]) -> Vec<Message> {
        let mut latest: HashMap<ResourceId, (ResourceId, &Message)> = HashMap::new();
        for notification in inserted.iter().rev() {
            if let NotificationModel::Message(message) = &notification.model {
                latest
                    .entry(message.id)
                    .or_insert((notification.id, message));
            }
        }
        let mut added = Vec::new();
        for (id, (source, message)) in latest {
            match self.messages.get(&id) {
                Some(current) if !current.superseded_by(source) => {}
                Some(current) if current.value == *message => {}
                _ => {
                    self.messages.insert(
                        id,
                        Derived {
                            value: message.clone(),
                            source: Some(source),
                        },
                    );
                    added.push(message.clone());
                }
            }
        }
        added.sort();
        added
    }

    // =========================================================================
    // Read state
    // =========================================================================

    /// First phase of mark-as-read: flips `unread` locally.
    pub fn begin_mark_read(&mut self, id: ResourceId) -> Result<MarkRead, SyncError> {
        if self.pending_reads.contains(&id) {
            return Err(SyncError::InvalidState(format!(
                "notification {} is already being marked as read",
                id
            )));
        }
        let synthetic = self.synthetic_ids.contains(&id);
        let notification = self
            .notification_mut(id)
            .ok_or_else(|| SyncError::NotFound(format!("notification {}", id)))?;
        if !notification.unread {
            return Ok(MarkRead::AlreadyRead);
        }
        notification.unread = false;
        if synthetic {
            return Ok(MarkRead::Local);
        }
        self.pending_reads.insert(id);
        Ok(MarkRead::Remote)
    }

    pub fn confirm_read(&mut self, id: ResourceId) {
        self.pending_reads.remove(&id);
    }

    /// Restores `unread` after the server refused the mark-as-read.
    pub fn rollback_read(&mut self, id: ResourceId) {
        if !self.pending_reads.remove(&id) {
            return;
        }
        if let Some(notification) = self.notification_mut(id) {
            notification.unread = true;
        }
    }

    pub fn read_state(&self, id: ResourceId) -> Option<ReadState> {
        let notification = self.notification(id)?;
        Some(if self.pending_reads.contains(&id) {
            ReadState::Confirming
        } else if notification.unread {
            ReadState::Unread
        } else {
            ReadState::Read
        })
    }

    // =========================================================================
    // Meet requests
    // =========================================================================

    /// First phase of a reply: sets the requested status provisionally.
    pub fn begin_reply(&mut self, id: ResourceId, reply: MeetReply) -> Result<(), SyncError> {
        if self.pending_replies.contains_key(&id) {
            return Err(SyncError::InvalidState(format!(
                "meet request {} already has a reply in flight",
                id
            )));
        }
        let entry = self
            .meet_requests
            .get_mut(&id)
            .ok_or_else(|| SyncError::NotFound(format!("meet request {}", id)))?;
        let previous = entry.value.status;
        if previous != MeetRequestStatus::Pending {
            return Err(SyncError::InvalidState(format!(
                "meet request {} is already {}",
                id,
                previous.as_str()
            )));
        }
        entry.value.status = reply.target_status();
        let pending = PendingReply {
            previous,
            requested: reply,
            source: entry.source,
        };
        self.pending_replies.insert(id, pending);
        Ok(())
    }

    pub fn settle_reply(&mut self, id: ResourceId) -> Option<MeetRequest> {
        self.pending_replies.remove(&id);
        self.meet_request(id).cloned()
    }

    /// Restores the status a meet request had before the failed reply.
    ///
    /// A notification about the request merged meanwhile replaced the
    /// provisional entry and is kept as is.
    pub fn rollback_reply(&mut self, id: ResourceId) {
        let Some(pending) = self.pending_replies.remove(&id) else {
            return;
        };
        match self.meet_requests.get_mut(&id) {
            Some(entry) if entry.source == pending.source => {
                entry.value.status = pending.previous;
            }
            Some(entry) => debug!(
                "Meet request {} updated to {} while the reply was in flight",
                id,
                entry.value.status.as_str()
            ),
            None => {}
        }
    }

    pub fn reply_state(&self, id: ResourceId) -> Option<ReplyState> {
        let meet_request = self.meet_request(id)?;
        Some(match self.pending_replies.get(&id) {
            Some(pending) => ReplyState::Provisional {
                previous: pending.previous,
                requested: pending.requested,
            },
            None => ReplyState::Settled(meet_request.status),
        })
    }

    /// Caches a meet request returned by the server outside of a notification.
    pub fn insert_meet_request(&mut self, meet_request: MeetRequest) {
        if let Some(current) = self.meet_requests.get(&meet_request.id) {
            warn!(
                "Meet request {} already cached as {}",
                meet_request.id,
                current.value.status.as_str()
            );
            if current.source.is_some() {
                return;
            }
        }
        self.meet_requests.insert(
            meet_request.id,
            Derived {
                value: meet_request,
                source: None,
            },
        );
    }

    // =========================================================================
    // Messages
    // =========================================================================

    /// Caches a message the user just sent. Returns false if it was known.
    pub fn insert_sent_message(&mut self, message: Message) -> bool {
        if let Some(current) = self.messages.get(&message.id) {
            if current.value != message {
                warn!("Sent message {} differs from the cached one", message.id);
            }
            return false;
        }
        self.messages.insert(
            message.id,
            Derived {
                value: message.clone(),
                source: None,
            },
        );
        self.observers.notify(|o| o.did_add_messages(std::slice::from_ref(&message)));
        true
    }

    /// Merges the downloaded chat history. Returns the messages that were new.
    pub fn merge_message_history(&mut self, history: Vec<Message>) -> Vec<Message> {
        let mut added = Vec::new();
        for message in history {
            match self.messages.get(&message.id) {
                Some(current) => {
                    if current.value != message {
                        warn!(
                            "Cached message {} differs from the downloaded history",
                            message.id
                        );
                    }
                }
                None => {
                    self.messages.insert(
                        message.id,
                        Derived {
                            value: message.clone(),
                            source: None,
                        },
                    );
                    added.push(message);
                }
            }
        }
        added.sort();
        if !added.is_empty() {
            self.observers.notify(|o| o.did_add_messages(&added));
        }
        added
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// All cached notifications, sorted by id.
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn notification(&self, id: ResourceId) -> Option<&Notification> {
        self.notifications
            .binary_search_by_key(&id, |n| n.id)
            .ok()
            .map(|index| &self.notifications[index])
    }

    fn notification_mut(&mut self, id: ResourceId) -> Option<&mut Notification> {
        self.notifications
            .binary_search_by_key(&id, |n| n.id)
            .ok()
            .map(|index| &mut self.notifications[index])
    }

    /// The latest notification per notifiable object, sorted by id.
    pub fn user_level_notifications(&self) -> Vec<Notification> {
        self.notifications.latest_per_object()
    }

    pub fn meet_request(&self, id: ResourceId) -> Option<&MeetRequest> {
        self.meet_requests.get(&id).map(|entry| &entry.value)
    }

    /// All cached meet requests, sorted by id.
    pub fn meet_requests(&self) -> Vec<MeetRequest> {
        let mut meet_requests: Vec<MeetRequest> = self
            .meet_requests
            .values()
            .map(|entry| entry.value.clone())
            .collect();
        meet_requests.sort_by_key(|m| m.id);
        meet_requests
    }

    pub fn message(&self, id: ResourceId) -> Option<&Message> {
        self.messages.get(&id).map(|entry| &entry.value)
    }

    /// All cached messages, sorted by id.
    pub fn messages(&self) -> Vec<Message> {
        self.messages
            .values()
            .map(|entry| entry.value.clone())
            .collect()
    }

    /// The newest meet request addressed to the given priest.
    pub fn meet_request_for_priest(&self, priest_id: ResourceId) -> Option<&MeetRequest> {
        self.meet_requests
            .values()
            .map(|entry| &entry.value)
            .filter(|m| m.priest.id == priest_id)
            .max_by_key(|m| m.id)
    }

    pub fn latest_notification_about(&self, meet_request_id: ResourceId) -> Option<&Notification> {
        self.notifications
            .iter()
            .rev()
            .find(|n| n.meet_request().is_some_and(|m| m.id == meet_request_id))
    }

    /// Finds a user among the participants of the cached meet requests.
    pub fn user_from_id(&self, user_id: ResourceId) -> Option<&UserInfo> {
        self.meet_requests
            .values()
            .flat_map(|entry| [&entry.value.penitent, &entry.value.priest])
            .find(|user| user.id == user_id)
    }

    pub fn returned_count(&self) -> usize {
        self.returned_ids.len()
    }

    // =========================================================================
    // Reset
    // =========================================================================

    /// Drops every cached value, notifying observers of the removed notifications.
    pub fn reset(&mut self) {
        let removed = std::mem::take(&mut self.notifications);
        self.meet_requests.clear();
        self.messages.clear();
        self.returned_ids.clear();
        self.synthetic_queue.clear();
        self.synthetic_ids.clear();
        self.pending_reads.clear();
        self.pending_replies.clear();
        if !removed.is_empty() {
            self.observers.notify(|o| o.did_delete_notifications(&removed));
        }
    }
}
