//! Callbacks delivered by the notification service to its listeners.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::model::{Message, Notification, PriestAvailabilityNotification};

/// Listener interested in notification traffic.
///
/// Every method has an empty default so implementors only override the
/// callbacks they care about. Callbacks run on the service task and must not
/// block.
pub trait NotificationObserver: Send + Sync {
    /// New notifications, sorted by id.
    fn did_add_notifications(&self, _notifications: &[Notification]) {}

    /// Notifications evicted from the server window, sorted by id.
    fn did_delete_notifications(&self, _notifications: &[Notification]) {}

    /// Messages not previously known, sorted by id.
    fn did_add_messages(&self, _messages: &[Message]) {}

    fn did_receive_push_notification(&self, _notification: &Notification) {}

    fn did_receive_priest_availability(&self, _notice: &PriestAvailabilityNotification) {}
}

/// Owned form of every observer callback.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationEvent {
    NotificationsAdded(Vec<Notification>),
    NotificationsDeleted(Vec<Notification>),
    MessagesAdded(Vec<Message>),
    PushNotification(Notification),
    PriestAvailability(PriestAvailabilityNotification),
}

/// Forwards every callback into an unbounded channel.
///
/// Useful for consumers that prefer to `await` events rather than implement
/// the callback trait.
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<NotificationEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<NotificationEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }

    fn emit(&self, event: NotificationEvent) {
        // Receiver gone means nobody is listening anymore.
        let _ = self.tx.send(event);
    }
}

impl NotificationObserver for ChannelObserver {
    fn did_add_notifications(&self, notifications: &[Notification]) {
        self.emit(NotificationEvent::NotificationsAdded(notifications.to_vec()));
    }

    fn did_delete_notifications(&self, notifications: &[Notification]) {
        self.emit(NotificationEvent::NotificationsDeleted(
            notifications.to_vec(),
        ));
    }

    fn did_add_messages(&self, messages: &[Message]) {
        self.emit(NotificationEvent::MessagesAdded(messages.to_vec()));
    }

    fn did_receive_push_notification(&self, notification: &Notification) {
        self.emit(NotificationEvent::PushNotification(notification.clone()));
    }

    fn did_receive_priest_availability(&self, notice: &PriestAvailabilityNotification) {
        self.emit(NotificationEvent::PriestAvailability(notice.clone()));
    }
}
