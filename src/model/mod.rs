//! Domain entities: notifications and the meet requests and messages they carry.

mod availability;
pub mod codec;
mod ids;
mod meet_request;
mod message;
mod notification;
mod user;

pub use availability::PriestAvailabilityNotification;
pub use codec::{DecodeError, DecodeMode};
pub use ids::{ResourceId, Timestamp};
pub use meet_request::{MeetReply, MeetRequest, MeetRequestStatus};
pub use message::Message;
pub use notification::{
    sort_chronologically, NotifiableKey, Notification, NotificationAction, NotificationModel,
    NotificationSequence,
};
pub use user::{UserInfo, UserRole};
