//! Observer dispatch: weakly-held listeners with explicit registration handles.

mod events;
mod registry;

pub use events::{ChannelObserver, NotificationEvent, NotificationObserver};
pub use registry::{ObserverId, ObserverSet};
