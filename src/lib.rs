//! GeoConfess notification synchronization engine.
//!
//! Keeps a local ledger of a user's notifications in sync with the server,
//! derives meet requests and chat messages from it, and fans changes out to
//! observers. Optional bots generate synthetic traffic for testing.

pub mod api;
pub mod bots;
pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod observer;
pub mod polling;
pub mod service;

// Re-export commonly used types for convenience
pub use api::{ApiClient, HttpTransport, Session, StaticToken, Transport};
pub use cache::NotificationCache;
pub use config::SyncSettings;
pub use error::SyncError;
pub use observer::{ChannelObserver, NotificationEvent, NotificationObserver, ObserverId};
pub use service::{NotificationService, NotificationServiceHandle, ServiceStatus};
