//! Common test infrastructure
//!
//! The service under test talks to a [`ScriptedTransport`] instead of a real
//! server; tests script responses per route and observe callbacks through a
//! channel.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{test_settings, ScriptedTransport, TestService};
//!
//! #[tokio::test(start_paused = true)]
//! async fn test_first_fetch() {
//!     let transport = ScriptedTransport::new();
//!     let mut service = TestService::spawn(test_settings(), transport);
//!     service.handle.start().await.unwrap();
//! }
//! ```

mod constants;
mod fixtures;
mod service;
mod transport;

#[allow(unused_imports)]
pub use constants::*;
#[allow(unused_imports)]
pub use fixtures::*;
pub use service::TestService;
pub use transport::ScriptedTransport;
