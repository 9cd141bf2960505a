//! REST surface of the GeoConfess server, behind a pluggable transport.

mod client;
mod http;
mod session;
mod transport;

pub use client::{ApiClient, GeoPoint};
pub use http::HttpTransport;
pub use session::{CredentialProvider, Session, StaticToken};
pub use transport::{ApiRequest, HttpMethod, Transport};
