//! Shared constants for end-to-end tests

// ============================================================================
// Session
// ============================================================================

/// API root handed to the service. Never contacted: requests go to the
/// scripted transport.
pub const TEST_SERVER_URL: &str = "http://geoconfess.test/api/v1";

pub const TEST_ACCESS_TOKEN: &str = "test-access-token";

/// Id of the logged-in user
pub const USER_ID: u64 = 10;

/// Counterpart of every scripted conversation
pub const OTHER_USER_ID: u64 = 20;

// ============================================================================
// Routes
// ============================================================================

pub const NOTIFICATIONS_PATH: &str = "/notifications";
pub const MESSAGES_PATH: &str = "/messages";
pub const MEET_REQUESTS_PATH: &str = "/requests";

// ============================================================================
// Timing
// ============================================================================

/// Upper bound on how long (in virtual time) a test waits for an event.
pub const EVENT_TIMEOUT_SECS: u64 = 300;

/// Seed for the service random source.
pub const TEST_SEED: u64 = 7;
