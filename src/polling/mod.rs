//! Timer-driven fetch loop with jittered retries.

mod retry_policy;
mod scheduler;

pub use retry_policy::RetryPolicy;
pub use scheduler::{FailureAction, FetchTicket, PollScheduler, PollState};
