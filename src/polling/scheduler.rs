//! Poll scheduling state machine.
//!
//! The scheduler never sleeps or spawns anything itself: the owner asks it for
//! the next deadline, calls [`PollScheduler::due`] when that deadline passes,
//! and reports the outcome of every fetch it started. Each start, stop and
//! preemption bumps a generation counter; a fetch completing under an older
//! generation is discarded.

use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;
use tracing::debug;

use super::retry_policy::RetryPolicy;
use crate::error::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Stopped,
    Running,
}

/// Identifies one fetch started by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
}

/// What to do after a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    /// The fetch belonged to an older generation; ignore it.
    Discarded,
    /// Try again after the given delay.
    Retry(Duration),
    /// Polling stopped; the error must reach the user.
    Halted,
}

pub struct PollScheduler {
    state: PollState,
    generation: u64,
    next_fetch_at: Option<Instant>,
    in_flight: Option<FetchTicket>,
    refresh_rate: Duration,
    retry_policy: RetryPolicy,
}

impl PollScheduler {
    pub fn new(refresh_rate: Duration, retry_policy: RetryPolicy) -> Self {
        Self {
            state: PollState::Stopped,
            generation: 0,
            next_fetch_at: None,
            in_flight: None,
            refresh_rate,
            retry_policy,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == PollState::Running
    }

    pub fn refresh_rate(&self) -> Duration {
        self.refresh_rate
    }

    pub fn has_fetch_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Starts polling with an immediate fetch. Returns false if already running.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.is_running() {
            return false;
        }
        self.state = PollState::Running;
        self.reschedule_now(now);
        true
    }

    /// Stops polling. Any pending fetch is cancelled and the result of an
    /// in-flight one will be discarded. Stopping twice is a no-op.
    pub fn stop(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.state = PollState::Stopped;
        self.generation += 1;
        self.next_fetch_at = None;
        self.in_flight = None;
        true
    }

    /// Replaces the pending timer with an immediate fetch, superseding any
    /// fetch in flight. Starts polling if stopped.
    ///
    /// Returns true if a fetch in flight was superseded, so the owner can
    /// cancel it.
    pub fn preempt(&mut self, now: Instant) -> bool {
        let superseded = self.in_flight.is_some();
        self.state = PollState::Running;
        self.reschedule_now(now);
        superseded
    }

    fn reschedule_now(&mut self, now: Instant) {
        self.generation += 1;
        self.in_flight = None;
        self.next_fetch_at = Some(now);
    }

    /// When the owner should next call [`PollScheduler::due`].
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.in_flight.is_some() {
            return None;
        }
        self.next_fetch_at
    }

    /// Hands out a ticket if a fetch is due. At most one ticket is outstanding.
    pub fn due(&mut self, now: Instant) -> Option<FetchTicket> {
        if !self.is_running() || self.in_flight.is_some() {
            return None;
        }
        match self.next_fetch_at {
            Some(at) if at <= now => {
                let ticket = FetchTicket {
                    generation: self.generation,
                };
                self.next_fetch_at = None;
                self.in_flight = Some(ticket);
                Some(ticket)
            }
            _ => None,
        }
    }

    /// True if the result of this fetch should be applied.
    pub fn accepts(&self, ticket: FetchTicket) -> bool {
        self.in_flight == Some(ticket) && ticket.generation == self.generation
    }

    /// Records a successful fetch. Returns the delay until the next one, or
    /// `None` if the result must be discarded.
    pub fn complete_success(&mut self, ticket: FetchTicket, now: Instant) -> Option<Duration> {
        if !self.accepts(ticket) {
            debug!("Discarding stale fetch result");
            return None;
        }
        self.in_flight = None;
        self.next_fetch_at = Some(now + self.refresh_rate);
        Some(self.refresh_rate)
    }

    /// Records a failed fetch and schedules the retry.
    pub fn complete_failure<R: Rng>(
        &mut self,
        ticket: FetchTicket,
        error: &SyncError,
        now: Instant,
        rng: &mut R,
    ) -> FailureAction {
        if !self.accepts(ticket) {
            debug!("Discarding stale fetch failure: {}", error);
            return FailureAction::Discarded;
        }
        self.in_flight = None;
        if !self.retry_policy.should_retry(error) {
            self.stop();
            return FailureAction::Halted;
        }
        let delay = self.retry_policy.backoff(rng);
        self.next_fetch_at = Some(now + delay);
        FailureAction::Retry(delay)
    }
}
