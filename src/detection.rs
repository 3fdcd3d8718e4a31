//! Per-frame detection loop state.
//!
//! The loop is a plain state object advanced by the caller's scheduler. It
//! hands out at most one [`FrameTicket`] at a time, so a slow estimator never
//! builds a queue, and every result must be settled against its ticket. A
//! result whose ticket belongs to an older session, or that arrives after
//! `stop()`, is dropped.

use log::{debug, warn};

/// Identifies one run of the loop, from `start()` to `stop()`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Permission to run one estimation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTicket {
    session: SessionId,
    sequence: u64,
}

impl FrameTicket {
    #[must_use]
    pub fn session(&self) -> SessionId {
        self.session
    }

    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// Detection loop state
#[derive(Debug, Default)]
pub struct DetectionLoop {
    generation: u64,
    running: bool,
    sequence: u64,
    in_flight: Option<FrameTicket>,
    stale_dropped: u64,
}

impl DetectionLoop {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new session. Results from earlier sessions become stale.
    pub fn start(&mut self) -> SessionId {
        self.generation += 1;
        self.running = true;
        self.in_flight = None;
        debug!("Detection session {} started", self.generation);
        SessionId(self.generation)
    }

    /// Stop the loop. Any in-flight result will be ignored.
    pub fn stop(&mut self) {
        if self.running {
            debug!("Detection session {} stopped", self.generation);
        }
        self.running = false;
        self.in_flight = None;
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Current session, if running
    #[must_use]
    pub fn session(&self) -> Option<SessionId> {
        self.running.then_some(SessionId(self.generation))
    }

    #[must_use]
    pub fn has_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Number of results dropped as stale so far
    #[must_use]
    pub fn stale_dropped(&self) -> u64 {
        self.stale_dropped
    }

    /// Ask to run one estimation. `None` while stopped or while the previous
    /// estimation has not settled.
    pub fn request_frame(&mut self) -> Option<FrameTicket> {
        if !self.running || self.in_flight.is_some() {
            return None;
        }
        self.sequence += 1;
        let ticket = FrameTicket {
            session: SessionId(self.generation),
            sequence: self.sequence,
        };
        self.in_flight = Some(ticket);
        Some(ticket)
    }

    /// Hand back the result for `ticket`. Returns it only if it may still be
    /// applied to the current session.
    pub fn settle<T>(&mut self, ticket: FrameTicket, result: T) -> Option<T> {
        if self.running && self.in_flight == Some(ticket) {
            self.in_flight = None;
            return Some(result);
        }
        self.stale_dropped += 1;
        warn!(
            "Dropping stale detection result (session {}, frame {})",
            ticket.session.0, ticket.sequence
        );
        None
    }
}
