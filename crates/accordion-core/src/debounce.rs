#![forbid(unsafe_code)]

//! Single-slot debounce.
//!
//! A [`Debouncer`] holds at most one pending deadline. Every
//! [`notify`](Debouncer::notify) pushes the deadline out to `now + quiet`, so
//! a burst of notifications fires exactly once, `quiet` after the last one.
//!
//! # Invariants
//!
//! 1. At most one deadline is armed.
//! 2. [`poll`](Debouncer::poll) fires only when `now >= deadline`, and disarms.
//! 3. [`cancel`](Debouncer::cancel) disarms without firing.

use core::time::Duration;

/// Single-slot, host-clocked debounce timer.
#[derive(Debug, Clone)]
pub struct Debouncer {
    quiet: Duration,
    deadline: Option<Duration>,
    coalesced: u32,
}

impl Debouncer {
    /// Create an idle debouncer with the given quiet interval.
    #[must_use]
    pub const fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
            coalesced: 0,
        }
    }

    /// Quiet interval.
    #[must_use]
    pub const fn quiet(&self) -> Duration {
        self.quiet
    }

    /// Record an occurrence at `now`, re-arming the deadline.
    pub fn notify(&mut self, now: Duration) {
        self.deadline = Some(now.saturating_add(self.quiet));
        self.coalesced = self.coalesced.saturating_add(1);
    }

    /// Whether a deadline is armed.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Armed deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Fire if due.
    ///
    /// Returns the number of notifications coalesced into this firing, or
    /// `None` if nothing is due.
    pub fn poll(&mut self, now: Duration) -> Option<u32> {
        let deadline = self.deadline?;
        if now < deadline {
            return None;
        }
        self.deadline = None;
        Some(std::mem::take(&mut self.coalesced))
    }

    /// Disarm without firing.
    pub fn cancel(&mut self) {
        self.deadline = None;
        self.coalesced = 0;
    }
}
