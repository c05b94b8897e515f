//! Trailing-edge debounce for editor signals.
//!
//! The scheduler owns no timer itself; its owner sleeps until [`DebounceScheduler::deadline`]
//! and then calls [`DebounceScheduler::poll_ready`]. Keeping the clock outside makes the
//! coalescing rules testable without a runtime.

use std::time::Duration;

use tokio::time::Instant;

/// Coalesces bursts of values into at most one emission per quiet period.
#[derive(Debug)]
pub struct DebounceScheduler<T> {
    window: Duration,
    pending: Option<Pending<T>>,
    mounted: bool,
    torn_down: bool,
}

#[derive(Debug)]
struct Pending<T> {
    value: T,
    deadline: Instant,
}

impl<T> DebounceScheduler<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
            mounted: false,
            torn_down: false,
        }
    }

    /// First emission on mount, bypassing the window. Later calls return `None`.
    pub fn mount(&mut self, initial: T) -> Option<T> {
        if self.mounted || self.torn_down {
            return None;
        }
        self.mounted = true;
        Some(initial)
    }

    /// Record a signal; replaces any pending value and restarts the window.
    pub fn signal(&mut self, value: T, now: Instant) {
        if self.torn_down {
            return;
        }
        self.pending = Some(Pending {
            value,
            deadline: now + self.window,
        });
    }

    /// When the pending value becomes due, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Take the pending value if its window has elapsed.
    pub fn poll_ready(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some(pending) if pending.deadline <= now => self.pending.take().map(|p| p.value),
            _ => None,
        }
    }

    /// Drop the pending value and refuse all further signals.
    pub fn teardown(&mut self) {
        self.pending = None;
        self.torn_down = true;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
