//! Shared run signals
//!
//! A single `RunSignals` instance is created per run and passed explicitly to
//! every component that needs it. `cancelled` is set by the coordinator (or by
//! the network monitor on a user cancel decision) and never unset within a
//! run; `paused` is written only by the network monitor and read by the
//! scheduler.

use std::sync::atomic::{AtomicBool, Ordering};

/// Cancellation and pause flags shared across a run.
#[derive(Debug, Default)]
pub struct RunSignals {
    cancelled: AtomicBool,
    paused: AtomicBool,
}

impl RunSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent; the flag is never cleared.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Sets the pause flag. Only the network monitor writes this.
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}
