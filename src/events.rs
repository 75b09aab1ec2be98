//! Front-end callback interface
//!
//! The audit core never renders anything itself. A front end (the bundled CLI,
//! or an embedding application) implements `RunEvents` and receives progress,
//! connectivity transitions, and reconnect prompts through it. All methods
//! have no-op defaults so implementors only override what they display.

/// Answer to a reconnect prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Probe again and keep the run paused until connectivity returns.
    Retry,
    /// Give up: cancel the whole run.
    Cancel,
}

/// Callbacks emitted over the life of a run.
///
/// `on_reconnect_decision_needed` may block (it typically waits on a human);
/// the coordinator invokes it from a blocking thread, never from the
/// scheduler's dispatch loop.
pub trait RunEvents: Send + Sync {
    /// Called after completions, throttled to at most once per progress
    /// interval plus always on the final completion.
    fn on_progress(&self, completed: usize, total: usize, eta: &str) {
        let _ = (completed, total, eta);
    }

    /// Connectivity was lost; dispatch is paused.
    fn on_connectivity_waiting(&self) {}

    /// Connectivity came back; dispatch resumes.
    fn on_connectivity_restored(&self) {}

    /// Automatic reconnection gave up. Blocks until the caller decides.
    fn on_reconnect_decision_needed(&self) -> ReconnectDecision {
        ReconnectDecision::Cancel
    }

    /// The run is over; the report (if any) has been persisted.
    fn on_run_finished(&self, processed: usize, total: usize, cancelled: bool) {
        let _ = (processed, total, cancelled);
    }
}

/// A sink that ignores every event. Useful in tests and headless embeddings.
#[derive(Debug, Default)]
pub struct NullEvents;

impl RunEvents for NullEvents {}
