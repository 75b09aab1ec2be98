//! Probing module: per-URL fetching, bounded dispatch, run coordination
//!
//! - `fetcher` issues the HEAD / ranged-GET probes
//! - `scheduler` drives the bounded in-flight set
//! - `coordinator` owns the run lifecycle and talks to the front end

mod coordinator;
mod fetcher;
mod scheduler;

pub use coordinator::{Coordinator, RunRequest, RunSummary};
pub use fetcher::{build_http_client, probe_url, ProbeOutcome, ProbeStatus};
pub use scheduler::{format_eta, FetchScheduler, ProbeResult, SchedulerOutcome, UrlTask};

use crate::config::Config;
use crate::events::RunEvents;
use crate::GaugeError;
use std::sync::Arc;

/// Runs a complete audit: one call from input file to persisted report.
///
/// Convenience wrapper over [`Coordinator`] for front ends that do not need
/// a cancellation handle.
pub async fn run_audit(
    config: Config,
    events: Arc<dyn RunEvents>,
    request: RunRequest,
) -> Result<RunSummary, GaugeError> {
    let coordinator = Coordinator::new(config, events)?;
    coordinator.run(request).await
}
