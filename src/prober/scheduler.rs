//! Bounded-concurrency probe dispatch
//!
//! The scheduler keeps at most `W` probes in flight. It seeds the in-flight
//! set with the first `min(W, total)` tasks, then tops it up one task per
//! completion. The dispatch loop never blocks for long: it polls the
//! in-flight set on a short timeout so pause and cancel transitions are
//! observed within well under a second.
//!
//! Every task produces exactly one result, stored at the task's original
//! index; report order is therefore independent of completion order. Tasks
//! that were never launched (cancellation) get a synthetic failure result.

use crate::config::ProbeConfig;
use crate::events::RunEvents;
use crate::prober::fetcher::{probe_url, ProbeStatus};
use crate::signals::RunSignals;
use crate::url::{url_extension, url_filename_no_ext};
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

/// How long the dispatch loop waits on the in-flight set per poll.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How often pause and cancel flags are re-checked while parked.
const PAUSE_POLL: Duration = Duration::from_millis(200);

/// One URL to probe. The index is assigned at intake, never changes, and
/// defines the row's position in the final report.
#[derive(Debug, Clone)]
pub struct UrlTask {
    pub index: usize,
    pub url: String,
}

/// The outcome of probing one task.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub index: usize,
    pub url: String,
    /// Path basename, percent-decoded, extension stripped
    pub file_name: String,
    /// Lower-case extension without the dot
    pub extension: String,
    /// Size in megabytes (2 decimals); `None` when undeterminable
    pub size_mb: Option<f64>,
    pub status: ProbeStatus,
}

impl ProbeResult {
    /// Synthetic result for a task that was cancelled before probing.
    fn cancelled(task: &UrlTask) -> Self {
        Self {
            index: task.index,
            file_name: url_filename_no_ext(&task.url),
            extension: url_extension(&task.url),
            url: task.url.clone(),
            size_mb: None,
            status: ProbeStatus::Err,
        }
    }
}

/// What a scheduler run produced.
#[derive(Debug)]
pub struct SchedulerOutcome {
    /// One result per task, ordered by original index.
    pub results: Vec<ProbeResult>,
    /// Number of tasks whose probe actually ran (or was drained in flight);
    /// excludes synthetic rows for never-launched tasks.
    pub completed: usize,
}

/// Dispatches probes with bounded concurrency.
pub struct FetchScheduler {
    client: Client,
    in_flight_limit: usize,
    request_timeout: Duration,
    progress_interval: Duration,
    signals: Arc<RunSignals>,
    events: Arc<dyn RunEvents>,
}

impl FetchScheduler {
    pub fn new(
        client: Client,
        config: &ProbeConfig,
        signals: Arc<RunSignals>,
        events: Arc<dyn RunEvents>,
    ) -> Self {
        Self {
            client,
            in_flight_limit: config.effective_in_flight(),
            request_timeout: config.request_timeout(),
            progress_interval: config.progress_interval(),
            signals,
            events,
        }
    }

    /// Probes every task and returns one result per task.
    ///
    /// Task indices must be unique and within `0..tasks.len()`; the intake
    /// path assigns them by enumeration.
    pub async fn run(&self, tasks: Vec<UrlTask>) -> SchedulerOutcome {
        let total = tasks.len();
        let mut results: Vec<Option<ProbeResult>> = Vec::new();
        results.resize_with(total, || None);

        let originals = tasks.clone();
        let mut queue = tasks.into_iter();
        let mut in_flight: JoinSet<ProbeResult> = JoinSet::new();

        let seed = self.in_flight_limit.min(total);
        for task in queue.by_ref().take(seed) {
            self.spawn_probe(&mut in_flight, task);
        }
        tracing::info!(
            "probing {} URLs with up to {} in flight",
            total,
            self.in_flight_limit
        );

        let started = Instant::now();
        let mut completed = 0usize;
        let mut last_emit: Option<Instant> = None;

        while !in_flight.is_empty() {
            // Hold dispatch while the network monitor has us paused.
            while self.signals.is_paused() && !self.signals.is_cancelled() {
                tokio::time::sleep(PAUSE_POLL).await;
            }

            match tokio::time::timeout(POLL_INTERVAL, in_flight.join_next()).await {
                Ok(Some(Ok(result))) => {
                    let index = result.index;
                    if index < total && results[index].is_none() {
                        results[index] = Some(result);
                        completed += 1;
                    } else {
                        tracing::warn!("discarding result with unexpected index {}", index);
                    }

                    if !self.signals.is_cancelled() && !self.signals.is_paused() {
                        if let Some(next) = queue.next() {
                            self.spawn_probe(&mut in_flight, next);
                        }
                    }

                    let due = last_emit
                        .map_or(true, |at| at.elapsed() >= self.progress_interval);
                    if due || completed == total {
                        self.emit_progress(started, completed, total);
                        last_emit = Some(Instant::now());
                    }
                }
                Ok(Some(Err(join_err))) => {
                    // A probe task died; its slot is filled synthetically below.
                    tracing::warn!("probe task failed to join: {}", join_err);
                }
                Ok(None) => break,
                Err(_) => {
                    // Poll tick: loop around to re-check pause and cancel.
                }
            }
        }

        // Tasks never launched record a synthetic failure row.
        for task in queue {
            results[task.index] = Some(ProbeResult::cancelled(&task));
        }
        for task in &originals {
            if results[task.index].is_none() {
                results[task.index] = Some(ProbeResult::cancelled(task));
            }
        }

        self.emit_progress(started, completed, total);

        SchedulerOutcome {
            results: results.into_iter().flatten().collect(),
            completed,
        }
    }

    fn spawn_probe(&self, in_flight: &mut JoinSet<ProbeResult>, task: UrlTask) {
        let client = self.client.clone();
        let signals = self.signals.clone();
        let timeout = self.request_timeout;

        in_flight.spawn(async move {
            // A probe queued behind a pause waits here rather than hitting
            // the dead network.
            while signals.is_paused() && !signals.is_cancelled() {
                tokio::time::sleep(PAUSE_POLL).await;
            }
            if signals.is_cancelled() {
                return ProbeResult::cancelled(&task);
            }

            let outcome = probe_url(&client, &task.url, timeout).await;
            ProbeResult {
                index: task.index,
                file_name: url_filename_no_ext(&task.url),
                extension: url_extension(&task.url),
                url: task.url,
                size_mb: outcome.size_mb,
                status: outcome.status,
            }
        });
    }

    fn emit_progress(&self, started: Instant, completed: usize, total: usize) {
        let eta = format_eta(started.elapsed(), completed, total);
        self.events.on_progress(completed, total, &eta);
    }
}

/// Estimated time remaining as `H:MM:SS`; a placeholder until the first
/// completion makes the rate meaningful.
pub fn format_eta(elapsed: Duration, completed: usize, total: usize) -> String {
    if completed == 0 {
        return "--:--:--".to_string();
    }
    let per_task = elapsed.as_secs_f64() / completed as f64;
    let remaining = (per_task * total.saturating_sub(completed) as f64).round() as u64;
    format!(
        "{}:{:02}:{:02}",
        remaining / 3600,
        (remaining % 3600) / 60,
        remaining % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullEvents;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Records every progress callback for assertions.
    #[derive(Default)]
    struct RecordingEvents {
        progress: Mutex<Vec<(usize, usize, String)>>,
    }

    impl RunEvents for RecordingEvents {
        fn on_progress(&self, completed: usize, total: usize, eta: &str) {
            self.progress
                .lock()
                .unwrap()
                .push((completed, total, eta.to_string()));
        }
    }

    fn scheduler_with(
        events: Arc<dyn RunEvents>,
        signals: Arc<RunSignals>,
        in_flight: usize,
    ) -> FetchScheduler {
        let config = ProbeConfig {
            max_in_flight: Some(in_flight),
            request_timeout_secs: 5,
            progress_interval_ms: 0,
        };
        FetchScheduler::new(
            crate::prober::build_http_client().unwrap(),
            &config,
            signals,
            events,
        )
    }

    fn tasks_from(urls: &[String]) -> Vec<UrlTask> {
        urls.iter()
            .enumerate()
            .map(|(index, url)| UrlTask {
                index,
                url: url.clone(),
            })
            .collect()
    }

    #[test]
    fn test_format_eta() {
        assert_eq!(format_eta(Duration::from_secs(10), 0, 4), "--:--:--");
        assert_eq!(format_eta(Duration::from_secs(10), 2, 4), "0:00:10");
        assert_eq!(format_eta(Duration::from_secs(7200), 1, 3), "4:00:00");
    }

    #[tokio::test]
    async fn test_every_task_yields_one_result_in_input_order() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/missing.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/missing.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 2_097_152]))
            .mount(&server)
            .await;

        let urls: Vec<String> = vec![
            format!("{}/a.png", server.uri()),
            format!("{}/missing.png", server.uri()),
            format!("{}/b.pdf", server.uri()),
            "http://127.0.0.1:1/dead.zip".to_string(),
            format!("{}/c.gif", server.uri()),
        ];

        let signals = Arc::new(RunSignals::new());
        let scheduler = scheduler_with(Arc::new(NullEvents), signals, 2);
        let outcome = scheduler.run(tasks_from(&urls)).await;

        assert_eq!(outcome.results.len(), urls.len());
        assert_eq!(outcome.completed, urls.len());
        for (i, result) in outcome.results.iter().enumerate() {
            assert_eq!(result.index, i);
            assert_eq!(result.url, urls[i]);
        }
        assert_eq!(outcome.results[0].status, ProbeStatus::Ok);
        assert_eq!(outcome.results[0].size_mb, Some(2.0));
        assert_eq!(outcome.results[1].status, ProbeStatus::Http(404));
        assert_eq!(outcome.results[3].status, ProbeStatus::Err);
        assert_eq!(outcome.results[3].size_mb, None);
    }

    #[tokio::test]
    async fn test_cancel_before_start_yields_all_err_rows() {
        let urls: Vec<String> = (0..6)
            .map(|i| format!("http://127.0.0.1:1/never-{}.bin", i))
            .collect();

        let signals = Arc::new(RunSignals::new());
        signals.cancel();
        let scheduler = scheduler_with(Arc::new(NullEvents), signals, 3);
        let outcome = scheduler.run(tasks_from(&urls)).await;

        assert_eq!(outcome.results.len(), urls.len());
        for result in &outcome.results {
            assert_eq!(result.status, ProbeStatus::Err);
            assert_eq!(result.size_mb, None);
        }
    }

    #[tokio::test]
    async fn test_final_progress_is_always_emitted() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 10]))
            .mount(&server)
            .await;

        let urls = vec![format!("{}/one.png", server.uri())];
        let events = Arc::new(RecordingEvents::default());
        let signals = Arc::new(RunSignals::new());
        let scheduler = scheduler_with(events.clone(), signals, 4);
        scheduler.run(tasks_from(&urls)).await;

        let progress = events.progress.lock().unwrap();
        let last = progress.last().expect("no progress emitted");
        assert_eq!((last.0, last.1), (1, 1));
    }
}
