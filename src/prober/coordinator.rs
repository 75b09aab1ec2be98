//! Run coordination
//!
//! The coordinator owns a run's lifecycle: read the input, gate on startup
//! connectivity, run the scheduler under the network monitor's supervision,
//! persist the report, and tell the front end how it all ended. It is the
//! only component that invokes the [`RunEvents`] callbacks for connectivity
//! escalation, and the only one holding the run's signal struct.

use crate::config::Config;
use crate::events::{ReconnectDecision, RunEvents};
use crate::input;
use crate::net::{ConnectivityProbe, HttpConnectivityProbe, NetEvent, NetworkMonitor};
use crate::output::{persist_report, ReportRow, ReportWriter};
use crate::prober::fetcher::build_http_client;
use crate::prober::scheduler::{FetchScheduler, UrlTask};
use crate::signals::RunSignals;
use crate::GaugeError;
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Everything a run needs to start.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Input file (`.xlsx` or `.xml`)
    pub input: PathBuf,
    /// Header of the URL column, for spreadsheet input
    pub url_column: Option<String>,
    /// Final path of the report container
    pub output: PathBuf,
}

/// How a run ended.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub total: usize,
    /// Tasks whose probe actually ran; equals `total` unless cancelled
    pub processed: usize,
    pub cancelled: bool,
    pub output_path: PathBuf,
}

/// Owns and drives one audit run at a time.
pub struct Coordinator {
    config: Config,
    client: Client,
    events: Arc<dyn RunEvents>,
    signals: Arc<RunSignals>,
}

impl Coordinator {
    pub fn new(config: Config, events: Arc<dyn RunEvents>) -> Result<Self, GaugeError> {
        let client = build_http_client()?;
        Ok(Self {
            config,
            client,
            events,
            signals: Arc::new(RunSignals::new()),
        })
    }

    /// Handle through which a front end requests cancellation.
    pub fn signals(&self) -> Arc<RunSignals> {
        self.signals.clone()
    }

    /// Runs one audit end to end.
    ///
    /// Input and output failures abort the run and propagate; per-URL
    /// failures become report rows; connectivity loss pauses the run until
    /// it recovers or the user cancels.
    pub async fn run(&self, request: RunRequest) -> Result<RunSummary, GaugeError> {
        let urls = input::read_urls(&request.input, request.url_column.as_deref())?;
        let total = urls.len();
        tracing::info!("loaded {} URLs from {}", total, request.input.display());

        let probe = HttpConnectivityProbe::new(self.client.clone(), &self.config.connectivity);
        if !probe.check().await {
            return Err(GaugeError::Offline);
        }

        let tasks: Vec<UrlTask> = urls
            .into_iter()
            .enumerate()
            .map(|(index, url)| UrlTask { index, url })
            .collect();

        // The monitor escalates through this channel; the consumer task
        // translates its events into front-end callbacks.
        let (net_tx, net_rx) = mpsc::channel(8);
        let monitor = NetworkMonitor::new(
            probe,
            self.config.connectivity.clone(),
            self.signals.clone(),
            net_tx,
        );
        let monitor_handle = tokio::spawn(monitor.run());
        let consumer_handle = tokio::spawn(consume_net_events(net_rx, self.events.clone()));

        let scheduler = FetchScheduler::new(
            self.client.clone(),
            &self.config.probe,
            self.signals.clone(),
            self.events.clone(),
        );
        let outcome = scheduler.run(tasks).await;

        monitor_handle.abort();
        consumer_handle.abort();

        let mut report = ReportWriter::new();
        for result in &outcome.results {
            report.push(ReportRow::from(result));
        }
        let output_path = persist_report(&report, &request.output)?;

        let cancelled = self.signals.is_cancelled();
        if cancelled {
            tracing::warn!(
                "run cancelled after {}/{} probes; report written to {}",
                outcome.completed,
                total,
                output_path.display()
            );
        } else {
            tracing::info!(
                "run finished: {}/{} probes, report written to {}",
                outcome.completed,
                total,
                output_path.display()
            );
        }
        self.events
            .on_run_finished(outcome.completed, total, cancelled);

        Ok(RunSummary {
            total,
            processed: outcome.completed,
            cancelled,
            output_path,
        })
    }
}

/// Translates monitor escalation events into front-end callbacks.
///
/// The reconnect prompt may block on a human, so it runs on a blocking
/// thread; the monitor keeps re-probing in the meantime.
async fn consume_net_events(mut net_rx: mpsc::Receiver<NetEvent>, events: Arc<dyn RunEvents>) {
    while let Some(event) = net_rx.recv().await {
        match event {
            NetEvent::ConnectivityLost => events.on_connectivity_waiting(),
            NetEvent::ConnectivityRestored => events.on_connectivity_restored(),
            NetEvent::DecisionNeeded(reply) => {
                let events = events.clone();
                let decision =
                    tokio::task::spawn_blocking(move || events.on_reconnect_decision_needed())
                        .await
                        .unwrap_or(ReconnectDecision::Cancel);
                // The monitor may have recovered on its own; a dead reply
                // channel is fine.
                let _ = reply.send(decision);
            }
        }
    }
}
