//! LinkGauge command-line front end
//!
//! A thin console stand-in for the UI layer: argument parsing, logging
//! setup, a progress line, and a stdin reconnect prompt. All audit logic
//! lives in the library.

use anyhow::Context;
use clap::Parser;
use linkgauge::config::{load_config, Config};
use linkgauge::input;
use linkgauge::output::tmp_sibling;
use linkgauge::{Coordinator, ReconnectDecision, RunEvents, RunRequest};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// LinkGauge: bulk URL size and reachability auditor
///
/// Reads URLs from a spreadsheet column or a WordPress export file, probes
/// each one over HTTP, and writes a spreadsheet report with per-URL status
/// and size. The run survives connectivity loss by pausing and resuming.
#[derive(Parser, Debug)]
#[command(name = "linkgauge")]
#[command(version)]
#[command(about = "Bulk URL size and reachability auditor", long_about = None)]
struct Cli {
    /// Input file (.xlsx with a URL column, or a WordPress export .xml)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Header of the URL column (spreadsheet input only)
    #[arg(long, default_value = "URL")]
    column: String,

    /// Report path; defaults to "<input stem>_report.xlsx" beside the input
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Count the extractable URLs and exit without probing
    #[arg(long)]
    count: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    if cli.count {
        let urls = input::read_urls(&cli.input, Some(&cli.column))?;
        println!("{} URLs found in {}", urls.len(), cli.input.display());
        return Ok(());
    }

    let output = match cli.output {
        Some(path) => unique_output_path(path),
        None => unique_output_path(default_output_path(&cli.input)),
    };

    let events = std::sync::Arc::new(ConsoleEvents);
    let coordinator = Coordinator::new(config, events)?;

    // Ctrl-C requests cancellation; in-flight probes drain and the partial
    // report is still written.
    let signals = coordinator.signals();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("cancellation requested");
            signals.cancel();
        }
    });

    let request = RunRequest {
        input: cli.input,
        url_column: Some(cli.column),
        output,
    };
    let summary = coordinator.run(request).await?;

    if summary.cancelled {
        println!(
            "Cancelled after {}/{} URLs; partial report: {}",
            summary.processed,
            summary.total,
            summary.output_path.display()
        );
    } else {
        println!(
            "Done: {} URLs audited; report: {}",
            summary.total,
            summary.output_path.display()
        );
    }
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("linkgauge=info,warn"),
            1 => EnvFilter::new("linkgauge=debug,info"),
            2 => EnvFilter::new("linkgauge=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// `<input stem>_report.xlsx` beside the input file.
fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("linkgauge");
    input.with_file_name(format!("{}_report.xlsx", stem))
}

/// Appends `_2`, `_3`, ... while the path or its `.tmp` sibling exists, so a
/// run never clobbers an earlier report or a leftover temporary.
fn unique_output_path(initial: PathBuf) -> PathBuf {
    if !initial.exists() && !tmp_sibling(&initial).exists() {
        return initial;
    }
    let stem = initial
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("report")
        .to_string();
    let ext = initial
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("xlsx")
        .to_string();
    let mut n = 2;
    loop {
        let candidate = initial.with_file_name(format!("{}_{}.{}", stem, n, ext));
        if !candidate.exists() && !tmp_sibling(&candidate).exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Console rendering of run events: a live progress line on stderr and a
/// stdin prompt for reconnect decisions.
struct ConsoleEvents;

impl RunEvents for ConsoleEvents {
    fn on_progress(&self, completed: usize, total: usize, eta: &str) {
        let pct = if total == 0 {
            100
        } else {
            completed * 100 / total
        };
        eprint!("\r{}/{} ({}%)  ETA {}   ", completed, total, pct, eta);
        let _ = std::io::stderr().flush();
    }

    fn on_connectivity_waiting(&self) {
        eprintln!();
        tracing::warn!("connection lost; waiting for the network to come back");
    }

    fn on_connectivity_restored(&self) {
        tracing::info!("connection restored");
    }

    fn on_reconnect_decision_needed(&self) -> ReconnectDecision {
        eprintln!();
        eprint!("The connection appears to be down. [r]etry / [c]ancel: ");
        let _ = std::io::stderr().flush();

        let stdin = std::io::stdin();
        let mut line = String::new();
        loop {
            line.clear();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => return ReconnectDecision::Cancel,
                Ok(_) => match line.trim().to_lowercase().as_str() {
                    "r" | "retry" => return ReconnectDecision::Retry,
                    "c" | "cancel" => return ReconnectDecision::Cancel,
                    _ => {
                        eprint!("Please answer r or c: ");
                        let _ = std::io::stderr().flush();
                    }
                },
            }
        }
    }

    fn on_run_finished(&self, _processed: usize, _total: usize, _cancelled: bool) {
        eprintln!();
    }
}
