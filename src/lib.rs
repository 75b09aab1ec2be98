//! LinkGauge: a bulk URL size and reachability auditor
//!
//! This crate probes lists of URLs (taken from a spreadsheet column or a
//! WordPress export file) over HTTP with bounded concurrency, survives
//! connectivity loss mid-run by pausing and escalating instead of failing,
//! and writes the results as a spreadsheet container built from scratch.

pub mod config;
pub mod events;
pub mod input;
pub mod net;
pub mod output;
pub mod prober;
pub mod signals;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for LinkGauge operations
#[derive(Debug, Error)]
pub enum GaugeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Input error: {0}")]
    Input(#[from] input::InputError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("No internet connectivity; refusing to start the run")]
    Offline,

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for LinkGauge operations
pub type Result<T> = std::result::Result<T, GaugeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use events::{NullEvents, ReconnectDecision, RunEvents};
pub use prober::{Coordinator, ProbeResult, ProbeStatus, RunRequest, RunSummary, UrlTask};
pub use signals::RunSignals;
