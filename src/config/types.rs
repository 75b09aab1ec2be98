use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for LinkGauge
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub probe: ProbeConfig,
    pub connectivity: ConnectivityConfig,
}

/// URL probing behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Maximum number of probes in flight at once. When unset, derived from
    /// the host: `min(32, 4 x available parallelism)`.
    #[serde(rename = "max-in-flight")]
    pub max_in_flight: Option<usize>,

    /// Per-request timeout for HEAD and ranged GET probes (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Minimum time between progress callbacks (milliseconds)
    #[serde(rename = "progress-interval-ms")]
    pub progress_interval_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            max_in_flight: None,
            request_timeout_secs: 15,
            progress_interval_ms: 50,
        }
    }
}

impl ProbeConfig {
    /// Resolves the in-flight limit, applying the host-derived default.
    pub fn effective_in_flight(&self) -> usize {
        self.max_in_flight
            .unwrap_or_else(default_in_flight)
            .max(1)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

/// Connectivity monitoring configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    /// Lightweight endpoints sampled to decide whether the network is up.
    /// Any 2xx/3xx answer from any of them counts as connected.
    pub endpoints: Vec<String>,

    /// Consecutive failures before escalating to the bounded countdown
    #[serde(rename = "fail-threshold")]
    pub fail_threshold: u32,

    /// Delay between connectivity re-probes while degraded (milliseconds)
    #[serde(rename = "probe-interval-ms")]
    pub probe_interval_ms: u64,

    /// Number of countdown ticks before asking the user what to do
    #[serde(rename = "countdown-ticks")]
    pub countdown_ticks: u32,

    /// Length of one countdown tick (milliseconds)
    #[serde(rename = "tick-ms")]
    pub tick_ms: u64,

    /// Timeout for a single connectivity probe request (milliseconds)
    #[serde(rename = "probe-timeout-ms")]
    pub probe_timeout_ms: u64,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![
                "http://www.gstatic.com/generate_204".to_string(),
                "http://clients3.google.com/generate_204".to_string(),
                "http://example.com/".to_string(),
                "https://www.microsoft.com/".to_string(),
            ],
            fail_threshold: 3,
            probe_interval_ms: 2000,
            countdown_ticks: 10,
            tick_ms: 1000,
            probe_timeout_ms: 3000,
        }
    }
}

impl ConnectivityConfig {
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

/// Default in-flight limit: `min(32, 4 x available parallelism)`.
pub(crate) fn default_in_flight() -> usize {
    let parallelism = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);
    (parallelism * 4).min(32)
}
