//! Configuration module for LinkGauge
//!
//! Loads and validates TOML configuration files. Every field has a default,
//! so an empty file (or no file at all) yields a working configuration.
//!
//! # Example
//!
//! ```no_run
//! use linkgauge::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("linkgauge.toml")).unwrap();
//! println!("Probe timeout: {:?}", config.probe.request_timeout());
//! ```

mod types;
mod validation;

pub use types::{Config, ConnectivityConfig, ProbeConfig};
pub use validation::validate_config;

use crate::ConfigResult;
use std::path::Path;

/// Loads a configuration from a TOML file and validates it.
pub fn load_config(path: &Path) -> ConfigResult<Config> {
    let raw = std::fs::read_to_string(path).map_err(|source| crate::ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: Config = toml::from_str(&raw)?;
    validate_config(&config)?;
    Ok(config)
}
