use crate::config::Config;
use crate::{ConfigError, ConfigResult};

/// Validates a loaded configuration.
///
/// Catches the values that would make the run hang or spin: empty endpoint
/// lists, zero thresholds, zero timeouts.
pub fn validate_config(config: &Config) -> ConfigResult<()> {
    if config.connectivity.endpoints.is_empty() {
        return Err(ConfigError::Validation(
            "connectivity.endpoints must list at least one URL".to_string(),
        ));
    }

    if config.connectivity.fail_threshold == 0 {
        return Err(ConfigError::Validation(
            "connectivity.fail-threshold must be at least 1".to_string(),
        ));
    }

    if config.connectivity.countdown_ticks == 0 {
        return Err(ConfigError::Validation(
            "connectivity.countdown-ticks must be at least 1".to_string(),
        ));
    }

    if config.connectivity.probe_timeout_ms == 0 || config.connectivity.tick_ms == 0 {
        return Err(ConfigError::Validation(
            "connectivity timeouts must be non-zero".to_string(),
        ));
    }

    if config.probe.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "probe.request-timeout-secs must be non-zero".to_string(),
        ));
    }

    if config.probe.max_in_flight == Some(0) {
        return Err(ConfigError::Validation(
            "probe.max-in-flight must be at least 1".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_default_config_is_valid() {
        validate_config(&Config::default()).unwrap();
    }

    #[test]
    fn test_empty_endpoints_rejected() {
        let mut config = Config::default();
        config.connectivity.endpoints.clear();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let mut config = Config::default();
        config.connectivity.fail_threshold = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_in_flight_rejected() {
        let mut config = Config::default();
        config.probe.max_in_flight = Some(0);
        assert!(validate_config(&config).is_err());
    }
}
