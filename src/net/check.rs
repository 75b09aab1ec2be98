//! Connectivity probing
//!
//! A connectivity check issues lightweight GETs against a short list of
//! well-known endpoints. Any 2xx/3xx answer from any endpoint means the
//! network is up; the check returns as soon as one endpoint succeeds and
//! never contacts the rest.

use crate::config::ConnectivityConfig;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Seam for connectivity sampling, so the monitor's state machine can be
/// driven by scripted outcomes in tests.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// Returns true when the network looks reachable right now.
    async fn check(&self) -> bool;
}

/// Probes real endpoints over HTTP.
pub struct HttpConnectivityProbe {
    client: Client,
    endpoints: Vec<String>,
    timeout: Duration,
}

impl HttpConnectivityProbe {
    pub fn new(client: Client, config: &ConnectivityConfig) -> Self {
        Self {
            client,
            endpoints: config.endpoints.clone(),
            timeout: config.probe_timeout(),
        }
    }
}

#[async_trait]
impl ConnectivityProbe for HttpConnectivityProbe {
    async fn check(&self) -> bool {
        for endpoint in &self.endpoints {
            match self
                .client
                .get(endpoint)
                .timeout(self.timeout)
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() || status.is_redirection() {
                        return true;
                    }
                    tracing::trace!("connectivity endpoint {} answered {}", endpoint, status);
                }
                Err(e) => {
                    tracing::trace!("connectivity endpoint {} unreachable: {}", endpoint, e);
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn probe_for(endpoints: Vec<String>) -> HttpConnectivityProbe {
        let config = ConnectivityConfig {
            endpoints,
            probe_timeout_ms: 1000,
            ..ConnectivityConfig::default()
        };
        HttpConnectivityProbe::new(Client::new(), &config)
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let first = MockServer::start().await;
        let second = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&first)
            .await;
        // Never contacted once the first endpoint succeeds.
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&second)
            .await;

        let probe = probe_for(vec![first.uri(), second.uri()]);
        assert!(probe.check().await);
    }

    #[tokio::test]
    async fn test_falls_through_to_later_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        // First endpoint refuses the connection; second answers 200.
        let probe = probe_for(vec!["http://127.0.0.1:1/".to_string(), server.uri()]);
        assert!(probe.check().await);
    }

    #[tokio::test]
    async fn test_all_failures_mean_offline() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let probe = probe_for(vec![server.uri(), "http://127.0.0.1:1/".to_string()]);
        assert!(!probe.check().await);
    }
}
