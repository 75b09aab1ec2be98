//! HTTP size/reachability probing
//!
//! A probe answers two questions about one URL: does it respond, and how big
//! is the resource behind it. The size comes from a HEAD request's
//! `Content-Length` when possible; when HEAD fails outright or the header is
//! absent, a ranged GET (`bytes=0-0`) is tried and the total is parsed from
//! the `Content-Range` answer. Probe failures never escape this module: the
//! worst outcome is an `Err` status with no size.

use crate::url::sanitize_url;
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, RANGE};
use reqwest::Client;
use std::fmt;
use std::time::Duration;

const BYTES_PER_MB: f64 = 1_048_576.0;

/// Reachability verdict for one URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    /// HTTP 200
    Ok,
    /// Any other HTTP status code
    Http(u16),
    /// Transport failure, or cancelled before the probe was issued
    Err,
}

impl ProbeStatus {
    fn from_code(code: Option<u16>) -> Self {
        match code {
            Some(200) => ProbeStatus::Ok,
            Some(code) => ProbeStatus::Http(code),
            None => ProbeStatus::Err,
        }
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeStatus::Ok => write!(f, "OK"),
            ProbeStatus::Http(code) => write!(f, "{}", code),
            ProbeStatus::Err => write!(f, "ERR"),
        }
    }
}

/// What a single probe found out.
#[derive(Debug, Clone, Copy)]
pub struct ProbeOutcome {
    pub status: ProbeStatus,
    /// Size in megabytes, rounded to 2 decimals. `None` when undeterminable.
    pub size_mb: Option<f64>,
}

/// Builds the HTTP client shared by all probes in a run.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    let user_agent = format!("linkgauge/{}", env!("CARGO_PKG_VERSION"));

    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Probes one URL for reachability and size.
///
/// The URL is sanitized first so raw non-ASCII input still produces a valid
/// request. The HEAD status code wins when present; the ranged GET only
/// contributes a code when HEAD never got an answer.
pub async fn probe_url(client: &Client, url: &str, timeout: Duration) -> ProbeOutcome {
    let target = sanitize_url(url);

    let (mut code, mut size) = head_probe(client, &target, timeout).await;

    if size.is_none() {
        let (get_code, get_size) = ranged_get_probe(client, &target, timeout).await;
        if code.is_none() {
            code = get_code;
        }
        size = get_size;
    }

    ProbeOutcome {
        status: ProbeStatus::from_code(code),
        size_mb: size.map(bytes_to_mb),
    }
}

/// HEAD request: status code plus `Content-Length`, when present.
async fn head_probe(
    client: &Client,
    url: &str,
    timeout: Duration,
) -> (Option<u16>, Option<u64>) {
    match client.head(url).timeout(timeout).send().await {
        Ok(response) => {
            let code = response.status().as_u16();
            let size = header_u64(response.headers().get(CONTENT_LENGTH));
            (Some(code), size)
        }
        Err(e) => {
            tracing::debug!("HEAD {} failed: {}", url, e);
            (None, None)
        }
    }
}

/// Ranged GET fallback: asks for one byte and reads the total size from the
/// `Content-Range` answer (`bytes 0-0/12345`).
pub(crate) async fn ranged_get_probe(
    client: &Client,
    url: &str,
    timeout: Duration,
) -> (Option<u16>, Option<u64>) {
    match client
        .get(url)
        .header(RANGE, "bytes=0-0")
        .timeout(timeout)
        .send()
        .await
    {
        Ok(response) => {
            let code = response.status().as_u16();
            let size = response
                .headers()
                .get(CONTENT_RANGE)
                .and_then(|value| value.to_str().ok())
                .and_then(parse_content_range_total);
            (Some(code), size)
        }
        Err(e) => {
            tracing::debug!("ranged GET {} failed: {}", url, e);
            (None, None)
        }
    }
}

fn header_u64(value: Option<&reqwest::header::HeaderValue>) -> Option<u64> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
}

/// Total size from a `Content-Range` value; `None` for the `*/...` and
/// `.../*` indeterminate forms.
fn parse_content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.rsplit_once('/')?;
    total.trim().parse::<u64>().ok()
}

fn bytes_to_mb(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn test_bytes_to_mb_rounds_to_two_decimals() {
        assert_eq!(bytes_to_mb(123_456), 0.12);
        assert_eq!(bytes_to_mb(1_048_576), 1.0);
        assert_eq!(bytes_to_mb(0), 0.0);
    }

    #[test]
    fn test_parse_content_range_total() {
        assert_eq!(parse_content_range_total("bytes 0-0/12345"), Some(12345));
        assert_eq!(parse_content_range_total("bytes 0-0/*"), None);
        assert_eq!(parse_content_range_total("garbage"), None);
    }

    #[tokio::test]
    async fn test_head_gives_ok_and_size() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/a.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 123_456]))
            .mount(&server)
            .await;

        let client = build_http_client().unwrap();
        let outcome = probe_url(&client, &format!("{}/a.png", server.uri()), TIMEOUT).await;

        assert_eq!(outcome.status, ProbeStatus::Ok);
        assert_eq!(outcome.size_mb, Some(0.12));
    }

    #[tokio::test]
    async fn test_non_200_is_recorded_as_its_code() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = build_http_client().unwrap();
        let outcome = probe_url(&client, &format!("{}/gone.pdf", server.uri()), TIMEOUT).await;

        assert_eq!(outcome.status, ProbeStatus::Http(404));
        assert_eq!(outcome.status.to_string(), "404");
    }

    #[tokio::test]
    async fn test_transport_failure_is_err_with_no_size() {
        let client = build_http_client().unwrap();
        let outcome = probe_url(&client, "http://127.0.0.1:1/nothing.bin", TIMEOUT).await;

        assert_eq!(outcome.status, ProbeStatus::Err);
        assert_eq!(outcome.size_mb, None);
    }

    #[tokio::test]
    async fn test_ranged_get_reads_content_range_total() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("Range", "bytes=0-0"))
            .respond_with(
                ResponseTemplate::new(206)
                    .insert_header("Content-Range", "bytes 0-0/123456")
                    .set_body_bytes(vec![0u8]),
            )
            .mount(&server)
            .await;

        let client = build_http_client().unwrap();
        let (code, size) =
            ranged_get_probe(&client, &format!("{}/b.bin", server.uri()), TIMEOUT).await;

        assert_eq!(code, Some(206));
        assert_eq!(size, Some(123_456));
    }
}
