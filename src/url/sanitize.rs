//! Probe-URL sanitization
//!
//! Input lists frequently carry URLs with raw non-ASCII characters or spaces
//! in the path. Round-tripping through `url::Url` percent-encodes the path
//! and query (keeping the query's `=`/`&` delimiters intact) without
//! double-encoding sequences that are already escaped.

use url::Url;

/// Returns a request-safe form of `raw`. Unparsable input is returned
/// unchanged; the probe will then record the transport failure as its result.
pub fn sanitize_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(parsed) => parsed.to_string(),
        Err(_) => raw.to_string(),
    }
}
