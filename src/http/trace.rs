//! Request/response trace records shared by the async and sync sessions
//!
//! Every exchange is logged at `DEBUG` under the `runpod_worker::http` target:
//! request headers and body, then response status, headers, and body. The
//! `Authorization` value is masked.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap};
use reqwest::{Method, StatusCode, Url};
use tracing::debug;
use uuid::Uuid;

pub const TARGET: &str = "runpod_worker::http";

const MASKED: &str = "<redacted>";

pub(crate) fn next_request_id() -> Uuid {
    Uuid::now_v7()
}

/// Session defaults first, request-level headers override them.
pub(crate) fn effective_headers(defaults: &HeaderMap, request: &HeaderMap) -> HeaderMap {
    let mut merged = defaults.clone();
    for (name, value) in request {
        merged.insert(name.clone(), value.clone());
    }
    merged
}

pub(crate) fn render_headers(headers: &HeaderMap) -> String {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if name == AUTHORIZATION && !value.is_empty() {
                MASKED
            } else {
                value.to_str().unwrap_or("<binary>")
            };
            format!("{}: {}", name, value)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn render_body(body: Option<&[u8]>) -> String {
    match body {
        Some(bytes) if !bytes.is_empty() => String::from_utf8_lossy(bytes).into_owned(),
        Some(_) => String::new(),
        None => "<stream>".to_string(),
    }
}

pub(crate) fn record_request(
    request_id: &Uuid,
    method: &Method,
    url: &Url,
    headers: &HeaderMap,
    body: Option<&[u8]>,
) {
    debug!(
        target: TARGET,
        %request_id,
        %method,
        %url,
        headers = %render_headers(headers),
        body = %render_body(body),
        "Sending request"
    );
}

pub(crate) fn record_response(
    request_id: &Uuid,
    status: StatusCode,
    headers: &HeaderMap,
    body: &[u8],
    elapsed: Duration,
) {
    debug!(
        target: TARGET,
        %request_id,
        status = status.as_u16(),
        elapsed_ms = elapsed.as_millis() as u64,
        headers = %render_headers(headers),
        body = %render_body(Some(body)),
        "Received response"
    );
}

pub(crate) fn record_failure(request_id: &Uuid, elapsed: Duration, error: &dyn std::fmt::Display) {
    debug!(
        target: TARGET,
        %request_id,
        elapsed_ms = elapsed.as_millis() as u64,
        %error,
        "Request failed"
    );
}
