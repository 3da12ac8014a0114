//! HTTP sessions for calls to the RunPod API
//!
//! [`AsyncSession`] and [`SyncSession`] share one [`SessionConfig`]: an
//! unbounded connection pool, the two-tier [`HttpTimeouts`], auth headers
//! captured at construction, and request/response tracing. Headers are not
//! refreshed per request; build a new session to pick up rotated credentials.

use std::time::{Duration, Instant};

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{IntoUrl, Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::auth::{AuthHeaders, CredentialChain, get_auth_header};
use super::error::{HttpError, Result};
use super::trace;

/// Absolute request ceiling plus the threshold above which it is rounded up
/// to a whole second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub total: Duration,
    pub ceil_threshold: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            total: Duration::from_secs(600),
            ceil_threshold: Duration::from_secs(400),
        }
    }
}

impl HttpTimeouts {
    /// The timeout actually handed to the client.
    pub fn effective_total(&self) -> Duration {
        if self.total >= self.ceil_threshold && self.total.subsec_nanos() > 0 {
            Duration::from_secs(self.total.as_secs() + 1)
        } else {
            self.total
        }
    }
}

#[derive(Debug, Clone, bon::Builder)]
pub struct SessionConfig {
    #[builder(default)]
    pub timeouts: HttpTimeouts,
    /// Idle connections kept per host; `usize::MAX` leaves the pool unbounded.
    #[builder(default = usize::MAX)]
    pub pool_max_idle_per_host: usize,
    pub connect_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Response with its body fully read, as recorded by the tracer
#[derive(Debug, Clone)]
pub struct TracedResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TracedResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(HttpError::Decode)
    }

    /// Turn a non-success status into [`HttpError::TooManyRequests`] or
    /// [`HttpError::Response`].
    pub fn error_for_status(self) -> Result<Self> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(HttpError::from_status(self.status, self.text()))
        }
    }
}

/// Async session backed by a `reqwest::Client`
#[derive(Debug, Clone)]
pub struct AsyncSession {
    client: reqwest::Client,
    auth: AuthHeaders,
    default_headers: HeaderMap,
}

impl AsyncSession {
    pub fn new(chain: &CredentialChain) -> Result<Self> {
        Self::with_config(chain, SessionConfig::default())
    }

    pub fn with_config(chain: &CredentialChain, config: SessionConfig) -> Result<Self> {
        let auth = get_auth_header(chain);
        let default_headers = auth.to_header_map()?;

        let mut builder = reqwest::Client::builder()
            .default_headers(default_headers.clone())
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .timeout(config.timeouts.effective_total());

        if let Some(connect_timeout) = config.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }

        let client = builder.build().map_err(HttpError::Build)?;

        debug!(
            timeout_secs = config.timeouts.effective_total().as_secs(),
            authorized = auth.has_api_key(),
            "Async HTTP session created"
        );

        Ok(Self {
            client,
            auth,
            default_headers,
        })
    }

    /// Headers captured when this session was built.
    pub fn auth_headers(&self) -> &AuthHeaders {
        &self.auth
    }

    pub fn request<U: IntoUrl>(&self, method: Method, url: U) -> reqwest::RequestBuilder {
        self.client.request(method, url)
    }

    pub fn get<U: IntoUrl>(&self, url: U) -> reqwest::RequestBuilder {
        self.request(Method::GET, url)
    }

    pub fn post<U: IntoUrl>(&self, url: U) -> reqwest::RequestBuilder {
        self.request(Method::POST, url)
    }

    /// Send a request built from this session and read the whole response.
    pub async fn execute(&self, builder: reqwest::RequestBuilder) -> Result<TracedResponse> {
        let request = builder.build().map_err(HttpError::Transport)?;
        let request_id = trace::next_request_id();
        let headers = trace::effective_headers(&self.default_headers, request.headers());
        trace::record_request(
            &request_id,
            request.method(),
            request.url(),
            &headers,
            request.body().and_then(|body| body.as_bytes()),
        );

        let started = Instant::now();
        let result = async {
            let response = self.client.execute(request).await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>(TracedResponse {
                status,
                headers,
                body,
            })
        }
        .await;

        match result {
            Ok(response) => {
                trace::record_response(
                    &request_id,
                    response.status,
                    &response.headers,
                    &response.body,
                    started.elapsed(),
                );
                Ok(response)
            }
            Err(err) => {
                trace::record_failure(&request_id, started.elapsed(), &err);
                Err(HttpError::from_transport(err))
            }
        }
    }
}

/// Blocking session with the same headers, timeouts, and tracing as [`AsyncSession`]
///
/// Must not be created or dropped from inside an async runtime.
#[derive(Debug, Clone)]
pub struct SyncSession {
    client: reqwest::blocking::Client,
    auth: AuthHeaders,
    default_headers: HeaderMap,
}

impl SyncSession {
    pub fn new(chain: &CredentialChain) -> Result<Self> {
        Self::with_config(chain, SessionConfig::default())
    }

    pub fn with_config(chain: &CredentialChain, config: SessionConfig) -> Result<Self> {
        let auth = get_auth_header(chain);
        let default_headers = auth.to_header_map()?;

        let mut builder = reqwest::blocking::Client::builder()
            .default_headers(default_headers.clone())
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .timeout(config.timeouts.effective_total());

        if let Some(connect_timeout) = config.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }

        let client = builder.build().map_err(HttpError::Build)?;

        debug!(
            timeout_secs = config.timeouts.effective_total().as_secs(),
            authorized = auth.has_api_key(),
            "Sync HTTP session created"
        );

        Ok(Self {
            client,
            auth,
            default_headers,
        })
    }

    pub fn auth_headers(&self) -> &AuthHeaders {
        &self.auth
    }

    pub fn request<U: IntoUrl>(&self, method: Method, url: U) -> reqwest::blocking::RequestBuilder {
        self.client.request(method, url)
    }

    pub fn get<U: IntoUrl>(&self, url: U) -> reqwest::blocking::RequestBuilder {
        self.request(Method::GET, url)
    }

    pub fn post<U: IntoUrl>(&self, url: U) -> reqwest::blocking::RequestBuilder {
        self.request(Method::POST, url)
    }

    pub fn execute(&self, builder: reqwest::blocking::RequestBuilder) -> Result<TracedResponse> {
        let request = builder.build().map_err(HttpError::Transport)?;
        let request_id = trace::next_request_id();
        let headers = trace::effective_headers(&self.default_headers, request.headers());
        trace::record_request(
            &request_id,
            request.method(),
            request.url(),
            &headers,
            request.body().and_then(|body| body.as_bytes()),
        );

        let started = Instant::now();
        let result = self.client.execute(request).and_then(|response| {
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes()?;
            Ok(TracedResponse {
                status,
                headers,
                body,
            })
        });

        match result {
            Ok(response) => {
                trace::record_response(
                    &request_id,
                    response.status,
                    &response.headers,
                    &response.body,
                    started.elapsed(),
                );
                Ok(response)
            }
            Err(err) => {
                trace::record_failure(&request_id, started.elapsed(), &err);
                Err(HttpError::from_transport(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::auth::tests::MockStore;
    use crate::http::auth::{Credentials, StoreSource};

    #[test]
    fn test_default_timeouts() {
        let timeouts = HttpTimeouts::default();
        assert_eq!(timeouts.total, Duration::from_secs(600));
        assert_eq!(timeouts.ceil_threshold, Duration::from_secs(400));
        assert_eq!(timeouts.effective_total(), Duration::from_secs(600));
    }

    #[test]
    fn test_timeout_rounded_up_above_threshold() {
        let timeouts = HttpTimeouts {
            total: Duration::from_millis(450_200),
            ceil_threshold: Duration::from_secs(400),
        };
        assert_eq!(timeouts.effective_total(), Duration::from_secs(451));
    }

    #[test]
    fn test_timeout_kept_below_threshold() {
        let timeouts = HttpTimeouts {
            total: Duration::from_millis(2_500),
            ceil_threshold: Duration::from_secs(400),
        };
        assert_eq!(timeouts.effective_total(), Duration::from_millis(2_500));
    }

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.pool_max_idle_per_host, usize::MAX);
        assert_eq!(config.timeouts, HttpTimeouts::default());
        assert!(config.connect_timeout.is_none());
    }

    #[test]
    fn test_headers_captured_at_construction() {
        let store = MockStore::with(Some(Credentials::new().with_api_key("first")));
        let chain = CredentialChain::new().with_source(StoreSource::new(store.clone()));

        let first = AsyncSession::new(&chain).unwrap();
        store.set(Some(Credentials::new().with_api_key("second")));
        let second = AsyncSession::new(&chain).unwrap();

        assert_eq!(first.auth_headers().authorization, "first");
        assert_eq!(second.auth_headers().authorization, "second");
    }

    #[test]
    fn test_sync_session_matches_async_headers() {
        let store = MockStore::with(Some(Credentials::new().with_api_key("shared")));
        let chain = CredentialChain::new().with_source(StoreSource::new(store));

        let async_session = AsyncSession::new(&chain).unwrap();
        let sync_session = SyncSession::new(&chain).unwrap();

        assert_eq!(async_session.auth_headers(), sync_session.auth_headers());
    }

    #[test]
    fn test_invalid_api_key_fails_construction() {
        let store = MockStore::with(Some(Credentials::new().with_api_key("bad\r\nkey")));
        let chain = CredentialChain::new().with_source(StoreSource::new(store));

        let result = AsyncSession::new(&chain);
        assert!(matches!(result, Err(HttpError::InvalidHeader { .. })));
    }

    #[test]
    fn test_error_for_status() {
        let response = TracedResponse {
            status: StatusCode::TOO_MANY_REQUESTS,
            headers: HeaderMap::new(),
            body: Bytes::from_static(b"rate limited"),
        };
        let err = response.error_for_status().unwrap_err();
        assert!(err.is_too_many_requests());

        let response = TracedResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::from_static(b"{\"ok\":true}"),
        };
        let value: serde_json::Value = response.error_for_status().unwrap().json().unwrap();
        assert_eq!(value["ok"], true);
    }
}
