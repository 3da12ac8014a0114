use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid header value for {name}")]
    InvalidHeader {
        name: &'static str,
        #[source]
        source: reqwest::header::InvalidHeaderValue,
    },

    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// HTTP 429, kept apart from other response errors so callers can back off.
    #[error("too many requests ({status}): {message}")]
    TooManyRequests { status: StatusCode, message: String },

    #[error("HTTP {status}: {message}")]
    Response { status: StatusCode, message: String },

    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HttpError>;

impl HttpError {
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            HttpError::Timeout
        } else {
            HttpError::Transport(err)
        }
    }

    /// Map a non-success status to the matching error variant.
    pub fn from_status(status: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        if status == StatusCode::TOO_MANY_REQUESTS {
            HttpError::TooManyRequests { status, message }
        } else {
            HttpError::Response { status, message }
        }
    }

    pub fn is_too_many_requests(&self) -> bool {
        matches!(self, HttpError::TooManyRequests { .. })
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::TooManyRequests { status, .. } | HttpError::Response { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_429_maps_to_too_many_requests() {
        let err = HttpError::from_status(StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert!(err.is_too_many_requests());
        assert_eq!(err.status(), Some(StatusCode::TOO_MANY_REQUESTS));
    }

    #[test]
    fn test_other_status_maps_to_response() {
        let err = HttpError::from_status(StatusCode::BAD_GATEWAY, "upstream");
        assert!(!err.is_too_many_requests());
        assert!(matches!(err, HttpError::Response { .. }));
        assert_eq!(err.to_string(), "HTTP 502 Bad Gateway: upstream");
    }
}
