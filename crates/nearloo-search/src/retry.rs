//! Failure classification for mirror requests.
//!
//! Retried:
//! - 429 Too Many Requests
//! - 504 Gateway Timeout and 408 Request Timeout
//! - client-side timeouts and connection failures
//!
//! Everything else is permanent for the current attempt.

use reqwest::StatusCode;
use thiserror::Error;

/// Maximum characters of a response body kept in a failure reason.
pub const BODY_SNIPPET_CHARS: usize = 220;

/// Error classification for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try the next mirror or attempt
    Retry,
    /// Permanent failure
    NoRetry,
}

/// Why one endpoint call did not produce results.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EndpointFailure {
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("{0}")]
    Other(String),
}

impl EndpointFailure {
    /// Build a status failure, keeping only the start of the body.
    pub fn status(status: StatusCode, body: &str) -> Self {
        Self::Status {
            status: status.as_u16(),
            body: body.chars().take(BODY_SNIPPET_CHARS).collect(),
        }
    }

    pub fn decision(&self) -> RetryDecision {
        match self {
            Self::Timeout | Self::Connect(_) | Self::Decode(_) => RetryDecision::Retry,
            Self::Status { status, .. } => match StatusCode::from_u16(*status) {
                Ok(code) => is_retryable_status(code),
                Err(_) => RetryDecision::NoRetry,
            },
            Self::Other(_) => RetryDecision::NoRetry,
        }
    }
}

impl From<reqwest::Error> for EndpointFailure {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_connect() {
            Self::Connect(error.to_string())
        } else if error.is_decode() || error.is_body() {
            Self::Decode(error.to_string())
        } else if let Some(status) = error.status() {
            Self::status(status, "")
        } else {
            Self::Other(error.to_string())
        }
    }
}

/// Check if a status code is retryable
pub fn is_retryable_status(status: StatusCode) -> RetryDecision {
    if status == StatusCode::TOO_MANY_REQUESTS {
        tracing::debug!("Rate limited (429), will retry");
        return RetryDecision::Retry;
    }

    if status == StatusCode::GATEWAY_TIMEOUT || status == StatusCode::REQUEST_TIMEOUT {
        tracing::debug!("Gateway timeout ({}), will retry", status);
        return RetryDecision::Retry;
    }

    // other 5xx mirrors are treated as broken for this attempt
    RetryDecision::NoRetry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_status_codes() {
        assert_eq!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS), RetryDecision::Retry);
        assert_eq!(is_retryable_status(StatusCode::GATEWAY_TIMEOUT), RetryDecision::Retry);
        assert_eq!(is_retryable_status(StatusCode::REQUEST_TIMEOUT), RetryDecision::Retry);

        assert_eq!(is_retryable_status(StatusCode::BAD_REQUEST), RetryDecision::NoRetry);
        assert_eq!(is_retryable_status(StatusCode::FORBIDDEN), RetryDecision::NoRetry);
        assert_eq!(is_retryable_status(StatusCode::INTERNAL_SERVER_ERROR), RetryDecision::NoRetry);
        assert_eq!(is_retryable_status(StatusCode::OK), RetryDecision::NoRetry);
    }

    #[test]
    fn test_failure_decisions() {
        assert_eq!(EndpointFailure::Timeout.decision(), RetryDecision::Retry);
        assert_eq!(EndpointFailure::Connect("refused".into()).decision(), RetryDecision::Retry);
        assert_eq!(EndpointFailure::Decode("eof".into()).decision(), RetryDecision::Retry);
        assert_eq!(EndpointFailure::Other("builder".into()).decision(), RetryDecision::NoRetry);
        assert_eq!(
            EndpointFailure::status(StatusCode::GATEWAY_TIMEOUT, "busy").decision(),
            RetryDecision::Retry
        );
        assert_eq!(
            EndpointFailure::status(StatusCode::BAD_REQUEST, "parse error").decision(),
            RetryDecision::NoRetry
        );
    }

    #[test]
    fn test_status_body_is_truncated() {
        let body = "x".repeat(1000);
        match EndpointFailure::status(StatusCode::TOO_MANY_REQUESTS, &body) {
            EndpointFailure::Status { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body.chars().count(), BODY_SNIPPET_CHARS);
            }
            other => panic!("unexpected failure: {:?}", other),
        }
    }
}
