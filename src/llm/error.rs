//! Model call failures

use std::fmt;
use thiserror::Error;

/// Failed model call, tagged with what went wrong
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub message: String,
}

impl LlmError {
    pub fn new(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Network, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Unknown, message)
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let kind = match status {
            400 => LlmErrorKind::InvalidRequest,
            // Request Timeout: the service gave up waiting on the connection
            408 => LlmErrorKind::Network,
            401 | 403 => LlmErrorKind::Auth,
            429 => LlmErrorKind::RateLimit,
            500..=599 => LlmErrorKind::ServerError,
            _ => LlmErrorKind::Unknown,
        };
        Self::new(kind, format!("HTTP {status}: {}", message.into()))
    }
}

impl From<reqwest::Error> for LlmError {
    /// Transport failures: anything that kept the request from reaching the
    /// service or its answer from arriving counts as a network fault.
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            Self::network(e.to_string())
        } else if e.is_body() {
            Self::network(format!("Failed to read response: {e}"))
        } else {
            Self::unknown(format!("Request failed: {e}"))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// Host unreachable, connection refused, timeouts (including HTTP 408)
    Network,
    /// 429
    RateLimit,
    /// 5xx
    ServerError,
    /// 401 or 403
    Auth,
    /// 400
    InvalidRequest,
    Unknown,
}

impl LlmErrorKind {
    /// Whether the failure means the service could not be reached at all
    pub fn is_connectivity(self) -> bool {
        matches!(self, Self::Network)
    }
}

impl fmt::Display for LlmErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Network => "network error",
            Self::RateLimit => "rate limited",
            Self::ServerError => "server error",
            Self::Auth => "authentication failed",
            Self::InvalidRequest => "invalid request",
            Self::Unknown => "model error",
        };
        f.write_str(label)
    }
}
