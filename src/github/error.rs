//! Remote API error types
//!
//! Every failure from the hosting provider is folded into [`ApiError`], and
//! [`ApiError::kind`] maps it onto the small set of recovery classes the
//! discovery pipeline acts on.

use chrono::{DateTime, Utc};
use std::error::Error as StdError;
use thiserror::Error;

/// Result type for remote API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors raised by the remote collaborator
#[derive(Debug, Error)]
pub enum ApiError {
    /// Socket or read timeout
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Connection dropped or refused mid-request
    #[error("connection reset: {0}")]
    ConnectionReset(String),

    /// Request quota exhausted until `reset_at`
    #[error("rate limit exceeded, resets at {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    /// Credentials rejected by the provider
    #[error("authentication failed: {0}")]
    Unauthorized(String),

    /// Any other non-success HTTP status
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Transport failure that is neither a timeout nor a dropped connection
    #[error("transport error: {0}")]
    Transport(String),

    /// Response body did not match the expected shape
    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// Recovery class of an [`ApiError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    ConnectionReset,
    Timeout,
    QuotaExhausted(DateTime<Utc>),
    /// Nothing further can succeed; the run must stop
    Fatal,
    /// Only this request is affected
    Permanent,
}

impl ApiError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ApiError::Timeout(_) => FailureKind::Timeout,
            ApiError::ConnectionReset(_) => FailureKind::ConnectionReset,
            ApiError::RateLimited { reset_at } => FailureKind::QuotaExhausted(*reset_at),
            ApiError::Unauthorized(_) => FailureKind::Fatal,
            ApiError::Status { .. } | ApiError::Transport(_) | ApiError::Decode(_) => FailureKind::Permanent,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            FailureKind::ConnectionReset | FailureKind::Timeout | FailureKind::QuotaExhausted(_)
        )
    }

    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status { status, message: message.into() }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            return ApiError::Timeout(error.to_string());
        }
        if error.is_decode() {
            return ApiError::Decode(error.to_string());
        }
        if error.is_connect() || has_connection_reset(&error) {
            return ApiError::ConnectionReset(error.to_string());
        }
        ApiError::Transport(error.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        ApiError::Decode(error.to_string())
    }
}

/// Walk the source chain looking for an io error that signals a dropped connection
fn has_connection_reset(error: &(dyn StdError + 'static)) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = Some(error);
    while let Some(current) = source {
        if let Some(io) = current.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        source = current.source();
    }
    false
}
