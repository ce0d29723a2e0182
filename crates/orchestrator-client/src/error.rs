//! Client error types.
//!
//! Every failure talking to the Orchestration Service surfaces as a
//! [`ClientError`].  The console collapses all of them into a single failure
//! path, but the variants keep the cause inspectable for logs and tests.

/// Unified error type for the orchestration client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("request to orchestration service failed: {reason}")]
    Request { reason: String },

    /// The service answered with a non-success status code.
    #[error("orchestration service returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body parsed but lacked the field the call depends on.
    #[error("response body is missing the `{field}` field")]
    MissingField { field: &'static str },

    /// The configured base URL is not usable.
    #[error("invalid service url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The response body was not valid JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the client crate.
pub type Result<T> = std::result::Result<T, ClientError>;

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Request {
            reason: err.to_string(),
        }
    }
}
