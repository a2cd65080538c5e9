//! GitLab API error types and status classification.

use thiserror::Error;

use crate::http::HttpError;

/// Errors that can occur when talking to the GitLab REST API.
#[derive(Debug, Error)]
pub enum GitLabError {
    /// Token rejected by the platform (HTTP 401).
    #[error("GitLab rejected the access token (401 Unauthorized)")]
    TokenInvalid,

    /// Upstream throttling (HTTP 403 or 429).
    #[error("GitLab rate limit exceeded")]
    RateLimited,

    /// Any other non-2xx response.
    #[error("GitLab API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Network or transport failure before a response arrived.
    #[error("HTTP request error: {0}")]
    Http(String),

    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Bad client configuration, e.g. an unusable base URL.
    #[error("GitLab client configuration error: {0}")]
    Config(String),
}

impl GitLabError {
    /// Classify an HTTP status code and response body into a typed error.
    ///
    /// 401 means the credential is invalid; 403 and 429 are treated as
    /// throttling; everything else non-2xx is a generic API error.
    #[must_use]
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 => Self::TokenInvalid,
            403 | 429 => Self::RateLimited,
            _ => Self::Api {
                status,
                message: truncate_body(body),
            },
        }
    }

    /// Create a configuration error from a message.
    #[inline]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the error indicates upstream throttling.
    #[must_use]
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited)
    }
}

impl From<HttpError> for GitLabError {
    fn from(err: HttpError) -> Self {
        Self::Http(err.to_string())
    }
}

/// Check if an error indicates a rate limit; suitable for retry predicates.
#[must_use]
pub fn is_rate_limit_error(e: &GitLabError) -> bool {
    e.is_rate_limit()
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}

/// Result type for GitLab API operations.
pub type Result<T> = std::result::Result<T, GitLabError>;
