//! Engine-level error taxonomy.
//!
//! Layer-specific errors (`VaultError`, `GitLabError`, `StoreError`) are
//! folded into `SyncError` at the orchestrator boundary. The taxonomy
//! decides propagation: credential problems require the user to
//! reconnect, rate limits and upstream hiccups are retryable, and
//! per-repository failures are recorded without failing the pass.

use thiserror::Error;

use crate::gitlab::GitLabError;
use crate::store::StoreError;
use crate::vault::VaultError;

/// Errors surfaced by sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Token is missing, expired, or revoked. Requires user
    /// re-authentication; never auto-retried.
    #[error("credential invalid: reconnect required")]
    CredentialInvalid,

    /// Upstream throttling. Retryable with backoff, capped attempts.
    #[error("rate limited by upstream")]
    RateLimited,

    /// Transient upstream failure (5xx, network).
    #[error("upstream error: {message}")]
    Upstream { message: String },

    /// A fallback decode path was taken for stored data. Logged and
    /// continued, never fatal to the sync loop.
    #[error("data integrity warning: {message}")]
    DataIntegrity { message: String },

    /// One or more repositories failed within an otherwise completed pass.
    #[error("partial sync failure: {failed} of {attempted} repositories failed")]
    PartialSyncFailure { failed: usize, attempted: usize },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("vault error: {0}")]
    Vault(#[from] VaultError),
}

impl SyncError {
    /// Create an upstream error from a message.
    #[inline]
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    /// Create a data-integrity warning from a message.
    #[inline]
    pub fn data_integrity(message: impl Into<String>) -> Self {
        Self::DataIntegrity {
            message: message.into(),
        }
    }

    /// Whether this error means the user must re-authenticate.
    #[must_use]
    pub fn requires_reconnect(&self) -> bool {
        matches!(self, Self::CredentialInvalid)
    }

    /// Whether a retry with backoff is appropriate.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Upstream { .. })
    }
}

impl From<GitLabError> for SyncError {
    fn from(err: GitLabError) -> Self {
        match err {
            GitLabError::TokenInvalid => Self::CredentialInvalid,
            GitLabError::RateLimited => Self::RateLimited,
            other => Self::Upstream {
                message: other.to_string(),
            },
        }
    }
}

/// First display line of an error, for compact log records.
#[must_use]
pub fn short_error_message(err: &dyn std::error::Error) -> String {
    let full = err.to_string();
    full.lines().next().unwrap_or_default().to_string()
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
