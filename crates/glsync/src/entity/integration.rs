//! Integration entity - one GitLab connection per user.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Maximum sync errors retained on an integration; oldest evicted first.
pub const MAX_SYNC_ERRORS: usize = 10;

/// One tracked repository inside the `repositories` JSON column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedRepository {
    /// External project ID.
    pub project_id: u64,
    /// Display name.
    pub name: String,
    /// Full slug path (e.g., "group/project").
    pub path_with_namespace: String,
    /// Web URL to the project.
    pub url: String,
    /// Whether activity is collected for this repository.
    pub is_tracked: bool,
    /// When the repository was first observed.
    pub added_at: DateTime<Utc>,
    /// Per-repository sync watermark; monotonically non-decreasing.
    pub last_sync_at: Option<DateTime<Utc>>,
}

/// One entry of the bounded sync-error log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncErrorEntry {
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

/// Integration model - the per-user record of a GitLab OAuth connection.
///
/// Token columns hold opaque encrypted blobs produced by the vault; the
/// plaintext never reaches storage or logs.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "integrations")]
pub struct Model {
    /// Internal UUID primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    // ─── Identity ────────────────────────────────────────────────────────────
    /// Owning user; exactly one integration per user.
    #[sea_orm(unique)]
    pub user_id: Uuid,
    /// External platform user ID.
    pub gitlab_user_id: i64,
    /// External username.
    pub gitlab_username: String,
    /// External email, when visible.
    pub gitlab_email: Option<String>,

    // ─── Credential ──────────────────────────────────────────────────────────
    /// Encrypted access token blob.
    #[sea_orm(column_type = "Text")]
    pub access_token: String,
    /// Encrypted refresh token blob.
    #[sea_orm(column_type = "Text")]
    pub refresh_token: String,
    /// Access-token expiry.
    pub token_expires_at: Option<DateTimeWithTimeZone>,

    // ─── Tracked Repositories ────────────────────────────────────────────────
    /// JSON array of `TrackedRepository`.
    #[sea_orm(column_type = "Json")]
    pub repositories: serde_json::Value,

    // ─── Capabilities ────────────────────────────────────────────────────────
    #[sea_orm(default_value = true)]
    pub can_access_repositories: bool,
    #[sea_orm(default_value = true)]
    pub can_track_commits: bool,
    #[sea_orm(default_value = true)]
    pub can_manage_issues: bool,
    #[sea_orm(default_value = true)]
    pub can_view_analytics: bool,

    // ─── Sync Bookkeeping ────────────────────────────────────────────────────
    /// Last attempted sync, successful or not.
    pub last_sync_at: Option<DateTimeWithTimeZone>,
    /// Last sync that recorded zero errors; drives the incremental window.
    pub last_successful_sync_at: Option<DateTimeWithTimeZone>,
    /// JSON array of `SyncErrorEntry`, bounded to the most recent.
    #[sea_orm(column_type = "Json")]
    pub sync_errors: serde_json::Value,

    // ─── Lifecycle ───────────────────────────────────────────────────────────
    /// Soft-enable flag; disconnect clears it, the row is never deleted.
    #[sea_orm(default_value = true)]
    pub is_active: bool,
    /// User-visible connection toggle.
    #[sea_orm(default_value = true)]
    pub is_connected: bool,

    // ─── Timestamps ──────────────────────────────────────────────────────────
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Parse the tracked-repository list, tolerating a malformed column.
    #[must_use]
    pub fn tracked_repositories(&self) -> Vec<TrackedRepository> {
        serde_json::from_value(self.repositories.clone()).unwrap_or_default()
    }

    /// Parse the sync-error log, tolerating a malformed column.
    #[must_use]
    pub fn sync_error_log(&self) -> Vec<SyncErrorEntry> {
        serde_json::from_value(self.sync_errors.clone()).unwrap_or_default()
    }

    /// Count of repositories with the tracked flag set.
    #[must_use]
    pub fn tracked_repo_count(&self) -> usize {
        self.tracked_repositories()
            .iter()
            .filter(|r| r.is_tracked)
            .count()
    }

    /// Whether the access token is expired as of `now`.
    #[must_use]
    pub fn token_expired(&self, now: DateTime<Utc>) -> bool {
        match self.token_expires_at {
            Some(expires_at) => expires_at.with_timezone(&Utc) <= now,
            // No recorded expiry means the credential cannot be trusted.
            None => true,
        }
    }
}

/// Append to the error log, evicting the oldest entries beyond the bound.
pub fn append_sync_error(log: &mut Vec<SyncErrorEntry>, entry: SyncErrorEntry) {
    log.push(entry);
    if log.len() > MAX_SYNC_ERRORS {
        let excess = log.len() - MAX_SYNC_ERRORS;
        log.drain(..excess);
    }
}
