//! Shared types for the sync engine.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use uuid::Uuid;

use crate::gitlab::OAuthClient;
use crate::http::HttpTransport;
use crate::rate_limit::DEFAULT_RPS;
use crate::vault::Vault;

/// Incremental window never reaches further back than this many days.
pub const SYNC_WINDOW_DAYS: i64 = 30;

/// Projects fetched concurrently within one user's pass.
pub const DEFAULT_PROJECT_CONCURRENCY: usize = 4;

/// Half-open window [since, until) for one incremental pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncWindow {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

impl SyncWindow {
    /// Compute the window for a pass starting at `now`.
    ///
    /// The window starts at the last fully successful sync, floored at
    /// thirty days back, so a long-dead integration does not trigger an
    /// unbounded backfill.
    #[must_use]
    pub fn compute(last_successful: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        let floor = now - Duration::days(SYNC_WINDOW_DAYS);
        let since = match last_successful {
            Some(last) if last > floor => last,
            _ => floor,
        };
        Self { since, until: now }
    }
}

/// Created/updated tally for one activity kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindCounts {
    pub created: u64,
    pub updated: u64,
}

impl KindCounts {
    pub fn record(&mut self, created: bool) {
        if created {
            self.created += 1;
        } else {
            self.updated += 1;
        }
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.created + self.updated
    }
}

/// Outcome of one user's sync pass.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub user_id: Uuid,
    pub window: SyncWindow,
    pub commits: KindCounts,
    pub issues: KindCounts,
    pub merge_requests: KindCounts,
    /// Tracked repositories the pass attempted.
    pub projects_attempted: usize,
    /// Per-repository failures; the pass still completed.
    pub errors: Vec<String>,
    /// Non-fatal data-integrity warnings (e.g. fallback token decodes).
    pub warnings: Vec<String>,
}

impl SyncReport {
    #[must_use]
    pub fn new(user_id: Uuid, window: SyncWindow) -> Self {
        Self {
            user_id,
            window,
            commits: KindCounts::default(),
            issues: KindCounts::default(),
            merge_requests: KindCounts::default(),
            projects_attempted: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Total records written in this pass.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.commits.total() + self.issues.total() + self.merge_requests.total()
    }

    /// Whether the pass recorded zero errors.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// The pass as an error, when some repositories failed.
    #[must_use]
    pub fn partial_failure(&self) -> Option<crate::error::SyncError> {
        if self.errors.is_empty() {
            None
        } else {
            Some(crate::error::SyncError::PartialSyncFailure {
                failed: self.errors.len(),
                attempted: self.projects_attempted,
            })
        }
    }
}

/// Tunables for a sync pass.
#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    /// Per-credential request pacing.
    pub requests_per_second: u32,
    /// Concurrent per-project fetches within one pass.
    pub project_concurrency: usize,
    /// Fetch per-commit line stats via the detail endpoint.
    pub enrich_commit_stats: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            requests_per_second: DEFAULT_RPS,
            project_concurrency: DEFAULT_PROJECT_CONCURRENCY,
            enrich_commit_stats: true,
        }
    }
}

/// Everything a sync pass needs, shared across users and attempts.
pub struct SyncContext {
    pub db: DatabaseConnection,
    pub vault: Vault,
    pub oauth: OAuthClient,
    pub transport: Arc<dyn HttpTransport>,
    /// Platform root, e.g. "https://gitlab.com".
    pub base_url: String,
    pub options: SyncOptions,
}

impl std::fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncContext")
            .field("base_url", &self.base_url)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl SyncContext {
    pub fn new(
        db: DatabaseConnection,
        vault: Vault,
        oauth: OAuthClient,
        transport: Arc<dyn HttpTransport>,
        base_url: impl Into<String>,
        options: SyncOptions,
    ) -> Self {
        Self {
            db,
            vault,
            oauth,
            transport,
            base_url: base_url.into(),
            options,
        }
    }
}
