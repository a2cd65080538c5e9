//! Scheduled sync over all active integrations.
//!
//! A bounded worker pool drives one pass per user. A per-user async lock
//! guarantees no two passes for the same user overlap, including a
//! manual sync racing the schedule.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::error::{Result, SyncError};
use crate::store::find_active_integrations;

use super::engine::sync_user;
use super::types::{SyncContext, SyncReport};

/// Default worker-pool size for a scheduled run.
pub const SCHEDULER_WORKERS: usize = 4;

/// Allowed worker-pool bounds.
pub const MIN_WORKERS: usize = 3;
pub const MAX_WORKERS: usize = 5;

/// Wall-clock cap on one user's pass within a scheduled run.
pub const SYNC_ATTEMPT_TIMEOUT_SECS: u64 = 300;

/// Per-user sync locks, shared between the scheduler and manual syncs.
#[derive(Default)]
pub struct SyncLocks {
    inner: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl SyncLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock guarding syncs for one user, created on first use.
    pub fn lock_for(&self, user_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(map.entry(user_id).or_default())
    }
}

impl std::fmt::Debug for SyncLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncLocks").finish_non_exhaustive()
    }
}

/// Outcome of one scheduled run across all active integrations.
#[derive(Debug)]
pub struct ScheduledRun {
    /// Integrations the run attempted.
    pub attempted: usize,
    /// Per-user outcomes in completion order.
    pub results: Vec<(Uuid, Result<SyncReport>)>,
}

impl ScheduledRun {
    /// Users whose pass completed (possibly with per-repository errors).
    #[must_use]
    pub fn completed(&self) -> usize {
        self.results.iter().filter(|(_, r)| r.is_ok()).count()
    }

    /// Users whose pass aborted.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|(_, r)| r.is_err()).count()
    }
}

/// Sync every active integration with a bounded worker pool.
///
/// One user's failure never stops the run; each outcome is reported
/// individually. `workers` is clamped to the allowed pool bounds.
#[tracing::instrument(skip(ctx, locks))]
pub async fn run_scheduled_sync(
    ctx: Arc<SyncContext>,
    locks: Arc<SyncLocks>,
    workers: usize,
) -> Result<ScheduledRun> {
    let integrations = find_active_integrations(&ctx.db).await?;
    let attempted = integrations.len();
    tracing::info!(integrations = attempted, "scheduled sync starting");

    let pool = Arc::new(Semaphore::new(workers.clamp(MIN_WORKERS, MAX_WORKERS)));
    let mut tasks = JoinSet::new();

    for integration in integrations {
        let ctx = Arc::clone(&ctx);
        let pool = Arc::clone(&pool);
        let lock = locks.lock_for(integration.user_id);
        let user_id = integration.user_id;

        tasks.spawn(async move {
            let _permit = pool.acquire_owned().await;
            let _guard = lock.lock_owned().await;

            let result = match tokio::time::timeout(
                Duration::from_secs(SYNC_ATTEMPT_TIMEOUT_SECS),
                sync_user(&ctx, user_id),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(SyncError::upstream(format!(
                    "sync timed out after {SYNC_ATTEMPT_TIMEOUT_SECS}s"
                ))),
            };
            (user_id, result)
        });
    }

    let mut results = Vec::with_capacity(attempted);
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((user_id, result)) => {
                if let Err(err) = &result {
                    tracing::warn!(user_id = %user_id, error = %err, "scheduled sync failed for user");
                }
                results.push((user_id, result));
            }
            Err(join_err) => {
                tracing::error!(error = %join_err, "scheduled sync task panicked");
            }
        }
    }

    let run = ScheduledRun { attempted, results };
    tracing::info!(
        attempted = run.attempted,
        completed = run.completed(),
        failed = run.failed(),
        "scheduled sync finished"
    );
    Ok(run)
}
