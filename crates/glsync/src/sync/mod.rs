//! The synchronization engine: incremental passes, scheduling, locks.

pub mod engine;
pub mod scheduler;
pub mod types;

pub use engine::sync_user;
pub use scheduler::{
    run_scheduled_sync, ScheduledRun, SyncLocks, MAX_WORKERS, MIN_WORKERS, SCHEDULER_WORKERS,
    SYNC_ATTEMPT_TIMEOUT_SECS,
};
pub use types::{
    KindCounts, SyncContext, SyncOptions, SyncReport, SyncWindow, DEFAULT_PROJECT_CONCURRENCY,
    SYNC_WINDOW_DAYS,
};
