//! GitLab synchronization engine.
//!
//! Connects per-user GitLab accounts over OAuth, incrementally syncs
//! commits, issues, and merge requests into a local activity store, and
//! serves cached reads and analytics over it. The platform is the source
//! of truth; the store is a deduplicated cache reconciled by natural-key
//! upserts, so overlapping windows and repeated passes are harmless.
//!
//! The [`service::SyncService`] facade is the main entry point; the
//! lower layers (gitlab client, vault, store, engine) are public for
//! callers composing their own flows.

pub mod db;
pub mod entity;
pub mod error;
pub mod gitlab;
pub mod http;
#[cfg(feature = "migrate")]
pub mod migration;
pub mod rate_limit;
pub mod retry;
pub mod service;
pub mod store;
pub mod sync;
pub mod token;
pub mod vault;

pub use error::{Result, SyncError};
pub use service::{ConnectionStatus, SyncService};
pub use sync::{SyncContext, SyncOptions, SyncReport};
