//! Common re-exports for convenient entity usage.

pub use super::activity_kind::ActivityKind;
pub use super::activity_metadata::{
    ActivityMetadata, AssigneeRef, CommitMeta, IssueMeta, MergeRequestMeta, MilestoneRef,
    ReviewMeta,
};
pub use super::activity_record::{
    ActiveModel as ActivityRecordActiveModel, Column as ActivityRecordColumn,
    Entity as ActivityRecord, Impact, Model as ActivityRecordModel, DEFAULT_COMPLEXITY,
};
pub use super::integration::{
    append_sync_error, ActiveModel as IntegrationActiveModel, Column as IntegrationColumn,
    Entity as Integration, Model as IntegrationModel, SyncErrorEntry, TrackedRepository,
    MAX_SYNC_ERRORS,
};
