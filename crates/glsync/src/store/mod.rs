//! The activity store: deduplicated persistence and read-side aggregations.

pub mod analytics;
pub mod errors;
pub mod query;
pub mod single;

pub use analytics::{
    compute_report, get_analytics, AnalyticsReport, DailyBucket, DateRange, ProjectRollup,
    TypeStats, DEFAULT_RANGE_DAYS,
};
pub use errors::StoreError;
pub use query::{
    count_activities, find_active_integrations, list_activities_in_range, list_commits,
    CommitFilter,
};
pub use single::{
    find_activity_by_natural_key, find_integration, upsert_activity, upsert_integration,
};
