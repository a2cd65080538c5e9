use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use uuid::Uuid;

use crate::entity::activity_kind::ActivityKind;
use crate::entity::activity_record::{
    Column as ActivityColumn, Entity as ActivityRecord, Model as ActivityModel,
};
use crate::entity::integration::{
    Column as IntegrationColumn, Entity as Integration, Model as IntegrationModel,
};

use super::errors::{Result, StoreError};

// ─── Integrations ────────────────────────────────────────────────────────────

/// List all active integrations, for the scheduler.
pub async fn find_active_integrations(db: &DatabaseConnection) -> Result<Vec<IntegrationModel>> {
    Integration::find()
        .filter(IntegrationColumn::IsActive.eq(true))
        .all(db)
        .await
        .map_err(StoreError::from)
}

// ─── Activity Records ────────────────────────────────────────────────────────

/// Filters for commit reads.
#[derive(Debug, Clone, Default)]
pub struct CommitFilter {
    /// Restrict to one project.
    pub project_id: Option<i64>,
    /// Inclusive lower bound on the activity timestamp.
    pub since: Option<DateTime<Utc>>,
    /// Exclusive upper bound on the activity timestamp.
    pub until: Option<DateTime<Utc>>,
    /// Maximum number of records returned.
    pub limit: Option<u64>,
}

/// List a user's stored commits, most recent first.
pub async fn list_commits(
    db: &DatabaseConnection,
    user_id: Uuid,
    filter: &CommitFilter,
) -> Result<Vec<ActivityModel>> {
    let mut query = ActivityRecord::find()
        .filter(ActivityColumn::UserId.eq(user_id))
        .filter(ActivityColumn::Kind.eq(ActivityKind::Commit));

    if let Some(project_id) = filter.project_id {
        query = query.filter(ActivityColumn::ProjectId.eq(project_id));
    }
    if let Some(since) = filter.since {
        query = query.filter(ActivityColumn::OccurredAt.gte(since));
    }
    if let Some(until) = filter.until {
        query = query.filter(ActivityColumn::OccurredAt.lt(until));
    }

    let mut query = query.order_by_desc(ActivityColumn::OccurredAt);
    if let Some(limit) = filter.limit {
        query = query.limit(limit);
    }

    query.all(db).await.map_err(StoreError::from)
}

/// List all of a user's activity within [start, end), ascending by time.
pub async fn list_activities_in_range(
    db: &DatabaseConnection,
    user_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<ActivityModel>> {
    ActivityRecord::find()
        .filter(ActivityColumn::UserId.eq(user_id))
        .filter(ActivityColumn::OccurredAt.gte(start))
        .filter(ActivityColumn::OccurredAt.lt(end))
        .order_by_asc(ActivityColumn::OccurredAt)
        .all(db)
        .await
        .map_err(StoreError::from)
}

/// Total stored activity count for a user.
pub async fn count_activities(db: &DatabaseConnection, user_id: Uuid) -> Result<u64> {
    ActivityRecord::find()
        .filter(ActivityColumn::UserId.eq(user_id))
        .count(db)
        .await
        .map_err(StoreError::from)
}
