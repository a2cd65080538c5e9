use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::entity::activity_record::{
    ActiveModel as ActivityActiveModel, Column as ActivityColumn, Entity as ActivityRecord,
    Impact, Model as ActivityModel, DEFAULT_COMPLEXITY,
};
use crate::entity::activity_kind::ActivityKind;
use crate::entity::integration::{
    ActiveModel as IntegrationActiveModel, Column as IntegrationColumn, Entity as Integration,
    Model as IntegrationModel,
};

use super::errors::{Result, StoreError};

// ─── Activity Records ────────────────────────────────────────────────────────

/// Find an activity record by its natural key (external_id + kind).
pub async fn find_activity_by_natural_key(
    db: &DatabaseConnection,
    external_id: &str,
    kind: ActivityKind,
) -> Result<Option<ActivityModel>> {
    ActivityRecord::find()
        .filter(ActivityColumn::ExternalId.eq(external_id))
        .filter(ActivityColumn::Kind.eq(kind))
        .one(db)
        .await
        .map_err(StoreError::from)
}

/// Insert or update an activity record by its natural key (external_id + kind).
///
/// On insert, missing derived fields get their defaults. On update, only
/// the mutable fields change (title, description, url, metadata, update
/// timestamp); identity, project context, impact, and complexity are
/// preserved. Returns the stored model and whether a new row was created.
pub async fn upsert_activity(
    db: &DatabaseConnection,
    model: ActivityActiveModel,
) -> Result<(ActivityModel, bool)> {
    let external_id = required_active_value("external_id", &model.external_id)?;
    let kind = required_active_value("kind", &model.kind)?;

    let existing = find_activity_by_natural_key(db, &external_id, kind).await?;
    let now = Utc::now().fixed_offset();

    match existing {
        Some(existing) => {
            let update = ActivityActiveModel {
                id: Set(existing.id),
                title: model.title,
                description: model.description,
                url: model.url,
                metadata: model.metadata,
                activity_updated_at: model.activity_updated_at,
                last_synced_at: model.last_synced_at,
                updated_at: Set(now),
                ..Default::default()
            };
            let saved = update.update(db).await?;
            Ok((saved, false))
        }
        None => {
            let mut insert = model;
            if insert.id.is_not_set() {
                insert.id = Set(Uuid::new_v4());
            }
            if insert.impact.is_not_set() {
                insert.impact = Set(Impact::default());
            }
            if insert.complexity.is_not_set() {
                insert.complexity = Set(DEFAULT_COMPLEXITY);
            }
            if insert.created_at.is_not_set() {
                insert.created_at = Set(now);
            }
            if insert.updated_at.is_not_set() {
                insert.updated_at = Set(now);
            }
            let saved = insert.insert(db).await?;
            Ok((saved, true))
        }
    }
}

// ─── Integrations ────────────────────────────────────────────────────────────

/// Find the integration for a user.
pub async fn find_integration(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> Result<Option<IntegrationModel>> {
    Integration::find()
        .filter(IntegrationColumn::UserId.eq(user_id))
        .one(db)
        .await
        .map_err(StoreError::from)
}

/// Insert or update the integration for a user (exactly one per user).
///
/// On update, only the fields set on the incoming model change, so callers
/// can refresh credentials without touching bookkeeping and vice versa.
pub async fn upsert_integration(
    db: &DatabaseConnection,
    model: IntegrationActiveModel,
) -> Result<IntegrationModel> {
    let user_id = required_active_value("user_id", &model.user_id)?;

    let existing = find_integration(db, user_id).await?;
    let now = Utc::now().fixed_offset();

    match existing {
        Some(existing) => {
            let mut update = model;
            update.id = Set(existing.id);
            update.created_at = ActiveValue::NotSet;
            update.updated_at = Set(now);
            update.update(db).await.map_err(StoreError::from)
        }
        None => {
            let mut insert = model;
            if insert.id.is_not_set() {
                insert.id = Set(Uuid::new_v4());
            }
            if insert.repositories.is_not_set() {
                insert.repositories = Set(serde_json::json!([]));
            }
            if insert.sync_errors.is_not_set() {
                insert.sync_errors = Set(serde_json::json!([]));
            }
            if insert.created_at.is_not_set() {
                insert.created_at = Set(now);
            }
            if insert.updated_at.is_not_set() {
                insert.updated_at = Set(now);
            }
            insert.insert(db).await.map_err(StoreError::from)
        }
    }
}

fn required_active_value<T: Clone + Into<sea_orm::Value>>(
    field: &str,
    value: &ActiveValue<T>,
) -> Result<T> {
    match value {
        ActiveValue::Set(value) | ActiveValue::Unchanged(value) => Ok(value.clone()),
        ActiveValue::NotSet => Err(StoreError::InvalidInput {
            message: format!("Missing required field: {}", field),
        }),
    }
}
