//! ActivityRecord entity - one synchronized unit of external activity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::activity_kind::ActivityKind;
use super::activity_metadata::ActivityMetadata;

/// Default complexity score assigned on insert.
pub const DEFAULT_COMPLEXITY: i32 = 5;

/// Impact classification of an activity. Defaulted on insert, refinable
/// later without re-syncing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    #[sea_orm(string_value = "low")]
    Low,
    #[sea_orm(string_value = "medium")]
    Medium,
    #[sea_orm(string_value = "high")]
    High,
}

impl Default for Impact {
    fn default() -> Self {
        Impact::Medium
    }
}

impl std::fmt::Display for Impact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Impact::Low => "low",
            Impact::Medium => "medium",
            Impact::High => "high",
        };
        write!(f, "{s}")
    }
}

/// ActivityRecord model - deduplicated store of synchronized activity.
///
/// The (`external_id`, `kind`) pair is the natural key: re-sync updates
/// the existing row, never duplicates it. Identity and project-context
/// fields are immutable once created; only content, metadata, and
/// timestamps change on re-sync.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activity_records")]
pub struct Model {
    /// Internal UUID primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    // ─── Identity ────────────────────────────────────────────────────────────
    /// Owning user.
    pub user_id: Uuid,
    /// External activity id; unique together with `kind`.
    pub external_id: String,
    /// Activity kind discriminator.
    pub kind: ActivityKind,

    // ─── Project Context ─────────────────────────────────────────────────────
    /// External project ID.
    pub project_id: i64,
    /// Project display name.
    pub project_name: String,
    /// Full slug path (e.g., "group/project").
    pub project_path: Option<String>,
    /// Web URL to the project.
    pub project_url: Option<String>,

    // ─── Content ─────────────────────────────────────────────────────────────
    /// Activity title (commit title, issue title, ...).
    pub title: String,
    /// Free-text body.
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    /// Canonical URL of the activity.
    pub url: Option<String>,
    /// When the activity happened upstream.
    pub occurred_at: DateTimeWithTimeZone,
    /// When the activity was last updated upstream.
    pub activity_updated_at: Option<DateTimeWithTimeZone>,

    // ─── Kind-Specific Metadata ──────────────────────────────────────────────
    /// Kind-specific payload stored as JSON; see `activity_metadata`.
    #[sea_orm(column_type = "Json")]
    pub metadata: serde_json::Value,

    // ─── Derived ─────────────────────────────────────────────────────────────
    /// Impact classification; defaulted on insert, preserved on update.
    pub impact: Impact,
    /// Complexity score in 1..=10; defaulted on insert, preserved on update.
    pub complexity: i32,

    // ─── Tracking ────────────────────────────────────────────────────────────
    /// When this record was last reconciled from the platform.
    pub last_synced_at: DateTimeWithTimeZone,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Parse the kind-specific metadata payload.
    ///
    /// Returns `None` for kinds without a typed payload or when the stored
    /// JSON does not match the expected shape.
    #[must_use]
    pub fn typed_metadata(&self) -> Option<ActivityMetadata> {
        ActivityMetadata::from_json(self.kind, &self.metadata)
            .ok()
            .flatten()
    }

    /// Lines added and deleted, for commit records with stats.
    #[must_use]
    pub fn line_churn(&self) -> (i64, i64) {
        self.typed_metadata()
            .and_then(|m| m.line_churn())
            .unwrap_or((0, 0))
    }
}
