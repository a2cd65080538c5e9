//! Typed kind-specific metadata structs for the activity `metadata` JSON column.
//!
//! Each activity kind carries a different payload shape. The structs here
//! give type-safe access to the stored JSON, and the unified enum ties the
//! payload to its kind so a commit can never carry issue metadata.
//!
//! # Usage
//!
//! ```ignore
//! use glsync::entity::activity_metadata::{ActivityMetadata, CommitMeta};
//!
//! // Parse from the JSON stored in the database
//! let meta = ActivityMetadata::from_json(record.kind, &record.metadata)?;
//!
//! // Or build for storage
//! let json = ActivityMetadata::Commit(CommitMeta::default()).to_json();
//! ```

use serde::{Deserialize, Serialize};

use super::activity_kind::ActivityKind;

/// A user reference stored inside issue and merge-request metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssigneeRef {
    pub id: u64,
    pub username: String,
    pub name: Option<String>,
}

/// A milestone reference stored inside issue metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MilestoneRef {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
}

/// Commit-specific metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitMeta {
    /// Full commit SHA.
    pub sha: String,
    /// Lines added; filled from the single-commit detail lookup.
    pub additions: Option<i64>,
    /// Lines deleted; filled from the single-commit detail lookup.
    pub deletions: Option<i64>,
    /// Parent commit SHAs.
    pub parent_ids: Vec<String>,
    /// Branch the commit was observed on, when known.
    pub branch: Option<String>,
}

/// Issue-specific metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueMeta {
    /// Issue state: "opened" or "closed".
    pub state: String,
    /// Label names.
    pub labels: Vec<String>,
    /// Assigned users.
    pub assignees: Vec<AssigneeRef>,
    /// Milestone, if set.
    pub milestone: Option<MilestoneRef>,
}

/// Merge-request-specific metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeRequestMeta {
    /// MR state: "opened", "closed", "merged", or "locked".
    pub state: String,
    pub source_branch: String,
    pub target_branch: String,
    /// Changed-file count as reported by the API ("5", "1000+").
    pub changes_count: Option<String>,
    /// Merge readiness, e.g. "can_be_merged".
    pub merge_status: Option<String>,
    /// Label names.
    pub labels: Vec<String>,
    /// Assigned users.
    pub assignees: Vec<AssigneeRef>,
}

/// Review-specific metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewMeta {
    /// Review verdict, e.g. "approved" or "changes_requested".
    pub verdict: String,
    /// The merge request the review belongs to, when known.
    pub merge_request_iid: Option<u64>,
}

/// Unified enum tying each payload to its activity kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ActivityMetadata {
    Commit(CommitMeta),
    Issue(IssueMeta),
    MergeRequest(MergeRequestMeta),
    Review(ReviewMeta),
}

impl ActivityMetadata {
    /// Parse metadata from the stored JSON based on the record's kind.
    ///
    /// Comment and push activities carry no typed payload; they return
    /// `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be deserialized into the shape
    /// expected for the kind.
    pub fn from_json(
        kind: ActivityKind,
        json: &serde_json::Value,
    ) -> Result<Option<Self>, serde_json::Error> {
        match kind {
            ActivityKind::Commit => {
                let meta: CommitMeta = serde_json::from_value(json.clone())?;
                Ok(Some(ActivityMetadata::Commit(meta)))
            }
            ActivityKind::Issue => {
                let meta: IssueMeta = serde_json::from_value(json.clone())?;
                Ok(Some(ActivityMetadata::Issue(meta)))
            }
            ActivityKind::MergeRequest => {
                let meta: MergeRequestMeta = serde_json::from_value(json.clone())?;
                Ok(Some(ActivityMetadata::MergeRequest(meta)))
            }
            ActivityKind::Review => {
                let meta: ReviewMeta = serde_json::from_value(json.clone())?;
                Ok(Some(ActivityMetadata::Review(meta)))
            }
            ActivityKind::Comment | ActivityKind::Push => Ok(None),
        }
    }

    /// Convert to a JSON value suitable for storage.
    ///
    /// The inner payload is stored without the enum wrapper; the record's
    /// `kind` column is the discriminator.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ActivityMetadata::Commit(m) => {
                serde_json::to_value(m).unwrap_or(serde_json::Value::Null)
            }
            ActivityMetadata::Issue(m) => {
                serde_json::to_value(m).unwrap_or(serde_json::Value::Null)
            }
            ActivityMetadata::MergeRequest(m) => {
                serde_json::to_value(m).unwrap_or(serde_json::Value::Null)
            }
            ActivityMetadata::Review(m) => {
                serde_json::to_value(m).unwrap_or(serde_json::Value::Null)
            }
        }
    }

    /// The activity kind this payload belongs to.
    #[must_use]
    pub fn kind(&self) -> ActivityKind {
        match self {
            ActivityMetadata::Commit(_) => ActivityKind::Commit,
            ActivityMetadata::Issue(_) => ActivityKind::Issue,
            ActivityMetadata::MergeRequest(_) => ActivityKind::MergeRequest,
            ActivityMetadata::Review(_) => ActivityKind::Review,
        }
    }

    /// Line churn (additions, deletions), available on commits only.
    #[must_use]
    pub fn line_churn(&self) -> Option<(i64, i64)> {
        match self {
            ActivityMetadata::Commit(m) => {
                Some((m.additions.unwrap_or(0), m.deletions.unwrap_or(0)))
            }
            _ => None,
        }
    }
}
