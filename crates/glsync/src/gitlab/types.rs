//! GitLab API wire types.
//!
//! Strongly-typed views of the v4 REST responses, limited to the fields
//! the sync engine consumes.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// The authenticated user, from `/user`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabUser {
    /// User ID.
    pub id: u64,
    /// Username.
    pub username: String,
    /// Display name.
    pub name: Option<String>,
    /// Email (may be hidden by privacy settings).
    pub email: Option<String>,
    /// Public email address.
    #[serde(default)]
    pub public_email: Option<String>,
}

impl GitLabUser {
    /// Best available email for commit-author matching.
    #[must_use]
    pub fn best_email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .filter(|e| !e.is_empty())
            .or(self.public_email.as_deref().filter(|e| !e.is_empty()))
    }
}

/// A project the user is a member of, from `/projects`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabProject {
    /// Project ID.
    pub id: u64,
    /// Project name.
    pub name: String,
    /// Human-readable name including namespace (e.g., "Group / Project").
    pub name_with_namespace: String,
    /// Full slug path (e.g., "group/project").
    pub path_with_namespace: String,
    /// Project description.
    pub description: Option<String>,
    /// Web URL to the project.
    pub web_url: String,
    /// When the project was last active.
    pub last_activity_at: Option<DateTime<Utc>>,
}

/// A commit, from list or single-commit endpoints.
///
/// `stats` is only present on the single-commit detail response; listings
/// omit it, so the orchestrator enriches commits one at a time.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabCommit {
    /// Full commit SHA.
    pub id: String,
    /// Commit title (first line of the message).
    pub title: String,
    /// Full commit message.
    #[serde(default)]
    pub message: Option<String>,
    /// Author name as recorded in the commit.
    #[serde(default)]
    pub author_name: Option<String>,
    /// Author email as recorded in the commit.
    #[serde(default)]
    pub author_email: Option<String>,
    /// Authoring timestamp.
    pub created_at: DateTime<Utc>,
    /// Parent commit SHAs.
    #[serde(default)]
    pub parent_ids: Vec<String>,
    /// Web URL to the commit.
    #[serde(default)]
    pub web_url: Option<String>,
    /// Line-change stats; detail endpoint only.
    pub stats: Option<CommitStats>,
}

/// Line-change statistics for a single commit.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct CommitStats {
    pub additions: i64,
    pub deletions: i64,
    pub total: i64,
}

/// An issue assigned to the user, from `/issues`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabIssue {
    /// Globally unique issue ID.
    pub id: u64,
    /// Project-scoped issue number.
    pub iid: u64,
    /// Owning project ID.
    pub project_id: u64,
    /// Issue title.
    pub title: String,
    /// Issue body.
    pub description: Option<String>,
    /// State: "opened" or "closed".
    pub state: String,
    /// Label names.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Assigned users.
    #[serde(default)]
    pub assignees: Vec<GitLabAssignee>,
    /// Milestone, if set.
    pub milestone: Option<GitLabMilestone>,
    /// Web URL to the issue.
    #[serde(default)]
    pub web_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A merge request authored by the user, from `/merge_requests`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabMergeRequest {
    /// Globally unique MR ID.
    pub id: u64,
    /// Project-scoped MR number.
    pub iid: u64,
    /// Owning project ID.
    pub project_id: u64,
    /// MR title.
    pub title: String,
    /// MR body.
    pub description: Option<String>,
    /// State: "opened", "closed", "merged", or "locked".
    pub state: String,
    pub source_branch: String,
    pub target_branch: String,
    /// Merge readiness, e.g. "can_be_merged".
    #[serde(default)]
    pub merge_status: Option<String>,
    /// Changed-file count; the API returns a string ("5", "1000+").
    #[serde(default)]
    pub changes_count: Option<String>,
    /// Label names.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Assigned users.
    #[serde(default)]
    pub assignees: Vec<GitLabAssignee>,
    /// Web URL to the merge request.
    #[serde(default)]
    pub web_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A user reference embedded in issues and merge requests.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabAssignee {
    pub id: u64,
    pub username: String,
    pub name: Option<String>,
}

/// A milestone reference embedded in issues.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabMilestone {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
}
