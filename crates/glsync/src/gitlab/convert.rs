//! Conversion from GitLab wire types to activity-store active models.

use chrono::Utc;
use sea_orm::Set;
use uuid::Uuid;

use super::types::{GitLabCommit, GitLabIssue, GitLabMergeRequest, GitLabProject};
use crate::entity::activity_kind::ActivityKind;
use crate::entity::activity_metadata::{
    ActivityMetadata, AssigneeRef, CommitMeta, IssueMeta, MergeRequestMeta, MilestoneRef,
};
use crate::entity::activity_record::ActiveModel as ActivityActiveModel;

/// Project context attached to every reconciled activity.
///
/// Issues and merge requests arrive from global endpoints, so the owning
/// project may not be in the listing fetched for commits; the fallback
/// keeps reconciliation going with a placeholder name.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    pub id: i64,
    pub name: String,
    pub path: Option<String>,
    pub url: Option<String>,
}

impl ProjectContext {
    /// Placeholder context for a project the listing did not include.
    #[must_use]
    pub fn unknown(project_id: i64) -> Self {
        Self {
            id: project_id,
            name: "Unknown Project".to_string(),
            path: None,
            url: None,
        }
    }
}

impl From<&GitLabProject> for ProjectContext {
    fn from(project: &GitLabProject) -> Self {
        Self {
            id: project.id as i64,
            name: project.name_with_namespace.clone(),
            path: Some(project.path_with_namespace.clone()),
            url: Some(project.web_url.clone()),
        }
    }
}

/// Build the upsert model for one commit.
///
/// `branch` is the ref the commit was observed on, when known; stats come
/// from the single-commit detail lookup and may be absent.
#[must_use]
pub fn commit_to_active_model(
    user_id: Uuid,
    commit: &GitLabCommit,
    project: &ProjectContext,
    branch: Option<String>,
) -> ActivityActiveModel {
    let meta = ActivityMetadata::Commit(CommitMeta {
        sha: commit.id.clone(),
        additions: commit.stats.map(|s| s.additions),
        deletions: commit.stats.map(|s| s.deletions),
        parent_ids: commit.parent_ids.clone(),
        branch,
    });

    ActivityActiveModel {
        user_id: Set(user_id),
        external_id: Set(commit.id.clone()),
        kind: Set(ActivityKind::Commit),
        project_id: Set(project.id),
        project_name: Set(project.name.clone()),
        project_path: Set(project.path.clone()),
        project_url: Set(project.url.clone()),
        title: Set(commit.title.clone()),
        description: Set(commit.message.clone()),
        url: Set(commit.web_url.clone()),
        occurred_at: Set(commit.created_at.fixed_offset()),
        activity_updated_at: Set(None),
        metadata: Set(meta.to_json()),
        last_synced_at: Set(Utc::now().fixed_offset()),
        ..Default::default()
    }
}

/// Build the upsert model for one issue.
#[must_use]
pub fn issue_to_active_model(
    user_id: Uuid,
    issue: &GitLabIssue,
    project: &ProjectContext,
) -> ActivityActiveModel {
    let meta = ActivityMetadata::Issue(IssueMeta {
        state: issue.state.clone(),
        labels: issue.labels.clone(),
        assignees: issue.assignees.iter().map(assignee_ref).collect(),
        milestone: issue.milestone.as_ref().map(|m| MilestoneRef {
            id: m.id,
            title: m.title.clone(),
            description: m.description.clone(),
        }),
    });

    ActivityActiveModel {
        user_id: Set(user_id),
        external_id: Set(issue.id.to_string()),
        kind: Set(ActivityKind::Issue),
        project_id: Set(project.id),
        project_name: Set(project.name.clone()),
        project_path: Set(project.path.clone()),
        project_url: Set(project.url.clone()),
        title: Set(issue.title.clone()),
        description: Set(issue.description.clone()),
        url: Set(issue.web_url.clone()),
        occurred_at: Set(issue.created_at.fixed_offset()),
        activity_updated_at: Set(issue.updated_at.map(|t| t.fixed_offset())),
        metadata: Set(meta.to_json()),
        last_synced_at: Set(Utc::now().fixed_offset()),
        ..Default::default()
    }
}

/// Build the upsert model for one merge request.
#[must_use]
pub fn merge_request_to_active_model(
    user_id: Uuid,
    mr: &GitLabMergeRequest,
    project: &ProjectContext,
) -> ActivityActiveModel {
    let meta = ActivityMetadata::MergeRequest(MergeRequestMeta {
        state: mr.state.clone(),
        source_branch: mr.source_branch.clone(),
        target_branch: mr.target_branch.clone(),
        changes_count: mr.changes_count.clone(),
        merge_status: mr.merge_status.clone(),
        labels: mr.labels.clone(),
        assignees: mr.assignees.iter().map(assignee_ref).collect(),
    });

    ActivityActiveModel {
        user_id: Set(user_id),
        external_id: Set(mr.id.to_string()),
        kind: Set(ActivityKind::MergeRequest),
        project_id: Set(project.id),
        project_name: Set(project.name.clone()),
        project_path: Set(project.path.clone()),
        project_url: Set(project.url.clone()),
        title: Set(mr.title.clone()),
        description: Set(mr.description.clone()),
        url: Set(mr.web_url.clone()),
        occurred_at: Set(mr.created_at.fixed_offset()),
        activity_updated_at: Set(mr.updated_at.map(|t| t.fixed_offset())),
        metadata: Set(meta.to_json()),
        last_synced_at: Set(Utc::now().fixed_offset()),
        ..Default::default()
    }
}

fn assignee_ref(a: &super::types::GitLabAssignee) -> AssigneeRef {
    AssigneeRef {
        id: a.id,
        username: a.username.clone(),
        name: a.name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gitlab::types::{CommitStats, GitLabAssignee, GitLabMilestone};
    use chrono::TimeZone;
    use sea_orm::ActiveValue;

    fn project() -> ProjectContext {
        ProjectContext {
            id: 42,
            name: "Acme / backend".to_string(),
            path: Some("acme/backend".to_string()),
            url: Some("https://gitlab.example.com/acme/backend".to_string()),
        }
    }

    fn set_value<T: Clone>(value: &ActiveValue<T>) -> T
    where
        T: Into<sea_orm::Value>,
    {
        match value {
            ActiveValue::Set(v) | ActiveValue::Unchanged(v) => v.clone(),
            ActiveValue::NotSet => panic!("value not set"),
        }
    }

    #[test]
    fn commit_conversion_carries_stats_and_parents() {
        let commit = GitLabCommit {
            id: "abc123".to_string(),
            title: "Fix pagination".to_string(),
            message: Some("Fix pagination\n\nLong body.".to_string()),
            author_name: Some("Intern".to_string()),
            author_email: Some("intern@example.com".to_string()),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            parent_ids: vec!["def456".to_string()],
            web_url: Some("https://gitlab.example.com/acme/backend/-/commit/abc123".to_string()),
            stats: Some(CommitStats {
                additions: 10,
                deletions: 3,
                total: 13,
            }),
        };

        let model =
            commit_to_active_model(Uuid::new_v4(), &commit, &project(), Some("main".to_string()));

        assert_eq!(set_value(&model.external_id), "abc123");
        assert_eq!(set_value(&model.kind), ActivityKind::Commit);
        assert_eq!(set_value(&model.project_id), 42);

        let meta = set_value(&model.metadata);
        assert_eq!(meta["sha"], "abc123");
        assert_eq!(meta["additions"], 10);
        assert_eq!(meta["branch"], "main");
        assert_eq!(meta["parent_ids"][0], "def456");
    }

    #[test]
    fn commit_without_stats_stores_null_churn() {
        let commit = GitLabCommit {
            id: "abc123".to_string(),
            title: "Fix pagination".to_string(),
            message: None,
            author_name: None,
            author_email: None,
            created_at: Utc::now(),
            parent_ids: vec![],
            web_url: None,
            stats: None,
        };

        let model = commit_to_active_model(Uuid::new_v4(), &commit, &project(), None);
        let meta = set_value(&model.metadata);
        assert!(meta["additions"].is_null());
        assert!(meta["deletions"].is_null());
    }

    #[test]
    fn issue_conversion_carries_labels_assignees_and_milestone() {
        let issue = GitLabIssue {
            id: 7,
            iid: 3,
            project_id: 42,
            title: "Flaky test".to_string(),
            description: Some("Fails on CI".to_string()),
            state: "opened".to_string(),
            labels: vec!["bug".to_string()],
            assignees: vec![GitLabAssignee {
                id: 123,
                username: "intern".to_string(),
                name: Some("Intern".to_string()),
            }],
            milestone: Some(GitLabMilestone {
                id: 9,
                title: "Sprint 4".to_string(),
                description: None,
            }),
            web_url: None,
            created_at: Utc::now(),
            updated_at: Some(Utc::now()),
        };

        let model = issue_to_active_model(Uuid::new_v4(), &issue, &project());

        assert_eq!(set_value(&model.external_id), "7");
        assert_eq!(set_value(&model.kind), ActivityKind::Issue);

        let meta = set_value(&model.metadata);
        assert_eq!(meta["state"], "opened");
        assert_eq!(meta["labels"][0], "bug");
        assert_eq!(meta["assignees"][0]["username"], "intern");
        assert_eq!(meta["milestone"]["title"], "Sprint 4");
    }

    #[test]
    fn merge_request_conversion_carries_branches() {
        let mr = GitLabMergeRequest {
            id: 11,
            iid: 5,
            project_id: 42,
            title: "Add analytics".to_string(),
            description: None,
            state: "merged".to_string(),
            source_branch: "feature/x".to_string(),
            target_branch: "main".to_string(),
            merge_status: Some("can_be_merged".to_string()),
            changes_count: Some("12".to_string()),
            labels: vec![],
            assignees: vec![],
            web_url: None,
            created_at: Utc::now(),
            updated_at: None,
        };

        let model = merge_request_to_active_model(Uuid::new_v4(), &mr, &project());

        assert_eq!(set_value(&model.external_id), "11");
        assert_eq!(set_value(&model.kind), ActivityKind::MergeRequest);

        let meta = set_value(&model.metadata);
        assert_eq!(meta["source_branch"], "feature/x");
        assert_eq!(meta["target_branch"], "main");
        assert_eq!(meta["changes_count"], "12");
    }

    #[test]
    fn unknown_project_context_uses_placeholder_name() {
        let ctx = ProjectContext::unknown(99);
        assert_eq!(ctx.id, 99);
        assert_eq!(ctx.name, "Unknown Project");
        assert!(ctx.path.is_none());
    }
}
