//! One user's incremental sync pass.
//!
//! A pass resolves the credential once, fetches projects, fans out over
//! tracked repositories with bounded concurrency, and reconciles
//! everything into the activity store through the idempotent upsert.
//! Per-repository failures are recorded and isolated; only credential
//! problems abort the pass.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::Set;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::entity::integration::{
    append_sync_error, ActiveModel as IntegrationActiveModel, Model as IntegrationModel,
    SyncErrorEntry, TrackedRepository,
};
use crate::error::{short_error_message, Result, SyncError};
use crate::gitlab::{
    commit_to_active_model, issue_to_active_model, merge_request_to_active_model, GitLabClient,
    GitLabCommit, GitLabProject, ProjectContext,
};
use crate::rate_limit::ApiRateLimiter;
use crate::store::{find_integration, upsert_activity, upsert_integration, StoreError};
use crate::token::ensure_valid_credential;

use super::types::{SyncContext, SyncReport, SyncWindow};

/// Run an incremental sync pass for one user.
///
/// # Errors
/// `StoreError::NotFound` when the user has no integration;
/// `SyncError::CredentialInvalid` when it is disconnected or the token
/// cannot be refreshed. Per-repository failures do not error; they are
/// reported in the returned [`SyncReport`].
#[tracing::instrument(skip(ctx), fields(user_id = %user_id))]
pub async fn sync_user(ctx: &SyncContext, user_id: Uuid) -> Result<SyncReport> {
    let integration = find_integration(&ctx.db, user_id)
        .await?
        .ok_or_else(|| StoreError::integration_not_found(user_id))?;
    if !integration.is_active {
        return Err(SyncError::CredentialInvalid);
    }
    sync_integration(ctx, &integration, Utc::now()).await
}

/// Run one pass against a resolved integration, with an explicit start
/// instant driving the window and all bookkeeping timestamps.
pub(crate) async fn sync_integration(
    ctx: &SyncContext,
    integration: &IntegrationModel,
    started: DateTime<Utc>,
) -> Result<SyncReport> {
    match run_pass(ctx, integration, started).await {
        Ok(pass) => {
            record_outcome(ctx, integration, started, &pass).await?;
            tracing::info!(
                user_id = %integration.user_id,
                total = pass.report.total(),
                errors = pass.report.errors.len(),
                "sync pass completed"
            );
            Ok(pass.report)
        }
        Err(err) => {
            record_failure(ctx, integration, started, &err).await?;
            tracing::warn!(
                user_id = %integration.user_id,
                error = %err,
                "sync pass aborted"
            );
            Err(err)
        }
    }
}

struct PassOutcome {
    report: SyncReport,
    repositories: Vec<TrackedRepository>,
}

async fn run_pass(
    ctx: &SyncContext,
    integration: &IntegrationModel,
    started: DateTime<Utc>,
) -> Result<PassOutcome> {
    let credential = ensure_valid_credential(&ctx.db, &ctx.vault, &ctx.oauth, integration).await?;

    let last_successful = integration
        .last_successful_sync_at
        .map(|t| t.with_timezone(&Utc));
    let window = SyncWindow::compute(last_successful, started);
    let mut report = SyncReport::new(integration.user_id, window);
    report.warnings = credential.warnings;

    let client = GitLabClient::new(
        Arc::clone(&ctx.transport),
        &ctx.base_url,
        credential.access_token.as_str(),
    )
    .with_rate_limiter(ApiRateLimiter::new(ctx.options.requests_per_second));

    // Project listing failure is fatal: without it there is nothing to
    // track and no context for the global endpoints.
    let projects = client.list_projects().await.map_err(SyncError::from)?;
    let mut repositories =
        merge_tracked_repositories(integration.tracked_repositories(), &projects, started);
    let contexts: HashMap<i64, ProjectContext> = projects
        .iter()
        .map(|p| (p.id as i64, ProjectContext::from(p)))
        .collect();

    let author = integration
        .gitlab_email
        .clone()
        .unwrap_or_else(|| integration.gitlab_username.clone());

    // Fan out over tracked repositories with bounded concurrency.
    let tracked: Vec<TrackedRepository> = repositories
        .iter()
        .filter(|r| r.is_tracked)
        .cloned()
        .collect();
    report.projects_attempted = tracked.len();

    let semaphore = Arc::new(Semaphore::new(ctx.options.project_concurrency.max(1)));
    let mut tasks = JoinSet::new();
    for repo in tracked {
        let client = client.clone();
        let semaphore = Arc::clone(&semaphore);
        let author = author.clone();
        let enrich = ctx.options.enrich_commit_stats;
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            let result = fetch_project_commits(&client, &repo, window, &author, enrich).await;
            (repo, result)
        });
    }

    let mut commit_batches: Vec<(TrackedRepository, Vec<GitLabCommit>)> = Vec::new();
    let mut failed_projects: HashSet<u64> = HashSet::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((repo, Ok(commits))) => commit_batches.push((repo, commits)),
            Ok((repo, Err(err))) => {
                if err.requires_reconnect() {
                    return Err(err);
                }
                tracing::warn!(
                    project = %repo.path_with_namespace,
                    error = %err,
                    "repository sync failed"
                );
                report.errors.push(format!(
                    "{}: {}",
                    repo.path_with_namespace,
                    short_error_message(&err)
                ));
                failed_projects.insert(repo.project_id);
            }
            Err(join_err) => {
                report.errors.push(format!("repository task failed: {join_err}"));
            }
        }
    }

    // Reconcile commits per repository.
    for (repo, commits) in commit_batches {
        let context = ProjectContext {
            id: repo.project_id as i64,
            name: repo.name.clone(),
            path: Some(repo.path_with_namespace.clone()),
            url: Some(repo.url.clone()),
        };
        for commit in commits {
            let model = commit_to_active_model(integration.user_id, &commit, &context, None);
            let (_, created) = upsert_activity(&ctx.db, model).await?;
            report.commits.record(created);
        }
    }

    // Issues and merge requests come from global endpoints; a failure
    // there is recorded but does not fail the pass.
    let gitlab_user_id = integration.gitlab_user_id as u64;
    match client.list_assigned_issues(gitlab_user_id, None).await {
        Ok(issues) => {
            for issue in issues {
                let context = contexts
                    .get(&(issue.project_id as i64))
                    .cloned()
                    .unwrap_or_else(|| ProjectContext::unknown(issue.project_id as i64));
                let model = issue_to_active_model(integration.user_id, &issue, &context);
                let (_, created) = upsert_activity(&ctx.db, model).await?;
                report.issues.record(created);
            }
        }
        Err(err) => {
            let err = SyncError::from(err);
            if err.requires_reconnect() {
                return Err(err);
            }
            report
                .errors
                .push(format!("issues: {}", short_error_message(&err)));
        }
    }

    match client.list_authored_merge_requests(gitlab_user_id, None).await {
        Ok(merge_requests) => {
            for mr in merge_requests {
                let context = contexts
                    .get(&(mr.project_id as i64))
                    .cloned()
                    .unwrap_or_else(|| ProjectContext::unknown(mr.project_id as i64));
                let model = merge_request_to_active_model(integration.user_id, &mr, &context);
                let (_, created) = upsert_activity(&ctx.db, model).await?;
                report.merge_requests.record(created);
            }
        }
        Err(err) => {
            let err = SyncError::from(err);
            if err.requires_reconnect() {
                return Err(err);
            }
            report
                .errors
                .push(format!("merge requests: {}", short_error_message(&err)));
        }
    }

    // Advance per-repository watermarks, monotonically and only for
    // repositories that synced without error.
    for repo in &mut repositories {
        if repo.is_tracked && !failed_projects.contains(&repo.project_id) {
            let advanced = match repo.last_sync_at {
                Some(existing) if existing >= window.until => existing,
                _ => window.until,
            };
            repo.last_sync_at = Some(advanced);
        }
    }

    Ok(PassOutcome {
        report,
        repositories,
    })
}

async fn fetch_project_commits(
    client: &GitLabClient,
    repo: &TrackedRepository,
    window: SyncWindow,
    author: &str,
    enrich: bool,
) -> Result<Vec<GitLabCommit>> {
    let mut commits = client
        .list_commits(repo.project_id, window.since, window.until, Some(author))
        .await
        .map_err(SyncError::from)?;

    if enrich {
        for commit in &mut commits {
            if commit.stats.is_some() {
                continue;
            }
            // Stats enrichment is best-effort; a missing detail never
            // fails the repository.
            match client.commit_detail(repo.project_id, &commit.id).await {
                Ok(detail) => commit.stats = detail.stats,
                Err(err) => {
                    tracing::debug!(sha = %commit.id, error = %err, "commit stats unavailable");
                }
            }
        }
    }

    Ok(commits)
}

/// Merge the live project listing into the stored repository list.
///
/// New projects are appended as tracked; known projects keep their
/// tracking flag and watermark but refresh display fields.
fn merge_tracked_repositories(
    stored: Vec<TrackedRepository>,
    projects: &[GitLabProject],
    now: DateTime<Utc>,
) -> Vec<TrackedRepository> {
    let mut by_id: HashMap<u64, TrackedRepository> =
        stored.into_iter().map(|r| (r.project_id, r)).collect();

    for project in projects {
        match by_id.get_mut(&project.id) {
            Some(repo) => {
                repo.name = project.name_with_namespace.clone();
                repo.path_with_namespace = project.path_with_namespace.clone();
                repo.url = project.web_url.clone();
            }
            None => {
                by_id.insert(
                    project.id,
                    TrackedRepository {
                        project_id: project.id,
                        name: project.name_with_namespace.clone(),
                        path_with_namespace: project.path_with_namespace.clone(),
                        url: project.web_url.clone(),
                        is_tracked: true,
                        added_at: now,
                        last_sync_at: None,
                    },
                );
            }
        }
    }

    let mut merged: Vec<TrackedRepository> = by_id.into_values().collect();
    merged.sort_by_key(|r| r.project_id);
    merged
}

async fn record_outcome(
    ctx: &SyncContext,
    integration: &IntegrationModel,
    started: DateTime<Utc>,
    pass: &PassOutcome,
) -> Result<()> {
    let repositories = serde_json::to_value(&pass.repositories)
        .map_err(|e| SyncError::data_integrity(format!("repository list encoding: {e}")))?;

    let mut update = IntegrationActiveModel {
        user_id: Set(integration.user_id),
        last_sync_at: Set(Some(started.fixed_offset())),
        repositories: Set(repositories),
        ..Default::default()
    };

    if pass.report.is_clean() {
        update.last_successful_sync_at = Set(Some(started.fixed_offset()));
        update.sync_errors = Set(serde_json::Value::Array(Vec::new()));
    } else {
        let mut log = integration.sync_error_log();
        for error in &pass.report.errors {
            append_sync_error(
                &mut log,
                SyncErrorEntry {
                    error: error.clone(),
                    timestamp: started,
                },
            );
        }
        update.sync_errors = Set(serde_json::to_value(&log)
            .map_err(|e| SyncError::data_integrity(format!("error log encoding: {e}")))?);
    }

    upsert_integration(&ctx.db, update).await?;
    Ok(())
}

async fn record_failure(
    ctx: &SyncContext,
    integration: &IntegrationModel,
    started: DateTime<Utc>,
    err: &SyncError,
) -> Result<()> {
    let mut log = integration.sync_error_log();
    append_sync_error(
        &mut log,
        SyncErrorEntry {
            error: short_error_message(err),
            timestamp: started,
        },
    );

    let update = IntegrationActiveModel {
        user_id: Set(integration.user_id),
        last_sync_at: Set(Some(started.fixed_offset())),
        sync_errors: Set(serde_json::to_value(&log)
            .map_err(|e| SyncError::data_integrity(format!("error log encoding: {e}")))?),
        ..Default::default()
    };
    upsert_integration(&ctx.db, update).await?;
    Ok(())
}
