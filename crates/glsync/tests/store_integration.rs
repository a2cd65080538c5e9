//! Integration tests for the activity store.
//!
//! These tests require the `migrate` feature and run against an in-memory
//! SQLite database with the full schema applied, exercising the store the
//! way the sync engine and the read side use it together.

#![cfg(feature = "migrate")]

use chrono::{DateTime, Duration, TimeZone, Utc};
use glsync::db::connect_and_migrate;
use glsync::entity::activity_kind::ActivityKind;
use glsync::entity::activity_record::ActiveModel as ActivityActiveModel;
use glsync::entity::integration::{
    ActiveModel as IntegrationActiveModel, SyncErrorEntry, TrackedRepository,
};
use glsync::store::{
    count_activities, find_active_integrations, find_integration, get_analytics, list_commits,
    upsert_activity, upsert_integration, CommitFilter, DateRange,
};
use glsync::vault::Vault;
use sea_orm::{DatabaseConnection, Set};
use serde_json::json;
use uuid::Uuid;

/// Create an in-memory SQLite database with migrations applied.
async fn setup_test_db() -> DatabaseConnection {
    connect_and_migrate("sqlite::memory:")
        .await
        .expect("Failed to create test database")
}

fn user_a() -> Uuid {
    Uuid::parse_str("00000000-0000-0000-0000-0000000000aa").expect("valid uuid")
}

fn user_b() -> Uuid {
    Uuid::parse_str("00000000-0000-0000-0000-0000000000bb").expect("valid uuid")
}

fn commit_model(
    user_id: Uuid,
    sha: &str,
    project_id: i64,
    occurred_at: DateTime<Utc>,
    additions: i64,
    deletions: i64,
) -> ActivityActiveModel {
    let now = Utc::now().fixed_offset();
    ActivityActiveModel {
        user_id: Set(user_id),
        external_id: Set(sha.to_string()),
        kind: Set(ActivityKind::Commit),
        project_id: Set(project_id),
        project_name: Set(format!("project-{project_id}")),
        project_path: Set(Some(format!("acme/project-{project_id}"))),
        project_url: Set(None),
        title: Set(format!("commit {sha}")),
        description: Set(None),
        url: Set(None),
        occurred_at: Set(occurred_at.fixed_offset()),
        activity_updated_at: Set(None),
        metadata: Set(json!({
            "sha": sha,
            "additions": additions,
            "deletions": deletions
        })),
        last_synced_at: Set(now),
        ..Default::default()
    }
}

fn issue_model(
    user_id: Uuid,
    external_id: &str,
    project_id: i64,
    occurred_at: DateTime<Utc>,
) -> ActivityActiveModel {
    let now = Utc::now().fixed_offset();
    ActivityActiveModel {
        user_id: Set(user_id),
        external_id: Set(external_id.to_string()),
        kind: Set(ActivityKind::Issue),
        project_id: Set(project_id),
        project_name: Set(format!("project-{project_id}")),
        project_path: Set(None),
        project_url: Set(None),
        title: Set(format!("issue {external_id}")),
        description: Set(None),
        url: Set(None),
        occurred_at: Set(occurred_at.fixed_offset()),
        activity_updated_at: Set(None),
        metadata: Set(json!({"state": "opened", "labels": []})),
        last_synced_at: Set(now),
        ..Default::default()
    }
}

fn integration_model(user_id: Uuid, username: &str) -> IntegrationActiveModel {
    IntegrationActiveModel {
        user_id: Set(user_id),
        gitlab_user_id: Set(7),
        gitlab_username: Set(username.to_string()),
        gitlab_email: Set(Some(format!("{username}@example.com"))),
        access_token: Set("{\"ciphertext\":\"aa\",\"nonce\":\"bb\"}".to_string()),
        refresh_token: Set("{\"ciphertext\":\"cc\",\"nonce\":\"dd\"}".to_string()),
        token_expires_at: Set(Some((Utc::now() + Duration::hours(2)).fixed_offset())),
        ..Default::default()
    }
}

// ─── Activity Upsert + Read Side ─────────────────────────────────────────────

#[tokio::test]
async fn overlapping_passes_converge_to_one_row_per_activity() {
    let db = setup_test_db().await;
    let t = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();

    // First pass inserts.
    let (_, created) = upsert_activity(&db, commit_model(user_a(), "abc123", 42, t, 5, 1))
        .await
        .expect("insert");
    assert!(created);

    // A second pass over an overlapping window sees the same commit again,
    // this time with refined metadata.
    let (updated, created) = upsert_activity(&db, commit_model(user_a(), "abc123", 42, t, 8, 2))
        .await
        .expect("update");
    assert!(!created);
    assert_eq!(updated.line_churn(), (8, 2));

    assert_eq!(count_activities(&db, user_a()).await.expect("count"), 1);
}

#[tokio::test]
async fn list_commits_spans_only_the_requesting_user() {
    let db = setup_test_db().await;
    let t = |d: u32| Utc.with_ymd_and_hms(2024, 3, d, 12, 0, 0).unwrap();

    upsert_activity(&db, commit_model(user_a(), "a1", 42, t(1), 1, 0))
        .await
        .expect("seed");
    upsert_activity(&db, commit_model(user_a(), "a2", 42, t(5), 2, 0))
        .await
        .expect("seed");
    upsert_activity(&db, commit_model(user_b(), "b1", 42, t(3), 9, 9))
        .await
        .expect("seed");

    let commits = list_commits(&db, user_a(), &CommitFilter::default())
        .await
        .expect("list");
    assert_eq!(commits.len(), 2);
    // Most recent first.
    assert_eq!(commits[0].external_id, "a2");
    assert!(commits.iter().all(|c| c.user_id == user_a()));
}

#[tokio::test]
async fn analytics_aggregates_stored_activity_end_to_end() {
    let db = setup_test_db().await;
    let t = |d: u32| Utc.with_ymd_and_hms(2024, 3, d, 12, 0, 0).unwrap();

    upsert_activity(&db, commit_model(user_a(), "c1", 42, t(1), 10, 3))
        .await
        .expect("seed");
    upsert_activity(&db, commit_model(user_a(), "c2", 43, t(2), 7, 2))
        .await
        .expect("seed");
    upsert_activity(&db, issue_model(user_a(), "900", 42, t(2)))
        .await
        .expect("seed");
    // Outside the queried window; must not contribute.
    upsert_activity(&db, commit_model(user_a(), "c3", 42, t(20), 100, 100))
        .await
        .expect("seed");

    let range = DateRange {
        start: t(1),
        end: t(10),
    };
    let report = get_analytics(&db, user_a(), range).await.expect("report");

    assert_eq!(report.total_activities, 3);
    let commits = report
        .stats
        .iter()
        .find(|s| s.kind == ActivityKind::Commit)
        .expect("commit stats");
    assert_eq!(commits.count, 2);
    assert_eq!(commits.total_additions, 17);
    assert_eq!(commits.project_count, 2);

    assert_eq!(report.project_rollup.len(), 2);
    assert_eq!(report.daily_trend.len(), 3);
}

// ─── Integration Bookkeeping ─────────────────────────────────────────────────

#[tokio::test]
async fn integration_partial_updates_compose() {
    let db = setup_test_db().await;

    let first = upsert_integration(&db, integration_model(user_a(), "intern"))
        .await
        .expect("insert");
    assert!(first.is_active);
    assert!(first.tracked_repositories().is_empty());

    // A sync pass records its bookkeeping without touching the credential.
    let synced_at = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
    let repos = vec![TrackedRepository {
        project_id: 42,
        name: "backend".to_string(),
        path_with_namespace: "acme/backend".to_string(),
        url: "https://gitlab.example.com/acme/backend".to_string(),
        is_tracked: true,
        added_at: synced_at,
        last_sync_at: Some(synced_at),
    }];
    upsert_integration(
        &db,
        IntegrationActiveModel {
            user_id: Set(user_a()),
            last_sync_at: Set(Some(synced_at.fixed_offset())),
            last_successful_sync_at: Set(Some(synced_at.fixed_offset())),
            repositories: Set(serde_json::to_value(&repos).expect("repos json")),
            ..Default::default()
        },
    )
    .await
    .expect("bookkeeping update");

    // A token refresh later touches only the credential.
    upsert_integration(
        &db,
        IntegrationActiveModel {
            user_id: Set(user_a()),
            access_token: Set("{\"ciphertext\":\"ee\",\"nonce\":\"ff\"}".to_string()),
            ..Default::default()
        },
    )
    .await
    .expect("credential update");

    let stored = find_integration(&db, user_a())
        .await
        .expect("find")
        .expect("exists");
    assert_eq!(stored.id, first.id);
    assert_eq!(stored.tracked_repo_count(), 1);
    assert_eq!(
        stored.last_successful_sync_at.map(|t| t.with_timezone(&Utc)),
        Some(synced_at)
    );
    assert!(stored.access_token.contains("ee"));
    assert_eq!(stored.gitlab_username, "intern");
}

#[tokio::test]
async fn error_log_round_trips_through_the_json_column() {
    let db = setup_test_db().await;
    upsert_integration(&db, integration_model(user_a(), "intern"))
        .await
        .expect("insert");

    let entries = vec![SyncErrorEntry {
        error: "acme/backend: upstream error (status 500)".to_string(),
        timestamp: Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap(),
    }];
    upsert_integration(
        &db,
        IntegrationActiveModel {
            user_id: Set(user_a()),
            sync_errors: Set(serde_json::to_value(&entries).expect("errors json")),
            ..Default::default()
        },
    )
    .await
    .expect("log update");

    let stored = find_integration(&db, user_a())
        .await
        .expect("find")
        .expect("exists");
    assert_eq!(stored.sync_error_log(), entries);
}

#[tokio::test]
async fn scheduler_sees_only_active_integrations() {
    let db = setup_test_db().await;
    upsert_integration(&db, integration_model(user_a(), "intern"))
        .await
        .expect("insert a");
    upsert_integration(&db, integration_model(user_b(), "retiree"))
        .await
        .expect("insert b");

    // Soft-disable one of them, as disconnect does.
    upsert_integration(
        &db,
        IntegrationActiveModel {
            user_id: Set(user_b()),
            is_active: Set(false),
            is_connected: Set(false),
            ..Default::default()
        },
    )
    .await
    .expect("disable");

    let active = find_active_integrations(&db).await.expect("list");
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].user_id, user_a());

    // The disabled row survives with its identity intact.
    let disabled = find_integration(&db, user_b())
        .await
        .expect("find")
        .expect("exists");
    assert!(!disabled.is_active);
    assert_eq!(disabled.gitlab_username, "retiree");
}

// ─── Sealed Tokens at Rest ───────────────────────────────────────────────────

#[tokio::test]
async fn stored_token_blobs_decrypt_only_with_the_vault() {
    let db = setup_test_db().await;
    let vault = Vault::from_secret("integration-test-secret");

    let mut model = integration_model(user_a(), "intern");
    model.access_token = Set(vault.encrypt("glpat-super-secret").expect("seal"));
    model.refresh_token = Set(vault.encrypt("refresh-super-secret").expect("seal"));
    upsert_integration(&db, model).await.expect("insert");

    let stored = find_integration(&db, user_a())
        .await
        .expect("find")
        .expect("exists");
    assert!(!stored.access_token.contains("glpat-super-secret"));

    let opened = vault.decrypt(&stored.access_token);
    assert!(!opened.used_fallback());
    assert_eq!(opened.value(), "glpat-super-secret");

    // A different vault key cannot open the blob cleanly.
    let other = Vault::from_secret("some-other-secret");
    assert!(other.decrypt(&stored.access_token).used_fallback());
}
