//! High-level facade over connect, sync, reads, and analytics.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::Set;
use uuid::Uuid;

use crate::entity::activity_record::Model as ActivityModel;
use crate::entity::integration::{
    ActiveModel as IntegrationActiveModel, Model as IntegrationModel, SyncErrorEntry,
};
use crate::error::Result;
use crate::gitlab::GitLabClient;
use crate::store::{
    find_integration, get_analytics, list_commits, upsert_integration, AnalyticsReport,
    CommitFilter, DateRange, StoreError,
};
use crate::sync::{
    run_scheduled_sync, sync_user, ScheduledRun, SyncContext, SyncLocks, SyncReport,
    SCHEDULER_WORKERS,
};

/// User-facing view of an integration's health.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub gitlab_username: Option<String>,
    pub token_expired: bool,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_successful_sync_at: Option<DateTime<Utc>>,
    pub tracked_repo_count: usize,
    pub recent_errors: Vec<SyncErrorEntry>,
}

impl ConnectionStatus {
    fn disconnected() -> Self {
        Self {
            connected: false,
            gitlab_username: None,
            token_expired: false,
            last_sync_at: None,
            last_successful_sync_at: None,
            tracked_repo_count: 0,
            recent_errors: Vec::new(),
        }
    }

    fn from_model(model: &IntegrationModel) -> Self {
        Self {
            connected: model.is_active && model.is_connected,
            gitlab_username: Some(model.gitlab_username.clone()),
            token_expired: model.token_expired(Utc::now()),
            last_sync_at: model.last_sync_at.map(|t| t.with_timezone(&Utc)),
            last_successful_sync_at: model
                .last_successful_sync_at
                .map(|t| t.with_timezone(&Utc)),
            tracked_repo_count: model.tracked_repo_count(),
            recent_errors: model.sync_error_log(),
        }
    }
}

/// The synchronization service: one per process, shared across callers.
#[derive(Debug, Clone)]
pub struct SyncService {
    ctx: Arc<SyncContext>,
    locks: Arc<SyncLocks>,
}

impl SyncService {
    #[must_use]
    pub fn new(ctx: SyncContext) -> Self {
        Self {
            ctx: Arc::new(ctx),
            locks: Arc::new(SyncLocks::new()),
        }
    }

    /// The shared context, for callers composing their own flows.
    #[must_use]
    pub fn context(&self) -> &SyncContext {
        &self.ctx
    }

    /// Complete the OAuth connect flow for a user.
    ///
    /// Exchanges the authorization code, resolves the GitLab identity,
    /// seals both tokens, and stores the integration. Reconnecting an
    /// existing (possibly disconnected) integration reactivates it.
    pub async fn connect(
        &self,
        user_id: Uuid,
        code: &str,
        redirect_uri: &str,
    ) -> Result<IntegrationModel> {
        let tokens = self
            .ctx
            .oauth
            .exchange_authorization_code(code, redirect_uri)
            .await?;

        let client = GitLabClient::new(
            Arc::clone(&self.ctx.transport),
            &self.ctx.base_url,
            &tokens.access_token,
        );
        let profile = client.current_user().await?;

        let model = IntegrationActiveModel {
            user_id: Set(user_id),
            gitlab_user_id: Set(profile.id as i64),
            gitlab_username: Set(profile.username.clone()),
            gitlab_email: Set(profile.best_email().map(str::to_string)),
            access_token: Set(self.ctx.vault.encrypt(&tokens.access_token)?),
            refresh_token: Set(self.ctx.vault.encrypt(&tokens.refresh_token)?),
            token_expires_at: Set(Some(tokens.expires_at().fixed_offset())),
            is_active: Set(true),
            is_connected: Set(true),
            ..Default::default()
        };

        let stored = upsert_integration(&self.ctx.db, model).await?;
        tracing::info!(user_id = %user_id, gitlab_username = %stored.gitlab_username, "integration connected");
        Ok(stored)
    }

    /// The connection status for a user; never errors on a missing
    /// integration.
    pub async fn connection_status(&self, user_id: Uuid) -> Result<ConnectionStatus> {
        match find_integration(&self.ctx.db, user_id).await? {
            Some(model) => Ok(ConnectionStatus::from_model(&model)),
            None => Ok(ConnectionStatus::disconnected()),
        }
    }

    /// Disconnect a user's integration.
    ///
    /// Soft-disable only: the row, its history, and the sealed tokens are
    /// kept so a later reconnect restores continuity.
    pub async fn disconnect(&self, user_id: Uuid) -> Result<()> {
        if find_integration(&self.ctx.db, user_id).await?.is_none() {
            return Err(StoreError::integration_not_found(user_id).into());
        }

        upsert_integration(
            &self.ctx.db,
            IntegrationActiveModel {
                user_id: Set(user_id),
                is_active: Set(false),
                is_connected: Set(false),
                ..Default::default()
            },
        )
        .await?;
        tracing::info!(user_id = %user_id, "integration disconnected");
        Ok(())
    }

    /// Run one sync pass now, serialized against any concurrent pass for
    /// the same user.
    pub async fn sync_now(&self, user_id: Uuid) -> Result<SyncReport> {
        let lock = self.locks.lock_for(user_id);
        let _guard = lock.lock_owned().await;
        sync_user(&self.ctx, user_id).await
    }

    /// Read stored commits; with `refresh`, run a sync pass first.
    ///
    /// The read itself never touches the platform, so a stale-but-fast
    /// answer is always available.
    pub async fn list_commits(
        &self,
        user_id: Uuid,
        filter: &CommitFilter,
        refresh: bool,
    ) -> Result<Vec<ActivityModel>> {
        if refresh {
            let report = self.sync_now(user_id).await?;
            if let Some(err) = report.partial_failure() {
                tracing::warn!(user_id = %user_id, error = %err, "refresh completed with errors");
            }
        }
        Ok(list_commits(&self.ctx.db, user_id, filter).await?)
    }

    /// Aggregated analytics over stored activity.
    pub async fn get_analytics(&self, user_id: Uuid, range: DateRange) -> Result<AnalyticsReport> {
        Ok(get_analytics(&self.ctx.db, user_id, range).await?)
    }

    /// Sync all active integrations with the default worker pool.
    pub async fn run_scheduled_sync(&self) -> Result<ScheduledRun> {
        run_scheduled_sync(
            Arc::clone(&self.ctx),
            Arc::clone(&self.locks),
            SCHEDULER_WORKERS,
        )
        .await
    }
}

#[cfg(all(test, feature = "migrate"))]
mod tests {
    use chrono::Duration;
    use serde_json::json;

    use crate::db::connect_and_migrate;
    use crate::gitlab::client::PAGE_SIZE;
    use crate::gitlab::OAuthClient;
    use crate::http::{HttpMethod, HttpResponse, MockTransport};
    use crate::sync::SyncOptions;
    use crate::vault::Vault;

    use super::*;

    const API: &str = "https://gitlab.example.com/api/v4";

    fn test_user_id() -> Uuid {
        Uuid::parse_str("00000000-0000-0000-0000-000000000042").expect("valid uuid")
    }

    async fn setup() -> (SyncService, MockTransport) {
        let db = connect_and_migrate("sqlite::memory:").await.expect("db");
        let transport = MockTransport::new();
        let vault = Vault::from_secret("test-secret");
        let oauth = OAuthClient::new(
            Arc::new(transport.clone()),
            "gitlab.example.com",
            "client-id",
            "client-secret",
        );
        let ctx = SyncContext::new(
            db,
            vault,
            oauth,
            Arc::new(transport.clone()),
            "gitlab.example.com",
            SyncOptions::default(),
        );
        (SyncService::new(ctx), transport)
    }

    fn push_connect_routes(transport: &MockTransport) {
        transport.push_response(
            HttpMethod::Post,
            "https://gitlab.example.com/oauth/token",
            HttpResponse {
                status: 200,
                headers: vec![],
                body: serde_json::to_vec(&json!({
                    "access_token": "fresh-access",
                    "refresh_token": "fresh-refresh",
                    "expires_in": 7200
                }))
                .expect("body"),
            },
        );
        transport.push_json(
            format!("{API}/user"),
            &json!({
                "id": 7,
                "username": "intern",
                "email": "intern@example.com"
            }),
        );
    }

    #[tokio::test]
    async fn connect_stores_sealed_tokens_and_identity() {
        let (service, transport) = setup().await;
        push_connect_routes(&transport);

        let stored = service
            .connect(test_user_id(), "the-code", "https://app.example.com/cb")
            .await
            .expect("connect");

        assert_eq!(stored.gitlab_user_id, 7);
        assert_eq!(stored.gitlab_username, "intern");
        assert_eq!(stored.gitlab_email.as_deref(), Some("intern@example.com"));
        assert!(stored.is_active);
        assert!(!stored.token_expired(Utc::now()));

        // Tokens are stored sealed, not in plaintext.
        assert!(!stored.access_token.contains("fresh-access"));
        let vault = &service.context().vault;
        let opened = vault.decrypt(&stored.access_token);
        assert!(!opened.used_fallback());
        assert_eq!(opened.value(), "fresh-access");
        assert_eq!(vault.decrypt(&stored.refresh_token).value(), "fresh-refresh");
    }

    #[tokio::test]
    async fn status_reflects_connection_lifecycle() {
        let (service, transport) = setup().await;

        let before = service
            .connection_status(test_user_id())
            .await
            .expect("status");
        assert!(!before.connected);
        assert!(before.gitlab_username.is_none());

        push_connect_routes(&transport);
        service
            .connect(test_user_id(), "the-code", "https://app.example.com/cb")
            .await
            .expect("connect");

        let connected = service
            .connection_status(test_user_id())
            .await
            .expect("status");
        assert!(connected.connected);
        assert_eq!(connected.gitlab_username.as_deref(), Some("intern"));
        assert!(!connected.token_expired);
        assert!(connected.last_sync_at.is_none());

        service.disconnect(test_user_id()).await.expect("disconnect");
        let after = service
            .connection_status(test_user_id())
            .await
            .expect("status");
        assert!(!after.connected);
        // History survives the soft disable.
        assert_eq!(after.gitlab_username.as_deref(), Some("intern"));
    }

    #[tokio::test]
    async fn disconnect_without_integration_errors() {
        let (service, _transport) = setup().await;
        let err = service
            .disconnect(Uuid::new_v4())
            .await
            .expect_err("missing integration");
        assert!(matches!(
            err,
            crate::error::SyncError::Store(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn synced_then_disconnected_user_cannot_sync() {
        let (service, transport) = setup().await;
        push_connect_routes(&transport);
        service
            .connect(test_user_id(), "the-code", "https://app.example.com/cb")
            .await
            .expect("connect");
        service.disconnect(test_user_id()).await.expect("disconnect");

        let err = service.sync_now(test_user_id()).await.expect_err("inactive");
        assert!(err.requires_reconnect());
    }

    #[tokio::test]
    async fn list_commits_reads_the_store_without_refresh() {
        let (service, transport) = setup().await;
        push_connect_routes(&transport);
        service
            .connect(test_user_id(), "the-code", "https://app.example.com/cb")
            .await
            .expect("connect");
        let requests_after_connect = transport.request_count();

        let commits = service
            .list_commits(test_user_id(), &CommitFilter::default(), false)
            .await
            .expect("list");
        assert!(commits.is_empty());
        // The read never touched the platform.
        assert_eq!(transport.request_count(), requests_after_connect);
    }

    #[tokio::test]
    async fn refresh_runs_a_pass_before_reading() {
        let (service, transport) = setup().await;
        push_connect_routes(&transport);
        service
            .connect(test_user_id(), "the-code", "https://app.example.com/cb")
            .await
            .expect("connect");

        transport.push_json(
            format!(
                "{API}/projects?membership=true&order_by=last_activity_at&sort=desc&page=1&per_page={PAGE_SIZE}"
            ),
            &json!([]),
        );
        transport.push_json(
            format!("{API}/issues?assignee_id=7&scope=assigned_to_me&page=1&per_page={PAGE_SIZE}"),
            &json!([]),
        );
        transport.push_json(
            format!(
                "{API}/merge_requests?author_id=7&scope=created_by_me&page=1&per_page={PAGE_SIZE}"
            ),
            &json!([]),
        );

        let commits = service
            .list_commits(test_user_id(), &CommitFilter::default(), true)
            .await
            .expect("refresh and list");
        assert!(commits.is_empty());

        let status = service
            .connection_status(test_user_id())
            .await
            .expect("status");
        assert!(status.last_successful_sync_at.is_some());
    }

    #[tokio::test]
    async fn analytics_on_empty_store() {
        let (service, _transport) = setup().await;
        let report = service
            .get_analytics(test_user_id(), DateRange::default())
            .await
            .expect("analytics");
        assert_eq!(report.total_activities, 0);
        assert!(report.stats.is_empty());

        let count = Duration::days(30).num_days();
        assert_eq!((report.range.end - report.range.start).num_days(), count);
    }
}
