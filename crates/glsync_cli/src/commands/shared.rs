//! Service construction shared by the user-facing commands.

use std::sync::Arc;
use std::time::Duration;

use glsync::gitlab::OAuthClient;
use glsync::http::reqwest_transport::ReqwestTransport;
use glsync::vault::Vault;
use glsync::{SyncContext, SyncOptions, SyncService};

use crate::config::Config;

/// Per-request HTTP timeout.
const HTTP_TIMEOUT_SECS: u64 = 30;

/// Build the sync service from configuration.
///
/// Fails fast with an actionable message when a required credential is
/// missing; nothing here touches the platform yet.
pub(crate) async fn build_service(
    config: &Config,
    database_url: &str,
) -> Result<SyncService, Box<dyn std::error::Error>> {
    let vault_secret = config.vault.secret.as_deref().ok_or(
        "Vault secret not configured. Set GLSYNC_VAULT_SECRET or [vault].secret in the config file.",
    )?;
    let client_id = config.gitlab.client_id.as_deref().ok_or(
        "OAuth client ID not configured. Set GLSYNC_GITLAB_CLIENT_ID or [gitlab].client_id.",
    )?;
    let client_secret = config.gitlab.client_secret.as_deref().ok_or(
        "OAuth client secret not configured. Set GLSYNC_GITLAB_CLIENT_SECRET or [gitlab].client_secret.",
    )?;

    let db = glsync::db::connect(database_url).await?;
    let host = config.gitlab_host();

    let transport = Arc::new(ReqwestTransport::with_timeout(Duration::from_secs(
        HTTP_TIMEOUT_SECS,
    ))?);
    let oauth = OAuthClient::new(
        Arc::clone(&transport) as Arc<dyn glsync::http::HttpTransport>,
        &host,
        client_id,
        client_secret,
    );

    let options = SyncOptions {
        requests_per_second: config.sync.requests_per_second,
        project_concurrency: config.sync.project_concurrency,
        enrich_commit_stats: config.sync.enrich_commit_stats,
    };

    let ctx = SyncContext::new(
        db,
        Vault::from_secret(vault_secret),
        oauth,
        transport,
        host,
        options,
    );
    Ok(SyncService::new(ctx))
}
