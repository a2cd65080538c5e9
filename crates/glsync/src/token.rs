//! Credential lifecycle: expiry classification and single-shot refresh.
//!
//! A sync pass calls [`ensure_valid_credential`] exactly once before it
//! touches the REST API. An expired or near-expiry token is refreshed at
//! most once; if that fails the pass aborts without a single API call.

use chrono::{DateTime, Duration, Utc};
use sea_orm::{DatabaseConnection, Set};
use zeroize::Zeroizing;

use crate::entity::integration::{ActiveModel as IntegrationActiveModel, Model as IntegrationModel};
use crate::error::{Result, SyncError};
use crate::gitlab::OAuthClient;
use crate::store::upsert_integration;
use crate::vault::Vault;

/// Refresh ahead of expiry by this much, so a token does not lapse
/// mid-pass.
pub const REFRESH_BUFFER_SECS: i64 = 300;

/// Expiry classification for a stored access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Valid,
    /// Inside the refresh buffer; still usable but refreshed proactively.
    ExpiringSoon,
    Expired,
}

/// Classify a token expiry against `now`.
///
/// A missing expiry is treated as expired; the credential cannot be
/// trusted without one.
#[must_use]
pub fn classify(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> TokenState {
    match expires_at {
        None => TokenState::Expired,
        Some(expires_at) if expires_at <= now => TokenState::Expired,
        Some(expires_at) if expires_at <= now + Duration::seconds(REFRESH_BUFFER_SECS) => {
            TokenState::ExpiringSoon
        }
        Some(_) => TokenState::Valid,
    }
}

/// A usable access token for one sync pass.
pub struct Credential {
    /// Plaintext access token, zeroized on drop.
    pub access_token: Zeroizing<String>,
    /// Whether a refresh happened during this call.
    pub refreshed: bool,
    /// Data-integrity warnings gathered while decrypting stored blobs.
    pub warnings: Vec<String>,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The token itself must never appear in logs.
        f.debug_struct("Credential")
            .field("refreshed", &self.refreshed)
            .field("warnings", &self.warnings)
            .finish_non_exhaustive()
    }
}

/// Produce a valid access token for the integration, refreshing at most
/// once.
///
/// On refresh the new token pair is sealed and persisted before the
/// credential is returned, so a crash mid-pass never strands a revoked
/// refresh token.
///
/// # Errors
/// `SyncError::CredentialInvalid` when the refresh token is rejected;
/// other refresh failures map through the usual upstream taxonomy.
pub async fn ensure_valid_credential(
    db: &DatabaseConnection,
    vault: &Vault,
    oauth: &OAuthClient,
    integration: &IntegrationModel,
) -> Result<Credential> {
    let now = Utc::now();
    let expires_at = integration.token_expires_at.map(|t| t.with_timezone(&Utc));
    let mut warnings = Vec::new();

    if classify(expires_at, now) == TokenState::Valid {
        let decrypted = vault.decrypt(&integration.access_token);
        if let Some(reason) = decrypted.fallback_reason() {
            tracing::warn!(
                user_id = %integration.user_id,
                reason,
                "access token decoded via fallback path"
            );
            warnings.push(format!("access token decoded via fallback: {reason}"));
        }
        return Ok(Credential {
            access_token: decrypted.into_value(),
            refreshed: false,
            warnings,
        });
    }

    let refresh = vault.decrypt(&integration.refresh_token);
    if let Some(reason) = refresh.fallback_reason() {
        tracing::warn!(
            user_id = %integration.user_id,
            reason,
            "refresh token decoded via fallback path"
        );
        warnings.push(format!("refresh token decoded via fallback: {reason}"));
    }

    tracing::info!(user_id = %integration.user_id, "refreshing expired access token");
    let tokens = oauth.refresh_access_token(refresh.value()).await?;
    let new_expires_at = tokens.expires_at();

    let update = IntegrationActiveModel {
        user_id: Set(integration.user_id),
        access_token: Set(vault.encrypt(&tokens.access_token)?),
        refresh_token: Set(vault.encrypt(&tokens.refresh_token)?),
        token_expires_at: Set(Some(new_expires_at.fixed_offset())),
        ..Default::default()
    };
    upsert_integration(db, update).await?;

    Ok(Credential {
        access_token: Zeroizing::new(tokens.access_token),
        refreshed: true,
        warnings,
    })
}


#[cfg(all(test, feature = "migrate"))]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use sea_orm::Set;
    use serde_json::json;
    use uuid::Uuid;

    use crate::db::connect_and_migrate;
    use crate::http::{HttpMethod, HttpResponse, MockTransport};
    use crate::store::find_integration;

    use super::*;

    fn push_token_response(transport: &MockTransport, body: &serde_json::Value) {
        transport.push_response(
            HttpMethod::Post,
            "https://gitlab.example.com/oauth/token",
            HttpResponse {
                status: 200,
                headers: vec![],
                body: serde_json::to_vec(body).expect("mock body"),
            },
        );
    }

    fn test_user_id() -> Uuid {
        Uuid::parse_str("00000000-0000-0000-0000-000000000042").expect("valid uuid")
    }

    async fn seed_integration(
        db: &DatabaseConnection,
        vault: &Vault,
        expires_at: Option<DateTime<Utc>>,
    ) -> IntegrationModel {
        let model = IntegrationActiveModel {
            user_id: Set(test_user_id()),
            gitlab_user_id: Set(7),
            gitlab_username: Set("intern".to_string()),
            gitlab_email: Set(None),
            access_token: Set(vault.encrypt("old-access").expect("encrypt")),
            refresh_token: Set(vault.encrypt("old-refresh").expect("encrypt")),
            token_expires_at: Set(expires_at.map(|t| t.fixed_offset())),
            ..Default::default()
        };
        upsert_integration(db, model).await.expect("seed")
    }

    fn oauth(transport: &MockTransport) -> OAuthClient {
        OAuthClient::new(
            Arc::new(transport.clone()),
            "gitlab.example.com",
            "client-id",
            "client-secret",
        )
    }

    #[tokio::test]
    async fn valid_token_is_returned_without_any_request() {
        let db = connect_and_migrate("sqlite::memory:").await.expect("db");
        let vault = Vault::from_secret("s");
        let transport = MockTransport::new();
        let integration =
            seed_integration(&db, &vault, Some(Utc::now() + Duration::hours(2))).await;

        let cred = ensure_valid_credential(&db, &vault, &oauth(&transport), &integration)
            .await
            .expect("credential");

        assert_eq!(&*cred.access_token, "old-access");
        assert!(!cred.refreshed);
        assert!(cred.warnings.is_empty());
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_once_and_persisted() {
        let db = connect_and_migrate("sqlite::memory:").await.expect("db");
        let vault = Vault::from_secret("s");
        let transport = MockTransport::new();
        push_token_response(
            &transport,
            &json!({
                "access_token": "new-access",
                "refresh_token": "new-refresh",
                "expires_in": 7200
            }),
        );
        let integration =
            seed_integration(&db, &vault, Some(Utc::now() - Duration::minutes(5))).await;

        let cred = ensure_valid_credential(&db, &vault, &oauth(&transport), &integration)
            .await
            .expect("credential");

        assert_eq!(&*cred.access_token, "new-access");
        assert!(cred.refreshed);
        assert_eq!(transport.request_count(), 1);

        let stored = find_integration(&db, test_user_id())
            .await
            .expect("find")
            .expect("integration");
        assert_eq!(vault.decrypt(&stored.access_token).value(), "new-access");
        assert_eq!(vault.decrypt(&stored.refresh_token).value(), "new-refresh");
        assert!(!stored.token_expired(Utc::now()));
        // Identity fields survive the partial update.
        assert_eq!(stored.gitlab_username, "intern");
    }

    #[tokio::test]
    async fn rejected_refresh_token_aborts_with_credential_invalid() {
        let db = connect_and_migrate("sqlite::memory:").await.expect("db");
        let vault = Vault::from_secret("s");
        let transport = MockTransport::new();
        push_token_response(
            &transport,
            &json!({"error": "invalid_grant", "error_description": "revoked"}),
        );
        let integration = seed_integration(&db, &vault, None).await;

        let err = ensure_valid_credential(&db, &vault, &oauth(&transport), &integration)
            .await
            .expect_err("should fail");
        assert!(matches!(err, SyncError::CredentialInvalid));
        assert!(err.requires_reconnect());

        // The stale blobs are left untouched for a later reconnect.
        let stored = find_integration(&db, test_user_id())
            .await
            .expect("find")
            .expect("integration");
        assert_eq!(vault.decrypt(&stored.access_token).value(), "old-access");
    }

    #[tokio::test]
    async fn fallback_decoded_access_token_is_flagged() {
        let db = connect_and_migrate("sqlite::memory:").await.expect("db");
        let vault = Vault::from_secret("s");
        let transport = MockTransport::new();

        let mut integration =
            seed_integration(&db, &vault, Some(Utc::now() + Duration::hours(2))).await;
        // A raw token stored before the sealed format existed.
        integration.access_token = "legacy-raw-token".to_string();

        let cred = ensure_valid_credential(&db, &vault, &oauth(&transport), &integration)
            .await
            .expect("credential");

        assert_eq!(&*cred.access_token, "legacy-raw-token");
        assert_eq!(cred.warnings.len(), 1);
        assert!(cred.warnings[0].contains("fallback"));
    }
}
