//! GitLab OAuth token endpoint: authorization-code exchange and refresh.
//!
//! Goes through the same `HttpTransport` boundary as the REST client so
//! tests can drive it with an in-memory transport.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::error::{GitLabError, Result};
use super::normalize_base_url;
use crate::http::{HttpMethod, HttpRequest, HttpTransport};

/// A freshly issued access/refresh token pair.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of the access token in seconds.
    pub expires_in: i64,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl AccessTokenResponse {
    /// Absolute expiry computed from now.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc::now() + Duration::seconds(self.expires_in)
    }
}

/// The token endpoint answers either a token pair or an OAuth error body.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TokenResponse {
    Success(AccessTokenResponse),
    Error {
        error: String,
        #[serde(default)]
        error_description: Option<String>,
    },
}

#[derive(Serialize)]
struct TokenRequestBody<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    grant_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_uri: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<&'a str>,
}

/// Client for the platform OAuth token endpoint.
#[derive(Clone)]
pub struct OAuthClient {
    transport: Arc<dyn HttpTransport>,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl std::fmt::Debug for OAuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The client secret must never appear in logs.
        f.debug_struct("OAuthClient")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl OAuthClient {
    /// Create an OAuth client for a GitLab host.
    ///
    /// `base_url` is the platform root (e.g. "gitlab.com" or
    /// "https://gitlab.example.com"); the token endpoint is derived from it.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        base_url: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            token_url: format!("{}/oauth/token", normalize_base_url(base_url)),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Exchange an authorization code for a token pair.
    pub async fn exchange_authorization_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<AccessTokenResponse> {
        self.request_token(TokenRequestBody {
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            grant_type: "authorization_code",
            code: Some(code),
            redirect_uri: Some(redirect_uri),
            refresh_token: None,
        })
        .await
    }

    /// Exchange a refresh token for a new token pair.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<AccessTokenResponse> {
        self.request_token(TokenRequestBody {
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            grant_type: "refresh_token",
            code: None,
            redirect_uri: None,
            refresh_token: Some(refresh_token),
        })
        .await
    }

    async fn request_token(&self, body: TokenRequestBody<'_>) -> Result<AccessTokenResponse> {
        let request = HttpRequest {
            method: HttpMethod::Post,
            url: self.token_url.clone(),
            headers: vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("Accept".to_string(), "application/json".to_string()),
            ],
            body: serde_json::to_vec(&body)?,
        };

        let response = self.transport.send(request).await?;
        let text = String::from_utf8_lossy(&response.body);

        if !(200..300).contains(&response.status) {
            return Err(GitLabError::from_status(response.status, &text));
        }

        match serde_json::from_slice::<TokenResponse>(&response.body)? {
            TokenResponse::Success(tokens) => Ok(tokens),
            TokenResponse::Error {
                error,
                error_description,
            } => {
                // Some deployments answer 200 with an error body.
                let detail = error_description.unwrap_or_default();
                if error == "invalid_grant" {
                    Err(GitLabError::TokenInvalid)
                } else {
                    Err(GitLabError::Api {
                        status: response.status,
                        message: format!("{error}: {detail}"),
                    })
                }
            }
        }
    }
}
