//! Paginating, rate-limited GitLab REST client.
//!
//! A client is constructed per sync attempt with an explicit credential;
//! there is no long-lived client carrying a bearer token across users.
//! All I/O goes through the `HttpTransport` boundary.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;

use super::error::{is_rate_limit_error, GitLabError, Result};
use super::normalize_base_url;
use super::types::{GitLabCommit, GitLabIssue, GitLabMergeRequest, GitLabProject, GitLabUser};
use crate::http::{HttpMethod, HttpRequest, HttpTransport};
use crate::rate_limit::ApiRateLimiter;
use crate::retry::with_retry;

/// Items requested per page.
pub const PAGE_SIZE: usize = 100;

/// Hard cap on pages fetched for a single listing.
pub const MAX_PAGES: usize = 50;

/// GitLab REST API client scoped to one access token.
#[derive(Clone)]
pub struct GitLabClient {
    transport: Arc<dyn HttpTransport>,
    api_base: String,
    token: String,
    rate_limiter: Option<ApiRateLimiter>,
}

impl std::fmt::Debug for GitLabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The access token must never appear in logs.
        f.debug_struct("GitLabClient")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl GitLabClient {
    /// Create a client for a GitLab host and access token.
    ///
    /// `base_url` is the platform root (e.g. "gitlab.com" or
    /// "https://gitlab.example.com"); the v4 API base is derived from it.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        base_url: &str,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            api_base: format!("{}/api/v4", normalize_base_url(base_url)),
            token: access_token.into(),
            rate_limiter: None,
        }
    }

    /// Attach a per-credential rate limiter; every request waits on it.
    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: ApiRateLimiter) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    /// The API base URL (for diagnostics).
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Get the authenticated user's profile.
    pub async fn current_user(&self) -> Result<GitLabUser> {
        self.get_json(format!("{}/user", self.api_base)).await
    }

    /// List all projects the user is a member of, most recently active
    /// first, with automatic pagination.
    pub async fn list_projects(&self) -> Result<Vec<GitLabProject>> {
        self.get_paginated(format!(
            "{}/projects?membership=true&order_by=last_activity_at&sort=desc",
            self.api_base
        ))
        .await
    }

    /// List commits in one project within a time window, optionally
    /// restricted to an author (matched against name or email by GitLab).
    pub async fn list_commits(
        &self,
        project_id: u64,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        author: Option<&str>,
    ) -> Result<Vec<GitLabCommit>> {
        let mut url = format!(
            "{}/projects/{}/repository/commits?since={}&until={}",
            self.api_base,
            project_id,
            encode_query_value(&rfc3339(since)),
            encode_query_value(&rfc3339(until)),
        );
        if let Some(author) = author {
            url.push_str("&author=");
            url.push_str(&encode_query_value(author));
        }
        self.get_paginated(url).await
    }

    /// Get a single commit including line-change stats.
    pub async fn commit_detail(&self, project_id: u64, sha: &str) -> Result<GitLabCommit> {
        self.get_json(format!(
            "{}/projects/{}/repository/commits/{}",
            self.api_base,
            project_id,
            encode_query_value(sha)
        ))
        .await
    }

    /// List issues assigned to a user, with automatic pagination.
    pub async fn list_assigned_issues(
        &self,
        assignee_id: u64,
        state: Option<&str>,
    ) -> Result<Vec<GitLabIssue>> {
        let mut url = format!(
            "{}/issues?assignee_id={}&scope=assigned_to_me",
            self.api_base, assignee_id
        );
        if let Some(state) = state {
            url.push_str("&state=");
            url.push_str(&encode_query_value(state));
        }
        self.get_paginated(url).await
    }

    /// List merge requests authored by a user, with automatic pagination.
    pub async fn list_authored_merge_requests(
        &self,
        author_id: u64,
        state: Option<&str>,
    ) -> Result<Vec<GitLabMergeRequest>> {
        let mut url = format!(
            "{}/merge_requests?author_id={}&scope=created_by_me",
            self.api_base, author_id
        );
        if let Some(state) = state {
            url.push_str("&state=");
            url.push_str(&encode_query_value(state));
        }
        self.get_paginated(url).await
    }

    /// Get a project's language breakdown as percentage shares.
    pub async fn project_languages(&self, project_id: u64) -> Result<HashMap<String, f64>> {
        self.get_json(format!("{}/projects/{}/languages", self.api_base, project_id))
            .await
    }

    /// Fetch pages of `url` until a short page is returned.
    ///
    /// `url` may already carry query parameters; `page` and `per_page` are
    /// appended. A hard page cap bounds worst-case volume.
    async fn get_paginated<T: DeserializeOwned>(&self, url: String) -> Result<Vec<T>> {
        let separator = if url.contains('?') { '&' } else { '?' };
        let mut results = Vec::new();
        let mut page = 1usize;

        loop {
            let page_url = format!("{url}{separator}page={page}&per_page={PAGE_SIZE}");
            let items: Vec<T> = self.get_json(page_url).await?;
            let count = items.len();
            results.extend(items);

            if count < PAGE_SIZE {
                break;
            }
            if page >= MAX_PAGES {
                tracing::warn!(url = %url, pages = MAX_PAGES, "page cap reached, truncating listing");
                break;
            }
            page += 1;
        }

        Ok(results)
    }

    /// Perform one GET, retrying on rate limits, and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T> {
        let body = with_retry(
            || self.get_once(&url),
            is_rate_limit_error,
            |e: &GitLabError| e.to_string(),
            &url,
        )
        .await?;

        Ok(serde_json::from_slice(&body)?)
    }

    async fn get_once(&self, url: &str) -> Result<Vec<u8>> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.wait().await;
        }

        let request = HttpRequest {
            method: HttpMethod::Get,
            url: url.to_string(),
            headers: vec![
                (
                    "Authorization".to_string(),
                    format!("Bearer {}", self.token),
                ),
                ("Accept".to_string(), "application/json".to_string()),
            ],
            body: Vec::new(),
        };

        let response = self.transport.send(request).await?;
        if !(200..300).contains(&response.status) {
            let text = String::from_utf8_lossy(&response.body);
            return Err(GitLabError::from_status(response.status, &text));
        }
        Ok(response.body)
    }
}

fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Percent-encode a query parameter value.
pub(crate) fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => {
                out.push('%');
                out.push_str(&format!("{byte:02X}"));
            }
        }
    }
    out
}
