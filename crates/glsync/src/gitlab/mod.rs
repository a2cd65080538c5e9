//! GitLab platform integration: REST client, OAuth, wire types, errors.

pub mod client;
pub mod convert;
pub mod error;
pub mod oauth;
pub mod types;

pub use client::{GitLabClient, MAX_PAGES, PAGE_SIZE};
pub use convert::{
    commit_to_active_model, issue_to_active_model, merge_request_to_active_model, ProjectContext,
};
pub use error::{is_rate_limit_error, GitLabError};
pub use oauth::{AccessTokenResponse, OAuthClient};
pub use types::{
    CommitStats, GitLabAssignee, GitLabCommit, GitLabIssue, GitLabMergeRequest, GitLabMilestone,
    GitLabProject, GitLabUser,
};

/// Normalize a platform root URL: add an https scheme when missing and
/// strip any trailing slash.
#[must_use]
pub fn normalize_base_url(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_gets_https_scheme() {
        assert_eq!(normalize_base_url("gitlab.com"), "https://gitlab.com");
    }

    #[test]
    fn explicit_scheme_is_preserved() {
        assert_eq!(
            normalize_base_url("http://gitlab.internal:8080/"),
            "http://gitlab.internal:8080"
        );
    }

    #[test]
    fn trailing_slash_is_stripped() {
        assert_eq!(
            normalize_base_url("https://gitlab.example.com/"),
            "https://gitlab.example.com"
        );
    }
}
