//! Client configuration and GitHub API payloads.

use std::fmt;

use serde::{Deserialize, Serialize};

use benchgate_core::override_gate::{CommentKind, ReviewComment};

/// Review client configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Base URL of the GitHub REST API.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Repository as `owner/name`.
    #[serde(default)]
    pub repository: Option<String>,

    /// API token.
    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries for transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            repository: None,
            token: None,
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl fmt::Debug for ReviewConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReviewConfig")
            .field("api_url", &self.api_url)
            .field("repository", &self.repository)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl ReviewConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `BENCHGATE_GITHUB_API_URL` | API base URL |
    /// | `BENCHGATE_GITHUB_REPOSITORY` | `owner/name` |
    /// | `BENCHGATE_GITHUB_TIMEOUT` | Request timeout in seconds |
    /// | `BENCHGATE_GITHUB_MAX_RETRIES` | Retries for transient failures |
    ///
    /// The token comes from the build expansions, see [`Self::with_token`].
    pub fn from_env() -> Self {
        Self {
            api_url: std::env::var("BENCHGATE_GITHUB_API_URL")
                .unwrap_or_else(|_| default_api_url()),
            repository: std::env::var("BENCHGATE_GITHUB_REPOSITORY")
                .ok()
                .filter(|r| !r.is_empty()),
            token: None,
            timeout_secs: std::env::var("BENCHGATE_GITHUB_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_timeout),
            max_retries: std::env::var("BENCHGATE_GITHUB_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_max_retries),
        }
    }

    /// Set the token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the API base URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Set the repository (`owner/name`).
    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// Issue, review or commit comment as returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiComment {
    #[serde(default)]
    pub body: Option<String>,
    /// `null` for deleted accounts.
    #[serde(default)]
    pub user: Option<ApiUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiUser {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCommit {
    pub sha: String,
}

impl ApiComment {
    pub fn into_review_comment(self, kind: CommentKind) -> ReviewComment {
        ReviewComment::new(
            kind,
            self.user.map(|u| u.login).unwrap_or_default(),
            self.body.unwrap_or_default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deleted_author_has_empty_login() {
        let c: ApiComment = serde_json::from_str(r#"{"body": "hi", "user": null}"#).unwrap();
        let r = c.into_review_comment(CommentKind::Issue);
        assert_eq!(r.author, "");
        assert_eq!(r.body, "hi");
    }

    #[test]
    fn test_config_debug_redacts_token() {
        let cfg = ReviewConfig::default()
            .with_token("ghp_secret")
            .with_repository("acme/server");
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("ghp_secret"));
        assert!(dbg.contains("acme/server"));
        assert_eq!(cfg.api_url, "https://api.github.com");
    }
}
