//! GitHub pull request comment client.
//!
//! Public API: no status code knowledge. All HTTP/status mapping in http.rs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use benchgate_core::override_gate::{CommentKind, CommentSource, ReviewComment};

use crate::error::{ReviewError, ReviewResult};
use crate::types::{ApiComment, ApiCommit, ReviewConfig};
use crate::REVIEW_USER_AGENT;

mod http;

use http::HttpBackend;

/// Reads issue, review and commit comments of a pull request.
#[derive(Debug, Clone)]
pub struct GithubCommentSource {
    http: HttpBackend,
    base_url: String,
    repository: String,
}

impl GithubCommentSource {
    pub fn new(config: ReviewConfig) -> ReviewResult<Self> {
        let repository = config
            .repository
            .clone()
            .filter(|r| r.contains('/'))
            .ok_or_else(|| ReviewError::Config {
                message: "repository must be set as owner/name".to_string(),
            })?;
        let token = config
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ReviewError::Config {
                message: "an API token is required".to_string(),
            })?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(REVIEW_USER_AGENT));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| ReviewError::Network {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http: HttpBackend {
                client,
                token,
                max_retries: config.max_retries,
            },
            base_url: config.api_url.trim_end_matches('/').to_string(),
            repository,
        })
    }

    fn repo_url(&self, path: &str) -> String {
        format!("{}/repos/{}/{}", self.base_url, self.repository, path)
    }

    pub async fn issue_comments(&self, pr_number: u64) -> ReviewResult<Vec<ReviewComment>> {
        let url = self.repo_url(&format!("issues/{}/comments", pr_number));
        self.list_comments(&url, CommentKind::Issue).await
    }

    pub async fn review_comments(&self, pr_number: u64) -> ReviewResult<Vec<ReviewComment>> {
        let url = self.repo_url(&format!("pulls/{}/comments", pr_number));
        self.list_comments(&url, CommentKind::Review).await
    }

    /// Comments left on any commit of the pull request.
    pub async fn commit_comments(&self, pr_number: u64) -> ReviewResult<Vec<ReviewComment>> {
        let url = self.repo_url(&format!("pulls/{}/commits", pr_number));
        let commits: Vec<ApiCommit> = self.http.get_all(&url).await?;
        let mut out = Vec::new();
        for commit in commits {
            let url = self.repo_url(&format!("commits/{}/comments", commit.sha));
            out.extend(self.list_comments(&url, CommentKind::Commit).await?);
        }
        Ok(out)
    }

    /// All three comment streams, issue comments first.
    pub async fn all_comments(&self, pr_number: u64) -> ReviewResult<Vec<ReviewComment>> {
        let mut comments = self.issue_comments(pr_number).await?;
        comments.extend(self.review_comments(pr_number).await?);
        comments.extend(self.commit_comments(pr_number).await?);
        debug!(
            pr = pr_number,
            repository = %self.repository,
            comments = comments.len(),
            "fetched pull request comments"
        );
        Ok(comments)
    }

    async fn list_comments(&self, url: &str, kind: CommentKind) -> ReviewResult<Vec<ReviewComment>> {
        let raw: Vec<ApiComment> = self.http.get_all(url).await?;
        Ok(raw
            .into_iter()
            .map(|c| c.into_review_comment(kind))
            .collect())
    }
}

#[async_trait]
impl CommentSource for GithubCommentSource {
    async fn comments(&self, pr_number: u64) -> anyhow::Result<Vec<ReviewComment>> {
        Ok(self.all_comments(pr_number).await?)
    }

    fn name(&self) -> &'static str {
        "github"
    }
}
