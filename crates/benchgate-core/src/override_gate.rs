//! Merge-queue override of threshold violations.
//!
//! In a merge-queue run, an allow-listed reviewer can approve the
//! violations of the whole suite by leaving a comment containing
//! [`OVERRIDE_PHRASE`] on the pull request. Comments are read through a
//! [`CommentSource`]; lookup failures are errors, never approvals.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Expansions;
use crate::errors::{GateError, GateResult};

/// Matched case-insensitively anywhere in the comment body.
pub const OVERRIDE_PHRASE: &str = "perf threshold check override";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentKind {
    Issue,
    Review,
    Commit,
}

impl CommentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Issue => "issue",
            Self::Review => "review",
            Self::Commit => "commit",
        }
    }
}

/// A pull-request comment. `author` is empty for deleted accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewComment {
    pub kind: CommentKind,
    pub author: String,
    pub body: String,
}

impl ReviewComment {
    pub fn new(kind: CommentKind, author: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind,
            author: author.into(),
            body: body.into(),
        }
    }

    pub fn contains_override_phrase(&self) -> bool {
        self.body.to_lowercase().contains(OVERRIDE_PHRASE)
    }
}

/// Read access to the comments of a pull request.
///
/// Implementations return issue, review and commit comments together.
#[async_trait]
pub trait CommentSource: Send + Sync {
    async fn comments(&self, pr_number: u64) -> anyhow::Result<Vec<ReviewComment>>;

    fn name(&self) -> &'static str;
}

/// Who approved an override, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideApproval {
    pub author: String,
    pub kind: CommentKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideDecision {
    /// Not a merge-queue run; violations stand.
    NotApplicable,
    Approved(OverrideApproval),
    /// No allow-listed override comment was found.
    Denied,
}

impl OverrideDecision {
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved(_))
    }
}

pub struct OverrideGate {
    approvers: Vec<String>,
    source: Option<Arc<dyn CommentSource>>,
    approved: Option<OverrideApproval>,
}

impl fmt::Debug for OverrideGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverrideGate")
            .field("approvers", &self.approvers)
            .field("source", &self.source.as_ref().map(|s| s.name()))
            .field("approved", &self.approved)
            .finish()
    }
}

impl OverrideGate {
    /// Gate with a fixed allow-list. Logins compare case-insensitively.
    pub fn new<I, S>(approvers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            approvers: approvers
                .into_iter()
                .map(|a| a.as_ref().to_lowercase())
                .collect(),
            source: None,
            approved: None,
        }
    }

    pub fn with_source(mut self, source: Arc<dyn CommentSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn is_approver(&self, login: &str) -> bool {
        !login.is_empty() && self.approvers.iter().any(|a| *a == login.to_lowercase())
    }

    /// First comment that approves an override, if any.
    pub fn find_approval<'a>(&self, comments: &'a [ReviewComment]) -> Option<&'a ReviewComment> {
        comments
            .iter()
            .find(|c| self.is_approver(&c.author) && c.contains_override_phrase())
    }

    /// Decide whether the current violations may be overridden.
    ///
    /// An approval covers the rest of the suite, so once found it is reused
    /// without another lookup. Denials are looked up again next time.
    pub async fn evaluate(&mut self, expansions: &Expansions) -> GateResult<OverrideDecision> {
        if !expansions.is_merge_queue() {
            info!(
                requester = expansions.requester.as_deref().unwrap_or(""),
                "not a merge queue run; threshold violations are final"
            );
            return Ok(OverrideDecision::NotApplicable);
        }
        if let Some(approval) = &self.approved {
            return Ok(OverrideDecision::Approved(approval.clone()));
        }

        let pr_number = pr_number(expansions)?;
        if expansions.github_token.as_deref().unwrap_or("").is_empty() {
            return Err(GateError::MissingOverrideContext {
                field: "github_token".into(),
                detail: "an API token is required to read override comments".into(),
            });
        }
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| GateError::MissingOverrideContext {
                field: "comment source".into(),
                detail: "no code-review client is configured".into(),
            })?;

        let comments = source
            .comments(pr_number)
            .await
            .map_err(|e| GateError::OverrideLookup {
                pr_number,
                message: format!("{:#}", e),
            })?;

        match self.find_approval(&comments) {
            Some(c) => {
                warn!(
                    pr = pr_number,
                    author = %c.author,
                    kind = c.kind.as_str(),
                    "performance threshold override approved"
                );
                let approval = OverrideApproval {
                    author: c.author.clone(),
                    kind: c.kind,
                };
                self.approved = Some(approval.clone());
                Ok(OverrideDecision::Approved(approval))
            }
            None => {
                info!(
                    pr = pr_number,
                    comments = comments.len(),
                    "no approved override comment found"
                );
                Ok(OverrideDecision::Denied)
            }
        }
    }
}

fn pr_number(expansions: &Expansions) -> GateResult<u64> {
    let raw = expansions
        .github_pr_number
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| GateError::MissingOverrideContext {
            field: "github_pr_number".into(),
            detail: "merge queue runs must name their pull request".into(),
        })?;
    raw.parse().map_err(|_| GateError::MissingOverrideContext {
        field: "github_pr_number".into(),
        detail: format!("'{}' is not a pull request number", raw),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        comments: Vec<ReviewComment>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CommentSource for Fixed {
        async fn comments(&self, _pr_number: u64) -> anyhow::Result<Vec<ReviewComment>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.comments.clone())
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    struct Broken;

    #[async_trait]
    impl CommentSource for Broken {
        async fn comments(&self, _pr_number: u64) -> anyhow::Result<Vec<ReviewComment>> {
            anyhow::bail!("connection reset")
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    fn merge_queue() -> Expansions {
        Expansions::default()
            .with_requester("github_merge_queue")
            .with_pr_number("17")
            .with_token("secret")
    }

    fn fixed(comments: Vec<ReviewComment>) -> Arc<Fixed> {
        Arc::new(Fixed {
            comments,
            calls: AtomicUsize::new(0),
        })
    }

    #[test]
    fn test_phrase_match_is_case_insensitive() {
        let c = ReviewComment::new(
            CommentKind::Issue,
            "alice",
            "Perf Threshold Check Override approved",
        );
        assert!(c.contains_override_phrase());
        let gate = OverrideGate::new(["Alice"]);
        assert!(gate.is_approver("ALICE"));
        assert!(!gate.is_approver(""));
    }

    #[tokio::test]
    async fn test_not_merge_queue_is_not_applicable() {
        let mut gate = OverrideGate::new(["alice"]);
        let exp = Expansions::default().with_requester("patch_request");
        assert_eq!(
            gate.evaluate(&exp).await.unwrap(),
            OverrideDecision::NotApplicable
        );
    }

    #[tokio::test]
    async fn test_approval_is_cached() {
        let source = fixed(vec![ReviewComment::new(
            CommentKind::Review,
            "alice",
            "perf threshold check override",
        )]);
        let mut gate = OverrideGate::new(["alice"]).with_source(source.clone());
        let first = gate.evaluate(&merge_queue()).await.unwrap();
        assert_eq!(
            first,
            OverrideDecision::Approved(OverrideApproval {
                author: "alice".into(),
                kind: CommentKind::Review
            })
        );
        assert!(gate.evaluate(&merge_queue()).await.unwrap().is_approved());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_approver_comment_is_denied() {
        let source = fixed(vec![
            ReviewComment::new(CommentKind::Issue, "mallory", "perf threshold check override"),
            ReviewComment::new(CommentKind::Commit, "alice", "looks good"),
        ]);
        let mut gate = OverrideGate::new(["alice"]).with_source(source);
        assert_eq!(
            gate.evaluate(&merge_queue()).await.unwrap(),
            OverrideDecision::Denied
        );
    }

    #[tokio::test]
    async fn test_missing_context_is_error() {
        let mut gate = OverrideGate::new(["alice"]).with_source(fixed(vec![]));
        let mut exp = merge_queue();
        exp.github_pr_number = None;
        let err = gate.evaluate(&exp).await.unwrap_err();
        assert!(matches!(err, GateError::MissingOverrideContext { ref field, .. } if field == "github_pr_number"));

        let mut exp = merge_queue();
        exp.github_token = None;
        let err = gate.evaluate(&exp).await.unwrap_err();
        assert!(matches!(err, GateError::MissingOverrideContext { ref field, .. } if field == "github_token"));

        let exp = merge_queue().with_pr_number("abc");
        assert!(gate.evaluate(&exp).await.is_err());
    }

    #[tokio::test]
    async fn test_lookup_failure_does_not_approve() {
        let mut gate = OverrideGate::new(["alice"]).with_source(Arc::new(Broken));
        let err = gate.evaluate(&merge_queue()).await.unwrap_err();
        assert!(matches!(err, GateError::OverrideLookup { pr_number: 17, .. }));
        assert!(err.to_string().contains("connection reset"));
    }
}
