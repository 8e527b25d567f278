//! GitHub comment source for benchgate threshold overrides.
//!
//! Implements [`benchgate_core::CommentSource`] over the GitHub REST API,
//! reading the issue, review and commit comments of a pull request.
//!
//! ```no_run
//! use benchgate_review::{GithubCommentSource, ReviewConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ReviewConfig::from_env()
//!     .with_repository("acme/server")
//!     .with_token("ghp_example");
//! let source = GithubCommentSource::new(config)?;
//! let comments = source.all_comments(4242).await?;
//! println!("{} comments", comments.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `BENCHGATE_GITHUB_API_URL` | API base URL (default: `https://api.github.com`) |
//! | `BENCHGATE_GITHUB_REPOSITORY` | Repository as `owner/name` |
//! | `BENCHGATE_GITHUB_TIMEOUT` | Request timeout in seconds (default: 30) |
//! | `BENCHGATE_GITHUB_MAX_RETRIES` | Max retries for transient failures (default: 3) |

pub mod client;
pub mod error;
pub mod types;

pub use client::GithubCommentSource;
pub use error::{ReviewError, ReviewResult};
pub use types::ReviewConfig;

/// User agent sent with every request.
pub const REVIEW_USER_AGENT: &str = concat!("benchgate-review/", env!("CARGO_PKG_VERSION"));
