//! Data providers: where articles, listings and owner info come from.
//!
//! - `github`: hosted repository over the GitHub REST API
//! - `local`: a directory on disk, with commit metadata from local git
//! - `cache`: per-instance TTL memoization used by the remote provider

pub mod cache;
pub mod github;
pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{FileInfo, SourceInfo};

pub use github::{GitHubDataProvider, GitHubOptions};
pub use local::{LocalFsDataProvider, LocalFsOptions};

/// Capability contract every content source implements.
///
/// Built-in providers only return `Err` from `get_article_list`, when the
/// source as a whole is unreachable. The other methods normalize failure
/// (`None`, fallback source info, `"main"`), but the router still tolerates
/// `Err` from any of them for custom providers.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// All articles with preview content, newest first.
    async fn get_article_list(&self) -> Result<Vec<FileInfo>>;

    /// One article with full content, `None` when absent.
    async fn get_article(&self, path: &str) -> Result<Option<FileInfo>>;

    async fn get_source_info(&self) -> Result<SourceInfo>;

    async fn get_default_branch(&self) -> Result<String>;
}

/// Sort by last commit date, newest first. Stable, so ties keep listing order.
pub fn sort_newest_first(articles: &mut [FileInfo]) {
    articles.sort_by(|a, b| b.commit_info.date.cmp(&a.commit_info.date));
}
