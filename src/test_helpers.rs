//! Shared fixtures for unit tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{ProviderError, Result};
use crate::models::{CommitInfo, FileInfo, SourceInfo};
use crate::provider::DataProvider;

#[path = "../tests/support/git_repo.rs"]
mod git_repo;

pub use git_repo::{commit_files, init_repo};

pub fn article_at(path: &str, date: &str) -> FileInfo {
    let date = DateTime::parse_from_rfc3339(date).unwrap().with_timezone(&Utc);
    FileInfo {
        path: path.to_string(),
        content: format!("# {}\n\nBody of {}.", path, path),
        sha: format!("sha-{}", path),
        url: format!("https://example.com/{}", path),
        commit_info: CommitInfo {
            date,
            author_name: "Jane Doe".to_string(),
            author_email: Some("jane@example.com".to_string()),
            author_username: Some("jane".to_string()),
            author_avatar_url: None,
        },
        title: path.trim_end_matches(".md").to_string(),
    }
}

pub fn source_info() -> SourceInfo {
    SourceInfo {
        name: "Jane Doe".to_string(),
        bio: Some("Writes about things".to_string()),
        avatar_url: Some("https://avatars.example.com/jane".to_string()),
        source_url: "https://github.com/jane/madea.blog".to_string(),
    }
}

/// In-memory provider with switchable failures. Records every path passed
/// to `get_article`.
pub struct StubProvider {
    pub articles: Vec<FileInfo>,
    pub fail_list: bool,
    pub fail_article: bool,
    pub source: Option<SourceInfo>,
    pub branch: Option<String>,
    requested: Mutex<Vec<String>>,
}

impl StubProvider {
    pub fn new(articles: Vec<FileInfo>) -> Self {
        Self {
            articles,
            fail_list: false,
            fail_article: false,
            source: Some(source_info()),
            branch: Some("main".to_string()),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn requested_paths(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

fn stub_failure(what: &str) -> ProviderError {
    ProviderError::Internal(format!("stub {} failure", what))
}

#[async_trait]
impl DataProvider for StubProvider {
    async fn get_article_list(&self) -> Result<Vec<FileInfo>> {
        if self.fail_list {
            return Err(stub_failure("list"));
        }
        Ok(self.articles.clone())
    }

    async fn get_article(&self, path: &str) -> Result<Option<FileInfo>> {
        self.requested.lock().unwrap().push(path.to_string());
        if self.fail_article {
            return Err(stub_failure("article"));
        }
        Ok(self.articles.iter().find(|a| a.path == path).cloned())
    }

    async fn get_source_info(&self) -> Result<SourceInfo> {
        self.source.clone().ok_or_else(|| stub_failure("source"))
    }

    async fn get_default_branch(&self) -> Result<String> {
        self.branch.clone().ok_or_else(|| stub_failure("branch"))
    }
}
