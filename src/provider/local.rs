//! Local provider: markdown files in a directory, attributed via local git.
//!
//! Commit metadata and content ids come from ordered fallback chains, each
//! step tried only when the previous one fails:
//! - commit info: git history → file modification time → now
//! - sha: blob id at HEAD → inode → timestamp
//!
//! All filesystem and git work runs on the blocking pool. A listing reads
//! history for every file in one walk instead of one walk per file.

use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use walkdir::{DirEntry, WalkDir};

use crate::error::{ConfigError, ProviderError, Result};
use crate::git::{ContentRepository, LastCommit};
use crate::models::{CommitInfo, FileInfo, SourceInfo};
use crate::provider::{sort_newest_first, DataProvider};
use crate::text::{extract_title, is_markdown_file, preview, title_from_path};

const DEFAULT_AUTHOR: &str = "Local Author";
const FALLBACK_BRANCH: &str = "main";
const SOURCE_BIO: &str = "Serving content from local filesystem";
const SKIPPED_DIRS: &[&str] = &["node_modules", "target"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommitInfoSource {
    History,
    ModifiedTime,
    Now,
}

const COMMIT_INFO_SOURCES: [CommitInfoSource; 3] = [
    CommitInfoSource::History,
    CommitInfoSource::ModifiedTime,
    CommitInfoSource::Now,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShaSource {
    HeadBlob,
    Inode,
    Timestamp,
}

const SHA_SOURCES: [ShaSource; 3] = [ShaSource::HeadBlob, ShaSource::Inode, ShaSource::Timestamp];

#[derive(Debug, Clone)]
pub struct LocalFsOptions {
    pub content_dir: PathBuf,
    /// Used when git history has no author for a file. Defaults to `$USER`.
    pub author_name: Option<String>,
    /// Defaults to `file://<content dir>`.
    pub source_url: Option<String>,
}

impl LocalFsOptions {
    pub fn new(content_dir: impl Into<PathBuf>) -> Self {
        Self {
            content_dir: content_dir.into(),
            author_name: None,
            source_url: None,
        }
    }

    pub fn with_author_name(mut self, author_name: Option<String>) -> Self {
        self.author_name = author_name;
        self
    }

    pub fn with_source_url(mut self, source_url: Option<String>) -> Self {
        self.source_url = source_url;
        self
    }
}

struct LocalContent {
    content_dir: PathBuf,
    author_name: String,
    source_url: String,
    repo: Option<ContentRepository>,
}

pub struct LocalFsDataProvider {
    content: Arc<LocalContent>,
}

impl LocalFsDataProvider {
    pub fn new(options: LocalFsOptions) -> std::result::Result<Self, ConfigError> {
        let content_dir = std::path::absolute(&options.content_dir).map_err(|source| ConfigError::ContentDir {
            path: options.content_dir.to_string_lossy().to_string(),
            source,
        })?;

        let author_name = options
            .author_name
            .filter(|n| !n.is_empty())
            .or_else(|| std::env::var("USER").ok().filter(|n| !n.is_empty()))
            .unwrap_or_else(|| DEFAULT_AUTHOR.to_string());

        let source_url = options
            .source_url
            .unwrap_or_else(|| format!("file://{}", content_dir.display()));

        let repo = match ContentRepository::discover(&content_dir) {
            Ok(repo) => Some(repo),
            Err(e) => {
                tracing::info!("Serving {} without git history: {}", content_dir.display(), e);
                None
            }
        };

        Ok(Self {
            content: Arc::new(LocalContent {
                content_dir,
                author_name,
                source_url,
                repo,
            }),
        })
    }

    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&LocalContent) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let content = Arc::clone(&self.content);
        tokio::task::spawn_blocking(move || f(&content)).await?
    }
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref())
}

fn to_slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(unix)]
fn inode_token(path: &Path) -> Result<String> {
    use std::os::unix::fs::MetadataExt;
    Ok(format!("local-{}", fs::metadata(path)?.ino()))
}

#[cfg(not(unix))]
fn inode_token(_path: &Path) -> Result<String> {
    Err(ProviderError::Internal("inode ids are only available on unix".to_string()))
}

impl LocalContent {
    fn repo(&self) -> Result<&ContentRepository> {
        self.repo
            .as_ref()
            .ok_or_else(|| ProviderError::NoRepository(self.content_dir.to_string_lossy().to_string()))
    }

    /// Content-relative path to an on-disk path. Rejects anything that could
    /// escape the content directory.
    fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let path = Path::new(relative);
        if path.as_os_str().is_empty() || !path.components().all(|c| matches!(c, Component::Normal(_))) {
            return None;
        }
        Some(self.content_dir.join(path))
    }

    fn markdown_files(&self) -> Result<Vec<String>> {
        let root = &self.content_dir;
        if !fs::metadata(root)?.is_dir() {
            return Err(ProviderError::InvalidPath(format!("{} is not a directory", root.display())));
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(root).min_depth(1).into_iter().filter_entry(|e| !is_skipped_dir(e));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !is_markdown_file(&entry.file_name().to_string_lossy()) {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(root) {
                files.push(to_slash_path(relative));
            }
        }

        files.sort();
        Ok(files)
    }

    /// Last commit of every listed file, from one history walk. Empty when
    /// there is no repository or the walk fails.
    fn listing_history(&self, paths: &[String]) -> HashMap<String, LastCommit> {
        match self.repo().and_then(|repo| repo.last_commits(paths)) {
            Ok(history) => history,
            Err(e) => {
                tracing::debug!("Listing without git history: {}", e);
                HashMap::new()
            }
        }
    }

    /// `listed` carries the listing's history walk; without it the history
    /// for `relative` is looked up on its own.
    fn commit_info_from(
        &self,
        source: CommitInfoSource,
        relative: &str,
        listed: Option<&HashMap<String, LastCommit>>,
    ) -> Result<CommitInfo> {
        match source {
            CommitInfoSource::History => {
                let last = match listed {
                    Some(history) => history.get(relative).cloned(),
                    None => self.repo()?.last_commit(relative)?,
                }
                .ok_or_else(|| ProviderError::NotFound(format!("no commits touching {}", relative)))?;
                Ok(CommitInfo {
                    date: last.date,
                    author_name: last.author_name,
                    author_email: last.author_email,
                    author_username: None,
                    author_avatar_url: None,
                })
            }
            CommitInfoSource::ModifiedTime => {
                let modified = fs::metadata(self.content_dir.join(relative))?.modified()?;
                Ok(self.fallback_commit_info(DateTime::<Utc>::from(modified)))
            }
            CommitInfoSource::Now => Ok(self.fallback_commit_info(Utc::now())),
        }
    }

    fn fallback_commit_info(&self, date: DateTime<Utc>) -> CommitInfo {
        CommitInfo {
            date,
            author_name: self.author_name.clone(),
            author_email: None,
            author_username: None,
            author_avatar_url: None,
        }
    }

    fn commit_info(&self, relative: &str, listed: Option<&HashMap<String, LastCommit>>) -> CommitInfo {
        for source in COMMIT_INFO_SOURCES {
            match self.commit_info_from(source, relative, listed) {
                Ok(info) => return info,
                Err(e) => tracing::debug!("Commit info via {:?} failed for {}: {}", source, relative, e),
            }
        }
        self.fallback_commit_info(Utc::now())
    }

    fn sha_from(&self, source: ShaSource, relative: &str) -> Result<String> {
        match source {
            ShaSource::HeadBlob => self.repo()?.blob_id_at_head(relative),
            ShaSource::Inode => inode_token(&self.content_dir.join(relative)),
            ShaSource::Timestamp => Ok(format!("local-{}", Utc::now().timestamp_millis())),
        }
    }

    fn sha(&self, relative: &str) -> String {
        for source in SHA_SOURCES {
            match self.sha_from(source, relative) {
                Ok(sha) => return sha,
                Err(e) => tracing::debug!("Sha via {:?} failed for {}: {}", source, relative, e),
            }
        }
        format!("local-{}", Utc::now().timestamp_millis())
    }

    fn list_entry(&self, relative: &str, history: &HashMap<String, LastCommit>) -> FileInfo {
        let full_path = self.content_dir.join(relative);
        let (content, title) = match fs::read_to_string(&full_path) {
            Ok(content) => (preview(&content), extract_title(&content, relative)),
            Err(e) => {
                tracing::debug!("Using fallback metadata for {}: {}", relative, e);
                (String::new(), title_from_path(relative))
            }
        };

        FileInfo {
            path: relative.to_string(),
            content,
            sha: self.sha(relative),
            url: full_path.to_string_lossy().to_string(),
            commit_info: self.commit_info(relative, Some(history)),
            title,
        }
    }

    fn article_list(&self) -> Result<Vec<FileInfo>> {
        let paths = self.markdown_files()?;
        tracing::info!("Listing {} markdown files from {}", paths.len(), self.content_dir.display());

        let history = self.listing_history(&paths);
        let mut articles: Vec<FileInfo> = paths.iter().map(|relative| self.list_entry(relative, &history)).collect();
        sort_newest_first(&mut articles);
        Ok(articles)
    }

    fn article(&self, relative: &str) -> Option<FileInfo> {
        if !is_markdown_file(relative) {
            return None;
        }
        let full_path = self.resolve(relative)?;
        let content = match fs::read_to_string(&full_path) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!("Article {} unavailable: {}", relative, e);
                return None;
            }
        };

        Some(FileInfo {
            path: relative.to_string(),
            title: extract_title(&content, relative),
            content,
            sha: self.sha(relative),
            url: full_path.to_string_lossy().to_string(),
            commit_info: self.commit_info(relative, None),
        })
    }

    fn default_branch(&self) -> String {
        match self.repo().and_then(|repo| repo.head_branch()) {
            Ok(Some(branch)) if !branch.is_empty() => branch,
            Ok(_) => FALLBACK_BRANCH.to_string(),
            Err(e) => {
                tracing::debug!("Using {} as default branch: {}", FALLBACK_BRANCH, e);
                FALLBACK_BRANCH.to_string()
            }
        }
    }
}

#[async_trait]
impl DataProvider for LocalFsDataProvider {
    async fn get_article_list(&self) -> Result<Vec<FileInfo>> {
        self.blocking(|content| content.article_list()).await
    }

    async fn get_article(&self, path: &str) -> Result<Option<FileInfo>> {
        let relative = path.trim_start_matches('/').to_string();
        self.blocking(move |content| Ok(content.article(&relative))).await
    }

    async fn get_source_info(&self) -> Result<SourceInfo> {
        Ok(SourceInfo {
            name: self.content.author_name.clone(),
            bio: Some(SOURCE_BIO.to_string()),
            avatar_url: None,
            source_url: self.content.source_url.clone(),
        })
    }

    async fn get_default_branch(&self) -> Result<String> {
        self.blocking(|content| Ok(content.default_branch())).await
    }
}
