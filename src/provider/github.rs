//! Remote provider backed by the GitHub REST API.
//!
//! - Listing: recursive tree of the default branch, filtered to markdown under
//!   the optional sub-directory, enriched per file (content + last commit)
//!   concurrently. A file whose enrichment fails stays in the list with
//!   synthesized metadata.
//! - Caching: every response is memoized by URL in a per-instance TTL cache,
//!   one day for the repository lookup (default branch), ten minutes for
//!   trees, contents and commits. The user profile is fetched once per
//!   instance.
//! - Routing paths never carry the sub-directory prefix; it is re-added when
//!   resolving a path back to the repository.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use reqwest::Url;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;

use crate::error::{ConfigError, ProviderError, Result};
use crate::models::{CommitInfo, FileInfo, SourceInfo};
use crate::provider::cache::TtlCache;
use crate::provider::{sort_newest_first, DataProvider};
use crate::text::{extract_title, is_markdown_file, preview, title_from_path};

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_WEB_BASE: &str = "https://github.com";

const TEN_MINUTES: Duration = Duration::from_secs(60 * 10);
const ONE_DAY: Duration = Duration::from_secs(60 * 60 * 24);
const FALLBACK_BRANCH: &str = "main";
const USER_AGENT: &str = concat!("madea-blog/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct GitHubOptions {
    pub username: String,
    pub repo: String,
    /// Without a token requests run against the unauthenticated rate limit.
    pub token: Option<String>,
    pub sub_dir: Option<String>,
    pub api_base: String,
    pub web_base: String,
}

impl GitHubOptions {
    pub fn new(username: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            repo: repo.into(),
            token: None,
            sub_dir: None,
            api_base: DEFAULT_API_BASE.to_string(),
            web_base: DEFAULT_WEB_BASE.to_string(),
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn with_sub_dir(mut self, sub_dir: Option<String>) -> Self {
        self.sub_dir = sub_dir;
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct RepoResponse {
    default_branch: String,
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    tree: Vec<TreeItem>,
}

#[derive(Debug, Deserialize)]
struct TreeItem {
    path: String,
    sha: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    commit: CommitData,
    author: Option<AccountResponse>,
}

#[derive(Debug, Deserialize)]
struct CommitData {
    author: CommitAuthor,
}

#[derive(Debug, Deserialize)]
struct CommitAuthor {
    name: String,
    email: Option<String>,
    date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    login: String,
    avatar_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct GitHubUser {
    name: Option<String>,
    bio: Option<String>,
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    content: String,
    encoding: String,
    sha: String,
}

/// Decoded file from the contents endpoint
struct FileContent {
    content: String,
    sha: String,
}

pub struct GitHubDataProvider {
    client: reqwest::Client,
    username: String,
    repo_path: String,
    sub_dir: Option<String>,
    api_base: String,
    web_base: String,
    responses: TtlCache<serde_json::Value>,
    user: OnceCell<Option<GitHubUser>>,
}

impl GitHubDataProvider {
    pub fn new(options: GitHubOptions) -> std::result::Result<Self, ConfigError> {
        let username = options.username.trim().to_string();
        let repo = options.repo.trim().to_string();
        if username.is_empty() {
            return Err(ConfigError::MissingOption("username"));
        }
        if repo.is_empty() {
            return Err(ConfigError::MissingOption("repo"));
        }

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/vnd.github.v3+json"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
        if let Some(token) = options.token.as_deref().filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ConfigError::InvalidToken)?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(ConfigError::HttpClient)?;

        let sub_dir = options
            .sub_dir
            .map(|d| d.trim_matches('/').to_string())
            .filter(|d| !d.is_empty());

        Ok(Self {
            client,
            repo_path: format!("{}/{}", username, repo),
            username,
            sub_dir,
            api_base: options.api_base.trim_end_matches('/').to_string(),
            web_base: options.web_base.trim_end_matches('/').to_string(),
            responses: TtlCache::new(),
            user: OnceCell::new(),
        })
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: &str, ttl: Duration) -> Result<T> {
        let value = match self.responses.get(url) {
            Some(value) => value,
            None => {
                let response = self.client.get(url).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(ProviderError::Api {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }

                let value: serde_json::Value = response.json().await?;
                tracing::debug!("Caching GitHub response for {:?}: {}", ttl, url);
                self.responses.insert(url, value.clone(), ttl);
                value
            }
        };

        serde_json::from_value(value).map_err(|e| ProviderError::Decode(e.to_string()))
    }

    fn repo_api_url(&self) -> String {
        format!("{}/repos/{}", self.api_base, self.repo_path)
    }

    /// Repository API URL with `segments` appended. Each segment is
    /// percent-encoded, so `#` or `?` in a file name stays part of the path.
    fn api_url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
        let base = self.repo_api_url();
        let mut url = Url::parse(&base).map_err(|_| ProviderError::InvalidPath(base.clone()))?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::InvalidPath(base.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn blob_url(&self, branch: &str, full_path: &str) -> String {
        format!("{}/{}/blob/{}/{}", self.web_base, self.repo_path, branch, full_path)
    }

    fn avatar_fallback(&self) -> String {
        format!("{}/{}.png", self.web_base, self.username)
    }

    fn full_path(&self, route_path: &str) -> String {
        match &self.sub_dir {
            Some(dir) => format!("{}/{}", dir, route_path),
            None => route_path.to_string(),
        }
    }

    /// Default branch without the `"main"` fallback. A missing repository
    /// surfaces here first.
    async fn resolve_branch(&self) -> Result<String> {
        let repo: RepoResponse = self.fetch_json(&self.repo_api_url(), ONE_DAY).await?;
        Ok(repo.default_branch)
    }

    async fn fetch_content(&self, full_path: &str, branch: &str) -> Result<FileContent> {
        let mut url = self.api_url(std::iter::once("contents").chain(full_path.split('/')))?;
        url.query_pairs_mut().append_pair("ref", branch);

        let data: ContentResponse = self.fetch_json(url.as_str(), TEN_MINUTES).await?;
        if data.encoding != "base64" {
            return Err(ProviderError::Decode(format!(
                "unsupported encoding {} for {}",
                data.encoding, full_path
            )));
        }

        let cleaned: String = data.content.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = BASE64
            .decode(cleaned)
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        let content = String::from_utf8(bytes)
            .map_err(|_| ProviderError::Decode(format!("{} is not valid UTF-8", full_path)))?;

        Ok(FileContent {
            content,
            sha: data.sha,
        })
    }

    async fn fetch_commit_info(&self, full_path: &str) -> Result<CommitInfo> {
        let mut url = self.api_url(["commits"])?;
        url.query_pairs_mut()
            .append_pair("path", full_path)
            .append_pair("per_page", "1");

        let commits: Vec<CommitResponse> = self.fetch_json(url.as_str(), TEN_MINUTES).await?;
        let Some(last) = commits.into_iter().next() else {
            return Ok(self.synthesized_commit_info());
        };

        Ok(CommitInfo {
            date: last.commit.author.date,
            author_name: last.commit.author.name,
            author_email: last.commit.author.email,
            author_username: last.author.as_ref().map(|a| a.login.clone()),
            author_avatar_url: last.author.and_then(|a| a.avatar_url),
        })
    }

    /// Attribution used when a file has no retrievable commit.
    fn synthesized_commit_info(&self) -> CommitInfo {
        CommitInfo {
            date: Utc::now(),
            author_name: self.username.clone(),
            author_email: None,
            author_username: Some(self.username.clone()),
            author_avatar_url: Some(self.avatar_fallback()),
        }
    }

    async fn list_entry(&self, item: TreeItem, branch: &str, prefix: Option<&str>) -> FileInfo {
        let route_path = prefix
            .and_then(|p| item.path.strip_prefix(p))
            .unwrap_or(&item.path)
            .to_string();
        let url = self.blob_url(branch, &item.path);

        let enriched = tokio::try_join!(
            self.fetch_content(&item.path, branch),
            self.fetch_commit_info(&item.path),
        );

        match enriched {
            Ok((file, commit_info)) => FileInfo {
                path: route_path,
                content: preview(&file.content),
                sha: item.sha,
                url,
                commit_info,
                title: extract_title(&file.content, &item.path),
            },
            Err(e) => {
                tracing::debug!("Using fallback metadata for {}: {}", item.path, e);
                FileInfo {
                    path: route_path,
                    content: String::new(),
                    sha: item.sha,
                    url,
                    commit_info: self.synthesized_commit_info(),
                    title: title_from_path(&item.path),
                }
            }
        }
    }

    async fn fetch_article(&self, route_path: &str) -> Result<FileInfo> {
        let branch = self.resolve_branch().await?;
        let full_path = self.full_path(route_path);

        let (file, commit_info) = tokio::try_join!(
            self.fetch_content(&full_path, &branch),
            self.fetch_commit_info(&full_path),
        )?;

        Ok(FileInfo {
            path: route_path.to_string(),
            title: extract_title(&file.content, &full_path),
            content: file.content,
            sha: file.sha,
            url: self.blob_url(&branch, &full_path),
            commit_info,
        })
    }

    async fn user(&self) -> Option<&GitHubUser> {
        self.user
            .get_or_init(|| async {
                let url = format!("{}/users/{}", self.api_base, self.username);
                match self.fetch_json::<GitHubUser>(&url, ONE_DAY).await {
                    Ok(user) => Some(user),
                    Err(e) => {
                        tracing::debug!("No GitHub profile for {}: {}", self.username, e);
                        None
                    }
                }
            })
            .await
            .as_ref()
    }
}

#[async_trait]
impl DataProvider for GitHubDataProvider {
    async fn get_article_list(&self) -> Result<Vec<FileInfo>> {
        let branch = self.resolve_branch().await?;
        let tree_url = format!("{}/git/trees/{}?recursive=1", self.repo_api_url(), branch);
        let tree: TreeResponse = self.fetch_json(&tree_url, TEN_MINUTES).await?;

        let prefix = self.sub_dir.as_ref().map(|d| format!("{}/", d));
        let files: Vec<TreeItem> = tree
            .tree
            .into_iter()
            .filter(|item| item.kind == "blob" && is_markdown_file(&item.path))
            .filter(|item| prefix.as_deref().is_none_or(|p| item.path.starts_with(p)))
            .collect();

        tracing::info!("Listing {} markdown files from {}", files.len(), self.repo_path);

        let mut articles = join_all(
            files
                .into_iter()
                .map(|item| self.list_entry(item, &branch, prefix.as_deref())),
        )
        .await;

        sort_newest_first(&mut articles);
        Ok(articles)
    }

    async fn get_article(&self, path: &str) -> Result<Option<FileInfo>> {
        let path = path.trim_start_matches('/');
        if !is_markdown_file(path) {
            return Ok(None);
        }

        match self.fetch_article(path).await {
            Ok(article) => Ok(Some(article)),
            Err(e) => {
                tracing::debug!("Article {} unavailable: {}", path, e);
                Ok(None)
            }
        }
    }

    async fn get_source_info(&self) -> Result<SourceInfo> {
        let (user, branch) = tokio::join!(self.user(), self.resolve_branch());
        let branch = branch.unwrap_or_else(|_| FALLBACK_BRANCH.to_string());

        let source_url = match &self.sub_dir {
            Some(dir) => format!("{}/{}/tree/{}/{}", self.web_base, self.repo_path, branch, dir),
            None => format!("{}/{}", self.web_base, self.repo_path),
        };

        let name = user
            .and_then(|u| u.name.clone())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| self.username.clone());
        let bio = user.and_then(|u| u.bio.clone()).filter(|b| !b.is_empty());
        let avatar_url = user
            .and_then(|u| u.avatar_url.clone())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| self.avatar_fallback());

        Ok(SourceInfo {
            name,
            bio,
            avatar_url: Some(avatar_url),
            source_url,
        })
    }

    async fn get_default_branch(&self) -> Result<String> {
        match self.resolve_branch().await {
            Ok(branch) => Ok(branch),
            Err(e) => {
                tracing::warn!("Default branch lookup failed for {}: {}", self.repo_path, e);
                Ok(FALLBACK_BRANCH.to_string())
            }
        }
    }
}
