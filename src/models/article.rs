//! Content entity DTOs shared by every data provider.
//!
//! - `CommitInfo`: attribution for the last change to a content item
//! - `FileInfo`: a normalized markdown article (full or preview content)
//! - `SourceInfo`: owner metadata shown on the file browser

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitInfo {
    pub date: DateTime<Utc>,
    pub author_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,
    /// Identity on the hosting platform; never set for local content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    /// Routing key, relative to the provider's content root.
    pub path: String,
    /// Raw markdown. Truncated to a preview when part of a listing.
    pub content: String,
    pub sha: String,
    pub url: String,
    pub commit_info: CommitInfo,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub source_url: String,
}
