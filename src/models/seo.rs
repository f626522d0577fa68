//! Sitemap, JSON-LD and RSS DTOs.
//!
//! These are plain data; XML serialization of sitemaps and feeds happens in
//! the host's feed routes.

use chrono::{DateTime, Utc};
use serde::Serialize;

pub const SCHEMA_ORG_CONTEXT: &str = "https://schema.org";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeFrequency {
    Always,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Never,
}

impl ChangeFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeFrequency::Always => "always",
            ChangeFrequency::Hourly => "hourly",
            ChangeFrequency::Daily => "daily",
            ChangeFrequency::Weekly => "weekly",
            ChangeFrequency::Monthly => "monthly",
            ChangeFrequency::Yearly => "yearly",
            ChangeFrequency::Never => "never",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SitemapEntry {
    pub url: String,
    pub last_modified: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_frequency: Option<ChangeFrequency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonJsonLd {
    #[serde(rename = "@type")]
    pub kind: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl PersonJsonLd {
    pub fn new(name: impl Into<String>, url: Option<String>) -> Self {
        Self {
            kind: "Person".to_string(),
            name: name.into(),
            url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebPageRef {
    #[serde(rename = "@type")]
    pub kind: String,
    #[serde(rename = "@id")]
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPostingJsonLd {
    #[serde(rename = "@context")]
    pub context: String,
    #[serde(rename = "@type")]
    pub kind: String,
    pub headline: String,
    pub description: String,
    pub url: String,
    pub date_published: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<PersonJsonLd>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_entity_of_page: Option<WebPageRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogJsonLd {
    #[serde(rename = "@context")]
    pub context: String,
    #[serde(rename = "@type")]
    pub kind: String,
    pub name: String,
    pub description: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<PersonJsonLd>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blog_post: Option<Vec<BlogPostingJsonLd>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RssFeed {
    pub title: String,
    pub link: String,
    pub description: String,
    pub self_link: String,
    pub last_build_date: DateTime<Utc>,
    pub items: Vec<RssItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RssItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub pub_date: DateTime<Utc>,
    pub creator: String,
}
