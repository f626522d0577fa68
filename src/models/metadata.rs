//! Page metadata DTOs.
//!
//! - `SeoConfig`: site-level constants used to derive per-page metadata
//! - `Metadata`: title, description, Open Graph, Twitter card, canonical link
//!
//! Field names are camelCase on the wire to match what page-metadata
//! consumers expect (`openGraph`, `siteName`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoConfig {
    pub base_url: String,
    pub site_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub title: String,
    pub description: String,
    pub open_graph: OpenGraph,
    pub twitter: TwitterCard,
    pub alternates: Alternates,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenGraphType {
    Website,
    Article,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenGraph {
    pub title: String,
    pub description: String,
    pub url: String,
    pub site_name: String,
    #[serde(rename = "type")]
    pub kind: OpenGraphType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<OpenGraphImage>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenGraphImage {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TwitterCardType {
    Summary,
    SummaryLargeImage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TwitterCard {
    pub card: TwitterCardType,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alternates {
    pub canonical: String,
}
