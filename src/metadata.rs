//! Page metadata for index and article pages.
//!
//! Canonical URLs are built by plain concatenation: index pages use
//! `base_url + path`, articles use `base_url + path + "/" + slug` where the
//! slug is the article path without its `.md` extension.

use crate::error::Result;
use crate::models::{
    Alternates, FileInfo, Metadata, OpenGraph, OpenGraphImage, OpenGraphType, SeoConfig, TwitterCard,
    TwitterCardType,
};
use crate::provider::DataProvider;
use crate::text::{extract_description, slug_for_path};

#[derive(Debug, Clone)]
pub struct IndexMetadataOptions<'a> {
    pub seo: &'a SeoConfig,
    /// Listing path, e.g. `/blog`.
    pub path: &'a str,
    pub title: &'a str,
    pub description: &'a str,
}

#[derive(Debug, Clone, Copy)]
pub struct ArticleMetadataOptions<'a> {
    pub seo: &'a SeoConfig,
    /// Base path articles live under, e.g. `/blog`.
    pub path: &'a str,
}

fn attach_default_image(metadata: &mut Metadata, seo: &SeoConfig) {
    if let Some(image) = &seo.default_image {
        metadata.open_graph.images = Some(vec![OpenGraphImage {
            url: image.clone(),
            width: None,
            height: None,
            alt: None,
        }]);
        metadata.twitter.images = Some(vec![image.clone()]);
    }
}

pub fn generate_index_metadata(options: IndexMetadataOptions<'_>) -> Metadata {
    let IndexMetadataOptions {
        seo,
        path,
        title,
        description,
    } = options;
    let url = format!("{}{}", seo.base_url, path);

    let mut metadata = Metadata {
        title: title.to_string(),
        description: description.to_string(),
        open_graph: OpenGraph {
            title: title.to_string(),
            description: description.to_string(),
            url: url.clone(),
            site_name: seo.site_name.clone(),
            kind: OpenGraphType::Website,
            published_time: None,
            modified_time: None,
            authors: None,
            images: None,
        },
        twitter: TwitterCard {
            card: TwitterCardType::SummaryLargeImage,
            title: title.to_string(),
            description: description.to_string(),
            site: seo.twitter_handle.clone(),
            creator: None,
            images: None,
        },
        alternates: Alternates { canonical: url },
    };

    attach_default_image(&mut metadata, seo);
    metadata
}

pub fn generate_article_metadata(article: &FileInfo, options: ArticleMetadataOptions<'_>) -> Metadata {
    let ArticleMetadataOptions { seo, path } = options;
    let url = format!("{}{}/{}", seo.base_url, path, slug_for_path(&article.path));

    let extracted = extract_description(&article.content);
    let description = if !extracted.is_empty() {
        extracted
    } else {
        seo.default_description.clone().unwrap_or_default()
    };

    let author_name = seo
        .author_name
        .clone()
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| article.commit_info.author_name.clone());
    let authors = (!author_name.is_empty()).then(|| vec![author_name]);

    let date = article.commit_info.date;
    let mut metadata = Metadata {
        title: format!("{} | {}", article.title, seo.site_name),
        description: description.clone(),
        open_graph: OpenGraph {
            title: article.title.clone(),
            description: description.clone(),
            url: url.clone(),
            site_name: seo.site_name.clone(),
            kind: OpenGraphType::Article,
            published_time: Some(date),
            modified_time: Some(date),
            authors,
            images: None,
        },
        twitter: TwitterCard {
            card: TwitterCardType::SummaryLargeImage,
            title: article.title.clone(),
            description,
            site: seo.twitter_handle.clone(),
            creator: None,
            images: None,
        },
        alternates: Alternates { canonical: url },
    };

    attach_default_image(&mut metadata, seo);
    metadata
}

/// Route slug to article path: segments joined with `/`, `.md` appended to
/// the last one. Articles stored as `.mdx` are never produced here.
pub fn slug_to_article_path(slug: &[String]) -> Option<String> {
    if slug.is_empty() {
        return None;
    }
    Some(format!("{}.md", slug.join("/")))
}

/// Fetch the article for a route slug and build its metadata.
/// `Ok(None)` when the slug is empty or no such article exists.
pub async fn generate_article_metadata_from_slug(
    provider: &dyn DataProvider,
    slug: &[String],
    options: ArticleMetadataOptions<'_>,
) -> Result<Option<Metadata>> {
    let Some(path) = slug_to_article_path(slug) else {
        return Ok(None);
    };

    let article = provider.get_article(&path).await?;
    Ok(article.map(|article| generate_article_metadata(&article, options)))
}
