//! Sitemap, JSON-LD and RSS derivation from a data provider.
//!
//! Sitemap and JSON-LD generation degrade instead of failing: a provider
//! error yields an empty sitemap or a Blog node without posts.

use chrono::Utc;
use futures::future::join_all;

use crate::error::Result;
use crate::models::{
    BlogJsonLd, BlogPostingJsonLd, ChangeFrequency, FileInfo, PersonJsonLd, RssFeed, RssItem, SitemapEntry,
    WebPageRef, SCHEMA_ORG_CONTEXT,
};
use crate::provider::DataProvider;
use crate::text::{extract_description, slug_for_path};

pub const DEFAULT_BLOG_PATH: &str = "/blog";
const INDEX_PRIORITY: f32 = 0.8;
const ARTICLE_PRIORITY: f32 = 0.6;
const MAX_JSON_LD_POSTS: usize = 10;

#[derive(Debug, Clone, Copy)]
pub struct BlogSitemapOptions<'a> {
    pub base_url: &'a str,
    /// Defaults to `/blog`.
    pub blog_path: Option<&'a str>,
}

#[derive(Debug, Clone, Copy)]
pub struct BlogJsonLdOptions<'a> {
    pub base_url: &'a str,
    pub blog_path: Option<&'a str>,
    pub blog_name: &'a str,
    pub blog_description: &'a str,
    pub author_name: Option<&'a str>,
    pub author_url: Option<&'a str>,
}

#[derive(Debug, Clone, Copy)]
pub struct ArticleJsonLdOptions<'a> {
    pub base_url: &'a str,
    pub blog_path: Option<&'a str>,
    pub author_name: Option<&'a str>,
    pub author_url: Option<&'a str>,
}

#[derive(Debug, Clone, Copy)]
pub struct RssFeedOptions<'a> {
    pub base_url: &'a str,
    /// Defaults to `/blog`. Item links are `base_url + blog_path + "/" + slug`,
    /// the same URLs the sitemap advertises.
    pub blog_path: Option<&'a str>,
}

fn article_url(base_url: &str, blog_path: &str, article: &FileInfo) -> String {
    format!("{}{}/{}", base_url, blog_path, slug_for_path(&article.path))
}

pub async fn generate_blog_sitemap(provider: &dyn DataProvider, options: BlogSitemapOptions<'_>) -> Vec<SitemapEntry> {
    let blog_path = options.blog_path.unwrap_or(DEFAULT_BLOG_PATH);

    let articles = match provider.get_article_list().await {
        Ok(articles) => articles,
        Err(e) => {
            tracing::warn!("Sitemap skipped, article listing failed: {}", e);
            return Vec::new();
        }
    };

    let index_modified = articles.first().map(|a| a.commit_info.date).unwrap_or_else(Utc::now);
    let mut entries = Vec::with_capacity(articles.len() + 1);
    entries.push(SitemapEntry {
        url: format!("{}{}", options.base_url, blog_path),
        last_modified: index_modified,
        change_frequency: Some(ChangeFrequency::Weekly),
        priority: Some(INDEX_PRIORITY),
    });

    entries.extend(articles.iter().map(|article| SitemapEntry {
        url: article_url(options.base_url, blog_path, article),
        last_modified: article.commit_info.date,
        change_frequency: Some(ChangeFrequency::Monthly),
        priority: Some(ARTICLE_PRIORITY),
    }));

    entries
}

pub async fn generate_blog_json_ld(provider: &dyn DataProvider, options: BlogJsonLdOptions<'_>) -> BlogJsonLd {
    let blog_path = options.blog_path.unwrap_or(DEFAULT_BLOG_PATH);

    let author = options
        .author_name
        .filter(|n| !n.is_empty())
        .map(|name| PersonJsonLd::new(name, options.author_url.map(str::to_string)));

    let blog_post = match provider.get_article_list().await {
        Ok(articles) => Some(
            articles
                .iter()
                .take(MAX_JSON_LD_POSTS)
                .map(|article| BlogPostingJsonLd {
                    context: SCHEMA_ORG_CONTEXT.to_string(),
                    kind: "BlogPosting".to_string(),
                    headline: article.title.clone(),
                    description: extract_description(&article.content),
                    url: article_url(options.base_url, blog_path, article),
                    date_published: article.commit_info.date,
                    date_modified: article.commit_info.date,
                    author: None,
                    main_entity_of_page: None,
                })
                .collect(),
        ),
        Err(e) => {
            tracing::warn!("Blog JSON-LD without posts, article listing failed: {}", e);
            None
        }
    };

    BlogJsonLd {
        context: SCHEMA_ORG_CONTEXT.to_string(),
        kind: "Blog".to_string(),
        name: options.blog_name.to_string(),
        description: options.blog_description.to_string(),
        url: format!("{}{}", options.base_url, blog_path),
        author,
        blog_post,
    }
}

pub fn generate_article_json_ld(article: &FileInfo, options: ArticleJsonLdOptions<'_>) -> BlogPostingJsonLd {
    let url = article_url(options.base_url, options.blog_path.unwrap_or(DEFAULT_BLOG_PATH), article);

    let author_name = options
        .author_name
        .filter(|n| !n.is_empty())
        .unwrap_or(&article.commit_info.author_name);
    let author = (!author_name.is_empty())
        .then(|| PersonJsonLd::new(author_name, options.author_url.map(str::to_string)));

    BlogPostingJsonLd {
        context: SCHEMA_ORG_CONTEXT.to_string(),
        kind: "BlogPosting".to_string(),
        headline: article.title.clone(),
        description: extract_description(&article.content),
        url: url.clone(),
        date_published: article.commit_info.date,
        date_modified: article.commit_info.date,
        author,
        main_entity_of_page: Some(WebPageRef {
            kind: "WebPage".to_string(),
            id: url,
        }),
    }
}

fn strip_markup_chars(text: &str) -> String {
    text.chars().filter(|c| !matches!(c, '<' | '>' | '&' | '\'' | '"')).collect()
}

/// RSS feed for a provider's articles.
///
/// Listing and source info are fetched together; each listed article is
/// then re-fetched in full for its description, and articles that cannot be
/// re-fetched are left out. `Ok(None)` when the listing is empty.
pub async fn generate_rss_feed(provider: &dyn DataProvider, options: RssFeedOptions<'_>) -> Result<Option<RssFeed>> {
    let (articles, source_info) = tokio::try_join!(provider.get_article_list(), provider.get_source_info())?;
    if articles.is_empty() {
        return Ok(None);
    }

    let fetched = join_all(articles.iter().map(|a| provider.get_article(&a.path))).await;
    let mut full_articles: Vec<FileInfo> = fetched
        .into_iter()
        .filter_map(|result| match result {
            Ok(article) => article,
            Err(e) => {
                tracing::debug!("Dropping article from feed: {}", e);
                None
            }
        })
        .collect();
    crate::provider::sort_newest_first(&mut full_articles);

    let blog_path = options.blog_path.unwrap_or(DEFAULT_BLOG_PATH);
    let author = source_info.name;
    let items = full_articles
        .iter()
        .map(|article| RssItem {
            title: article.title.clone(),
            link: article_url(options.base_url, blog_path, article),
            description: strip_markup_chars(&extract_description(&article.content)),
            pub_date: article.commit_info.date,
            creator: author.clone(),
        })
        .collect();

    Ok(Some(RssFeed {
        title: format!("{}'s Blog", author),
        link: format!("{}{}", options.base_url, blog_path),
        description: format!("{}'s blog powered by madea.blog", author),
        self_link: format!("{}/rss.xml", options.base_url),
        last_build_date: Utc::now(),
        items,
    }))
}
