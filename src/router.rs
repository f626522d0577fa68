//! Path resolution: maps a requested path onto exactly one `RenderedView`.
//!
//! Resolution order:
//! 1. no owner in context → landing, without touching the provider
//! 2. root path (`/` or empty) → list + source info together; both succeed →
//!    file browser, otherwise no-repo-found
//! 3. anything else → article + default branch together; article present and
//!    both succeed → article, otherwise 404
//!
//! Only the root path can produce no-repo-found. An empty listing is still a
//! file browser. Provider errors never escape `resolve_path`.

use std::sync::Arc;

use crate::metadata::{
    generate_article_metadata_from_slug, generate_index_metadata, ArticleMetadataOptions, IndexMetadataOptions,
};
use crate::models::{
    ArticleViewProps, FileBrowserViewProps, LandingViewProps, Metadata, NoRepoFoundViewProps, RenderedView,
    SeoConfig,
};
use crate::provider::DataProvider;

/// A render function bound to one view's props.
pub type View<P, R> = Arc<dyn Fn(&P) -> R + Send + Sync>;

pub struct Views<R> {
    pub landing: View<LandingViewProps, R>,
    pub file_browser: View<FileBrowserViewProps, R>,
    pub article: View<ArticleViewProps, R>,
    pub no_repo_found: View<NoRepoFoundViewProps, R>,
}

impl<R> Clone for Views<R> {
    fn clone(&self) -> Self {
        Self {
            landing: Arc::clone(&self.landing),
            file_browser: Arc::clone(&self.file_browser),
            article: Arc::clone(&self.article),
            no_repo_found: Arc::clone(&self.no_repo_found),
        }
    }
}

pub struct Config<R> {
    pub data_provider: Arc<dyn DataProvider>,
    pub username: String,
    pub views: Views<R>,
    pub seo: Option<SeoConfig>,
    /// Path the content is served under, e.g. `/blog`.
    pub base_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// False when the request carries no owner (e.g. the bare root domain).
    pub has_username: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self { has_username: true }
    }
}

fn is_root(path: &str) -> bool {
    path.is_empty() || path == "/"
}

pub async fn resolve_path(
    provider: &dyn DataProvider,
    username: &str,
    path: &str,
    options: ResolveOptions,
) -> RenderedView {
    if !options.has_username {
        return RenderedView::Landing(LandingViewProps::default());
    }

    if is_root(path) {
        let (articles, source_info) = tokio::join!(provider.get_article_list(), provider.get_source_info());
        return match (articles, source_info) {
            (Ok(articles), Ok(source_info)) => RenderedView::FileBrowser(FileBrowserViewProps {
                articles,
                source_info,
                username: username.to_string(),
            }),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!("No repository for {}: {}", username, e);
                RenderedView::NoRepoFound(NoRepoFoundViewProps {
                    username: username.to_string(),
                })
            }
        };
    }

    let (article, branch) = tokio::join!(provider.get_article(path), provider.get_default_branch());
    match (article, branch) {
        (Ok(Some(article)), Ok(branch)) => RenderedView::Article(ArticleViewProps {
            article,
            username: username.to_string(),
            branch,
        }),
        (Ok(None), Ok(_)) => RenderedView::NotFound,
        (Err(e), _) | (_, Err(e)) => {
            tracing::debug!("Resolving {} failed: {}", path, e);
            RenderedView::NotFound
        }
    }
}

/// Hand a resolved view to its render function. `None` for 404.
pub fn render_page<R>(view: &RenderedView, views: &Views<R>) -> Option<R> {
    match view {
        RenderedView::Landing(props) => Some((views.landing)(props)),
        RenderedView::FileBrowser(props) => Some((views.file_browser)(props)),
        RenderedView::Article(props) => Some((views.article)(props)),
        RenderedView::NoRepoFound(props) => Some((views.no_repo_found)(props)),
        RenderedView::NotFound => None,
    }
}

/// Catch-all route segments to a resolvable path; no segments is the root.
pub fn path_from_slug(slug: &[String]) -> String {
    let path = slug.join("/");
    if path.is_empty() { "/".to_string() } else { path }
}

/// Route segments for every listed article, for pre-rendering.
/// Empty when the provider cannot list.
pub async fn static_params(provider: &dyn DataProvider) -> Vec<Vec<String>> {
    match provider.get_article_list().await {
        Ok(articles) => articles
            .iter()
            .map(|a| a.path.split('/').map(str::to_string).collect())
            .collect(),
        Err(e) => {
            tracing::warn!("No static params, article listing failed: {}", e);
            Vec::new()
        }
    }
}

impl<R> Config<R> {
    pub async fn resolve(&self, path: &str, options: ResolveOptions) -> RenderedView {
        resolve_path(self.data_provider.as_ref(), &self.username, path, options).await
    }

    /// Resolve and render in one step. `None` means not found.
    pub async fn render(&self, slug: &[String], options: ResolveOptions) -> Option<R> {
        let view = self.resolve(&path_from_slug(slug), options).await;
        render_page(&view, &self.views)
    }

    fn base_path(&self) -> &str {
        self.base_path.as_deref().unwrap_or("")
    }

    /// Listing-page metadata. `None` without SEO settings.
    pub fn metadata_for_index(&self, title: &str, description: &str) -> Option<Metadata> {
        let seo = self.seo.as_ref()?;
        Some(generate_index_metadata(IndexMetadataOptions {
            seo,
            path: self.base_path(),
            title,
            description,
        }))
    }

    /// Article-page metadata for a route slug. `None` without SEO settings,
    /// when the article is absent, or when the provider fails.
    pub async fn metadata_for_article(&self, slug: &[String]) -> Option<Metadata> {
        let seo = self.seo.as_ref()?;
        let options = ArticleMetadataOptions {
            seo,
            path: self.base_path(),
        };
        match generate_article_metadata_from_slug(self.data_provider.as_ref(), slug, options).await {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::debug!("No article metadata for {:?}: {}", slug, e);
                None
            }
        }
    }
}
