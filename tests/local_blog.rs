//! A local git-backed content directory served through the router, the
//! metadata helpers and the feed generators.

use std::sync::Arc;

use madea_blog::metadata::{generate_article_metadata_from_slug, ArticleMetadataOptions};
use madea_blog::models::{ArticleViewProps, FileBrowserViewProps, LandingViewProps, NoRepoFoundViewProps};
use madea_blog::router::View;
use madea_blog::seo::{generate_blog_sitemap, generate_rss_feed, BlogSitemapOptions, RssFeedOptions};
use madea_blog::{
    Config, DataProvider, LocalFsDataProvider, LocalFsOptions, RenderedView, ResolveOptions, SeoConfig, Views,
};
use tempfile::TempDir;

#[path = "support/git_repo.rs"]
mod git_repo;

use git_repo::{commit_files, init_repo};

fn blog() -> (TempDir, LocalFsDataProvider) {
    let tmp = TempDir::new().unwrap();
    let repo = init_repo(tmp.path(), "main");

    commit_files(
        &repo,
        &[("blog/first-post.md", "# First Post\n\nThe very first thing I wrote, kept short.")],
        "first post",
        1_700_000_000,
    );
    commit_files(
        &repo,
        &[("blog/notes/second.md", "# Second\n\nA follow-up with <html> & quotes.")],
        "second post",
        1_710_000_000,
    );

    let provider = LocalFsDataProvider::new(
        LocalFsOptions::new(tmp.path().join("blog")).with_author_name(Some("Jamie".to_string())),
    )
    .unwrap();
    (tmp, provider)
}

fn kind_view<P: 'static>(kind: &'static str) -> View<P, String> {
    Arc::new(move |_: &P| kind.to_string())
}

fn config(provider: LocalFsDataProvider) -> Config<String> {
    Config {
        data_provider: Arc::new(provider),
        username: "jamie".to_string(),
        views: Views {
            landing: kind_view::<LandingViewProps>("landing"),
            file_browser: kind_view::<FileBrowserViewProps>("file-browser"),
            article: kind_view::<ArticleViewProps>("article"),
            no_repo_found: kind_view::<NoRepoFoundViewProps>("no-repo-found"),
        },
        seo: Some(SeoConfig {
            base_url: "https://jamie.madea.blog".to_string(),
            site_name: "Jamie".to_string(),
            ..SeoConfig::default()
        }),
        base_path: Some("/blog".to_string()),
    }
}

#[tokio::test]
async fn resolves_every_listed_article() {
    let (_tmp, provider) = blog();
    let config = config(provider);

    let RenderedView::FileBrowser(browser) = config.resolve("/", ResolveOptions::default()).await else {
        panic!("expected the file browser");
    };
    let paths: Vec<&str> = browser.articles.iter().map(|a| a.path.as_str()).collect();
    assert_eq!(paths, vec!["notes/second.md", "first-post.md"]);
    assert_eq!(browser.source_info.name, "Jamie");

    for listed in &browser.articles {
        match config.resolve(&listed.path, ResolveOptions::default()).await {
            RenderedView::Article(props) => {
                assert_eq!(props.branch, "main");
                assert_eq!(props.article.commit_info.author_name, "Jamie Pond");
                assert!(!props.article.title.is_empty());
            }
            other => panic!("{} resolved to {}", listed.path, other.kind()),
        }
    }

    assert_eq!(config.resolve("../escape.md", ResolveOptions::default()).await.kind(), "404");
}

#[tokio::test]
async fn missing_directory_is_no_repo_found() {
    let tmp = TempDir::new().unwrap();
    let provider = LocalFsDataProvider::new(LocalFsOptions::new(tmp.path().join("missing"))).unwrap();
    let config = config(provider);

    assert_eq!(config.render(&[], ResolveOptions::default()).await.as_deref(), Some("no-repo-found"));
}

#[tokio::test]
async fn metadata_and_feeds_follow_the_listing() {
    let (_tmp, provider) = blog();
    let seo = SeoConfig {
        base_url: "https://jamie.madea.blog".to_string(),
        site_name: "Jamie".to_string(),
        ..SeoConfig::default()
    };

    let slug = vec!["notes".to_string(), "second".to_string()];
    let metadata = generate_article_metadata_from_slug(&provider, &slug, ArticleMetadataOptions { seo: &seo, path: "/blog" })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(metadata.title, "Second | Jamie");
    assert_eq!(metadata.alternates.canonical, "https://jamie.madea.blog/blog/notes/second");
    assert_eq!(metadata.open_graph.published_time.unwrap().timestamp(), 1_710_000_000);

    let sitemap = generate_blog_sitemap(
        &provider,
        BlogSitemapOptions {
            base_url: &seo.base_url,
            blog_path: None,
        },
    )
    .await;
    let urls: Vec<&str> = sitemap.iter().map(|e| e.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://jamie.madea.blog/blog",
            "https://jamie.madea.blog/blog/notes/second",
            "https://jamie.madea.blog/blog/first-post",
        ]
    );

    let options = RssFeedOptions {
        base_url: &seo.base_url,
        blog_path: None,
    };
    let feed = generate_rss_feed(&provider, options).await.unwrap().unwrap();
    assert_eq!(feed.title, "Jamie's Blog");
    let links: Vec<&str> = feed.items.iter().map(|i| i.link.as_str()).collect();
    assert_eq!(links, &urls[1..]);
    assert_eq!(feed.items[0].description, "A follow-up with html  quotes.");

    let branch = provider.get_default_branch().await.unwrap();
    assert_eq!(branch, "main");
}
