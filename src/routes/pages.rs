use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use crate::error::AppError;
use crate::metadata::slug_to_article_path;
use crate::models::{
    ArticleViewProps, FileBrowserViewProps, LandingViewProps, NoRepoFoundViewProps, RenderedView,
};
use crate::router::{render_page, ResolveOptions, View, Views};
use crate::routes::SharedState;
use crate::text::is_markdown_file;

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/{*path}", get(content_page))
        .with_state(state)
}

fn json_view<P: Serialize + 'static>(kind: &'static str) -> View<P, Response> {
    Arc::new(move |props: &P| Json(json!({ "type": kind, "props": props })).into_response())
}

/// Views that ship the resolved props to the client as JSON.
pub fn json_views() -> Views<Response> {
    Views {
        landing: json_view::<LandingViewProps>("landing"),
        file_browser: json_view::<FileBrowserViewProps>("file-browser"),
        article: json_view::<ArticleViewProps>("article"),
        no_repo_found: json_view::<NoRepoFoundViewProps>("no-repo-found"),
    }
}

/// Slug of the article a page URL points at. Sitemap, canonical and feed
/// URLs carry no extension, so `posts/hello` maps to `posts/hello.md`;
/// URLs already naming a markdown file are kept as they are.
fn article_slug(slug: Vec<String>) -> Vec<String> {
    match slug.last() {
        Some(last) if !is_markdown_file(last) => match slug_to_article_path(&slug) {
            Some(path) => path.split('/').map(str::to_string).collect(),
            None => slug,
        },
        _ => slug,
    }
}

async fn render(state: &SharedState, headers: &HeaderMap, slug: Vec<String>) -> Result<Response, AppError> {
    let Some(owner) = state.owner(headers)? else {
        let landing = RenderedView::Landing(LandingViewProps::default());
        return render_page(&landing, &state.views).ok_or_else(|| AppError::NotFound("page".to_string()));
    };

    let config = state.config_for(&owner);
    config
        .render(&slug, ResolveOptions::default())
        .await
        .ok_or_else(|| AppError::NotFound(slug.join("/")))
}

async fn index_page(State(state): State<SharedState>, headers: HeaderMap) -> Result<Response, AppError> {
    render(&state, &headers, Vec::new()).await
}

async fn content_page(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(path): Path<String>,
) -> Result<Response, AppError> {
    let slug = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect();
    render(&state, &headers, article_slug(slug)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::create_router;
    use crate::routes::test_support::single_state;
    use crate::test_helpers::{article_at, StubProvider};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn get_json(state: SharedState, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = create_router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn index_renders_file_browser() {
        let state = single_state(StubProvider::new(vec![article_at("hello.md", "2025-01-01T00:00:00Z")]));
        let (status, json) = get_json(state, "/blog").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["type"], "file-browser");
        assert_eq!(json["props"]["articles"][0]["path"], "hello.md");
        assert_eq!(json["props"]["username"], "jamierpond");
    }

    #[tokio::test]
    async fn nested_article_path_renders_article() {
        let state = single_state(StubProvider::new(vec![article_at("posts/hello.md", "2025-01-01T00:00:00Z")]));
        let (status, json) = get_json(state, "/blog/posts/hello.md").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["type"], "article");
        assert_eq!(json["props"]["branch"], "main");
        assert_eq!(json["props"]["article"]["commitInfo"]["authorName"], "Jane Doe");
    }

    #[test]
    fn extensionless_slug_maps_to_markdown_file() {
        let slug = |s: &str| s.split('/').map(str::to_string).collect::<Vec<_>>();

        assert_eq!(article_slug(slug("posts/hello")), slug("posts/hello.md"));
        assert_eq!(article_slug(slug("posts/hello.md")), slug("posts/hello.md"));
        assert_eq!(article_slug(slug("notes.mdx")), slug("notes.mdx"));
        assert!(article_slug(Vec::new()).is_empty());
    }

    #[tokio::test]
    async fn slug_url_renders_article() {
        let state = single_state(StubProvider::new(vec![article_at("posts/hello.md", "2025-01-01T00:00:00Z")]));
        let (status, json) = get_json(state, "/blog/posts/hello").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["type"], "article");
        assert_eq!(json["props"]["article"]["path"], "posts/hello.md");
    }

    #[tokio::test]
    async fn missing_article_is_http_404() {
        let state = single_state(StubProvider::new(Vec::new()));
        let (status, json) = get_json(state, "/blog/nope.md").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json["error"].as_str().unwrap().contains("nope.md"));
    }

    #[tokio::test]
    async fn unreachable_source_renders_no_repo_found() {
        let mut provider = StubProvider::new(Vec::new());
        provider.fail_list = true;
        let (status, json) = get_json(single_state(provider), "/blog").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["type"], "no-repo-found");
    }
}
