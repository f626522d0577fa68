use axum::{
    extract::{Query, State},
    http::HeaderMap,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::metadata::slug_to_article_path;
use crate::models::{BlogJsonLd, BlogPostingJsonLd, Metadata};
use crate::routes::{Owner, SharedState};
use crate::seo::{generate_article_json_ld, generate_blog_json_ld, ArticleJsonLdOptions, BlogJsonLdOptions};

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/api/v1/metadata", get(get_metadata))
        .route("/api/v1/jsonld", get(get_json_ld))
        .with_state(state)
}

/// `path` is a route slug (`posts/hello`, no extension); empty means the index.
#[derive(Debug, Deserialize)]
struct PageQuery {
    #[serde(default)]
    path: String,
}

impl PageQuery {
    fn slug(&self) -> Vec<String> {
        self.path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum JsonLd {
    Blog(BlogJsonLd),
    Article(BlogPostingJsonLd),
}

fn require_owner(state: &SharedState, headers: &HeaderMap) -> Result<Owner, AppError> {
    state
        .owner(headers)?
        .ok_or_else(|| AppError::NotFound("blog owner".to_string()))
}

async fn get_metadata(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Result<Json<Metadata>, AppError> {
    let owner = require_owner(&state, &headers)?;
    let config = state.config_for(&owner);
    let slug = query.slug();

    let metadata = if slug.is_empty() {
        config.metadata_for_index(&state.site.seo.site_name, &state.site.description)
    } else {
        config.metadata_for_article(&slug).await
    };

    metadata.map(Json).ok_or_else(|| AppError::NotFound(query.path.clone()))
}

async fn get_json_ld(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Result<Json<JsonLd>, AppError> {
    let owner = require_owner(&state, &headers)?;
    let seo = &state.site.seo;

    let Some(path) = slug_to_article_path(&query.slug()) else {
        let blog = generate_blog_json_ld(
            owner.provider.as_ref(),
            BlogJsonLdOptions {
                base_url: &owner.base_url,
                blog_path: Some(state.site.base_path.as_str()),
                blog_name: &seo.site_name,
                blog_description: &state.site.description,
                author_name: seo.author_name.as_deref(),
                author_url: seo.author_url.as_deref(),
            },
        )
        .await;
        return Ok(Json(JsonLd::Blog(blog)));
    };

    let article = owner
        .provider
        .get_article(&path)
        .await?
        .ok_or_else(|| AppError::NotFound(path.clone()))?;

    Ok(Json(JsonLd::Article(generate_article_json_ld(
        &article,
        ArticleJsonLdOptions {
            base_url: &owner.base_url,
            blog_path: Some(state.site.base_path.as_str()),
            author_name: seo.author_name.as_deref(),
            author_url: seo.author_url.as_deref(),
        },
    ))))
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

    fn provider() -> StubProvider {
        StubProvider::new(vec![article_at("posts/hello.md", "2025-01-01T00:00:00Z")])
    }

    #[tokio::test]
    async fn index_metadata_uses_site_settings() {
        let (status, json) = get_json(single_state(provider()), "/api/v1/metadata").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["title"], "Jamie Pond");
        assert_eq!(json["description"], "Posts about audio");
        assert_eq!(json["alternates"]["canonical"], "https://pond.audio/blog");
        assert_eq!(json["openGraph"]["type"], "website");
    }

    #[tokio::test]
    async fn article_metadata_by_slug() {
        let (status, json) = get_json(single_state(provider()), "/api/v1/metadata?path=posts/hello").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["openGraph"]["type"], "article");
        assert_eq!(json["alternates"]["canonical"], "https://pond.audio/blog/posts/hello");

        let (status, _) = get_json(single_state(provider()), "/api/v1/metadata?path=posts/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn json_ld_for_index_and_article() {
        let (status, json) = get_json(single_state(provider()), "/api/v1/jsonld").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["@type"], "Blog");
        assert_eq!(json["blogPost"][0]["headline"], "posts/hello");

        let (status, json) = get_json(single_state(provider()), "/api/v1/jsonld?path=posts/hello").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["@type"], "BlogPosting");
        assert_eq!(json["mainEntityOfPage"]["@id"], "https://pond.audio/blog/posts/hello");
    }

    #[tokio::test]
    async fn json_ld_provider_failure_is_500() {
        let mut failing = provider();
        failing.fail_article = true;
        let (status, json) = get_json(single_state(failing), "/api/v1/jsonld?path=posts/hello").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"].is_string());
    }
}
