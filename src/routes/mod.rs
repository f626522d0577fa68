//! HTTP route handlers for the blog host.
//!
//! Each submodule defines routes for a feature area:
//! - `pages`: resolved pages (GET {base_path}, GET {base_path}/{*path})
//! - `feeds`: sitemap and RSS (GET /sitemap.xml, GET /rss.xml)
//! - `api`: page metadata and JSON-LD (GET /api/v1/metadata, GET /api/v1/jsonld)
//!
//! Every handler first resolves the owner of the request. In subdomain mode
//! the owner is the first label of the `Host` header and providers are built
//! on first use, then reused for `SUBDOMAIN_PROVIDER_TTL`. At most
//! `MAX_SUBDOMAIN_PROVIDERS` are kept, so arbitrary hosts cannot grow the
//! registry.

pub mod api;
pub mod feeds;
pub mod pages;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderMap};
use axum::response::Response;
use axum::Router;

use crate::error::{AppError, ConfigError};
use crate::models::SeoConfig;
use crate::provider::cache::TtlCache;
use crate::provider::DataProvider;
use crate::router::{Config, Views};

pub const MAX_SUBDOMAIN_PROVIDERS: usize = 256;
pub const SUBDOMAIN_PROVIDER_TTL: Duration = Duration::from_secs(10 * 60);

pub type ProviderFactory =
    Box<dyn Fn(&str) -> std::result::Result<Arc<dyn DataProvider>, ConfigError> + Send + Sync>;

/// Where a request's owner and provider come from.
pub enum Owners {
    /// Every request is served for one owner.
    Single {
        username: String,
        provider: Arc<dyn DataProvider>,
    },
    /// Owner taken from the subdomain.
    Subdomain {
        factory: ProviderFactory,
        providers: TtlCache<Arc<dyn DataProvider>>,
    },
}

impl Owners {
    pub fn single(username: impl Into<String>, provider: Arc<dyn DataProvider>) -> Self {
        Owners::Single {
            username: username.into(),
            provider,
        }
    }

    pub fn subdomain(factory: ProviderFactory) -> Self {
        Owners::Subdomain {
            factory,
            providers: TtlCache::with_capacity(MAX_SUBDOMAIN_PROVIDERS),
        }
    }
}

pub struct Site {
    pub seo: SeoConfig,
    pub description: String,
    /// Path pages are served under; empty serves them at the root.
    pub base_path: String,
}

pub struct AppState {
    pub owners: Owners,
    pub site: Site,
    pub views: Views<Response>,
}

pub type SharedState = Arc<AppState>;

/// The resolved owner of one request.
pub struct Owner {
    pub username: String,
    pub provider: Arc<dyn DataProvider>,
    /// Public root of this owner's site.
    pub base_url: String,
}

/// Username from a `Host` header value: port stripped, then the first label
/// when there are at least three. `www` is not a username.
pub fn username_from_host(host: &str) -> Option<String> {
    let hostname = host.split(':').next().unwrap_or("");
    let labels: Vec<&str> = hostname.split('.').collect();
    if labels.len() < 3 {
        return None;
    }

    match labels[0] {
        "" | "www" => None,
        username => Some(username.to_string()),
    }
}

impl AppState {
    pub fn owner(&self, headers: &HeaderMap) -> Result<Option<Owner>, AppError> {
        match &self.owners {
            Owners::Single { username, provider } => Ok(Some(Owner {
                username: username.clone(),
                provider: Arc::clone(provider),
                base_url: self.site.seo.base_url.clone(),
            })),
            Owners::Subdomain { factory, providers } => {
                let Some(host) = headers.get(header::HOST).and_then(|h| h.to_str().ok()) else {
                    return Ok(None);
                };
                let Some(username) = username_from_host(host) else {
                    return Ok(None);
                };

                let provider = match providers.get(&username) {
                    Some(provider) => provider,
                    None => {
                        let provider = factory(&username).map_err(|e| AppError::Internal(e.to_string()))?;
                        tracing::info!("Created provider for {}", username);
                        providers.insert(username.clone(), Arc::clone(&provider), SUBDOMAIN_PROVIDER_TTL);
                        provider
                    }
                };

                let hostname = host.split(':').next().unwrap_or(host);
                Ok(Some(Owner {
                    username,
                    provider,
                    base_url: format!("https://{}", hostname),
                }))
            }
        }
    }

    /// Router config for one owner, with the site's SEO settings rebased
    /// onto the owner's site.
    pub fn config_for(&self, owner: &Owner) -> Config<Response> {
        Config {
            data_provider: Arc::clone(&owner.provider),
            username: owner.username.clone(),
            views: self.views.clone(),
            seo: Some(SeoConfig {
                base_url: owner.base_url.clone(),
                ..self.site.seo.clone()
            }),
            base_path: Some(self.site.base_path.clone()),
        }
    }
}

pub fn create_router(state: SharedState) -> Router {
    let base_path = state.site.base_path.trim_end_matches('/').to_string();
    let pages = pages::routes(state.clone());

    let router = if base_path.is_empty() {
        Router::new().merge(pages)
    } else {
        Router::new().nest(&base_path, pages)
    };

    router.merge(feeds::routes(state.clone())).merge(api::routes(state))
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::StubProvider;

    #[test]
    fn username_requires_three_labels() {
        assert_eq!(username_from_host("jamie.madea.blog"), Some("jamie".to_string()));
        assert_eq!(username_from_host("jamie.localtest.me:3000"), Some("jamie".to_string()));
        assert_eq!(username_from_host("madea.blog"), None);
        assert_eq!(username_from_host("localhost:3001"), None);
        assert_eq!(username_from_host("www.madea.blog"), None);
        assert_eq!(username_from_host(""), None);
    }

    fn headers_for(host: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, host.parse().unwrap());
        headers
    }

    #[test]
    fn subdomain_providers_are_reused() {
        let state = AppState {
            owners: Owners::subdomain(Box::new(
                |_username: &str| -> Result<Arc<dyn DataProvider>, ConfigError> {
                    Ok(Arc::new(StubProvider::new(Vec::new())))
                },
            )),
            site: test_support::site(),
            views: pages::json_views(),
        };

        let first = state.owner(&headers_for("jamie.madea.blog")).unwrap().unwrap();
        let second = state.owner(&headers_for("jamie.madea.blog:443")).unwrap().unwrap();
        assert_eq!(first.username, "jamie");
        assert_eq!(first.base_url, "https://jamie.madea.blog");
        assert!(Arc::ptr_eq(&first.provider, &second.provider));

        assert!(state.owner(&headers_for("madea.blog")).unwrap().is_none());
        assert!(state.owner(&HeaderMap::new()).unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn subdomain_registry_is_bounded() {
        let state = AppState {
            owners: Owners::subdomain(Box::new(
                |_username: &str| -> Result<Arc<dyn DataProvider>, ConfigError> {
                    Ok(Arc::new(StubProvider::new(Vec::new())))
                },
            )),
            site: test_support::site(),
            views: pages::json_views(),
        };
        let Owners::Subdomain { providers, .. } = &state.owners else {
            panic!("expected subdomain owners");
        };

        for i in 0..MAX_SUBDOMAIN_PROVIDERS * 4 {
            let host = format!("bot{}.madea.blog", i);
            assert!(state.owner(&headers_for(&host)).unwrap().is_some());
        }
        assert_eq!(providers.stats().entries, MAX_SUBDOMAIN_PROVIDERS);

        // providers expire and are rebuilt on the next request
        let first = state.owner(&headers_for("jamie.madea.blog")).unwrap().unwrap();
        tokio::time::advance(SUBDOMAIN_PROVIDER_TTL + Duration::from_secs(1)).await;
        let second = state.owner(&headers_for("jamie.madea.blog")).unwrap().unwrap();
        assert!(!Arc::ptr_eq(&first.provider, &second.provider));
        assert!(providers.stats().entries <= MAX_SUBDOMAIN_PROVIDERS);
    }

    #[test]
    fn single_owner_ignores_host() {
        let state = test_support::single_state(StubProvider::new(Vec::new()));
        let owner = state.owner(&headers_for("madea.blog")).unwrap().unwrap();
        assert_eq!(owner.username, "jamierpond");
        assert_eq!(owner.base_url, "https://pond.audio");
    }
}
