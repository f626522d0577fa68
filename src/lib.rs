//! Content resolution for markdown blogs backed by a git repository.
//!
//! A `DataProvider` supplies articles from GitHub or a local directory, the
//! router turns a requested path into one `RenderedView`, and the metadata
//! and SEO modules derive page metadata, sitemaps, JSON-LD and RSS from the
//! same provider.

pub mod error;
pub mod git;
pub mod metadata;
pub mod models;
pub mod provider;
pub mod router;
pub mod routes;
pub mod seo;
pub mod text;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use error::{AppError, ConfigError, ProviderError};
pub use models::{FileInfo, RenderedView, SeoConfig, SourceInfo};
pub use provider::{DataProvider, GitHubDataProvider, GitHubOptions, LocalFsDataProvider, LocalFsOptions};
pub use router::{render_page, resolve_path, Config, ResolveOptions, Views};
