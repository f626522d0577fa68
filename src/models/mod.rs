//! Data transfer objects.
//!
//! - `article`: CommitInfo, FileInfo, SourceInfo (provider output)
//! - `view`: view props and the `RenderedView` resolver result
//! - `metadata`: SeoConfig and page Metadata (Open Graph, Twitter card)
//! - `seo`: sitemap entries, JSON-LD nodes, RSS feed

pub mod article;
pub mod metadata;
pub mod seo;
pub mod view;

pub use article::*;
pub use metadata::*;
pub use seo::*;
pub use view::*;
