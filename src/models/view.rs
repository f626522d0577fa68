//! View props handed to the bound render functions, and the resolver result.
//!
//! `RenderedView` serializes as `{"type": "...", "props": {...}}` so a host
//! can ship it to a client unchanged.

use serde::Serialize;

use super::{FileInfo, SourceInfo};

#[derive(Debug, Clone, Serialize)]
pub struct ArticleViewProps {
    pub article: FileInfo,
    pub username: String,
    pub branch: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileBrowserViewProps {
    pub articles: Vec<FileInfo>,
    pub source_info: SourceInfo,
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NoRepoFoundViewProps {
    pub username: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LandingViewProps {}

/// The single outcome of resolving a path.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "props")]
pub enum RenderedView {
    #[serde(rename = "landing")]
    Landing(LandingViewProps),
    #[serde(rename = "file-browser")]
    FileBrowser(FileBrowserViewProps),
    #[serde(rename = "article")]
    Article(ArticleViewProps),
    #[serde(rename = "no-repo-found")]
    NoRepoFound(NoRepoFoundViewProps),
    #[serde(rename = "404")]
    NotFound,
}

impl RenderedView {
    pub fn kind(&self) -> &'static str {
        match self {
            RenderedView::Landing(_) => "landing",
            RenderedView::FileBrowser(_) => "file-browser",
            RenderedView::Article(_) => "article",
            RenderedView::NoRepoFound(_) => "no-repo-found",
            RenderedView::NotFound => "404",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let view = RenderedView::NoRepoFound(NoRepoFoundViewProps {
            username: "jamierpond".to_string(),
        });
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["type"], "no-repo-found");
        assert_eq!(json["props"]["username"], "jamierpond");

        let json = serde_json::to_value(RenderedView::NotFound).unwrap();
        assert_eq!(json["type"], "404");
        assert_eq!(RenderedView::NotFound.kind(), "404");
    }
}
