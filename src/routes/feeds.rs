use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::Utc;

use crate::error::AppError;
use crate::models::{ChangeFrequency, RssFeed, SitemapEntry};
use crate::routes::SharedState;
use crate::seo::{generate_blog_sitemap, generate_rss_feed, BlogSitemapOptions, RssFeedOptions};

const XML_CONTENT_TYPE: &str = "application/xml";
const FEED_CACHE_CONTROL: &str = "public, max-age=3600, s-maxage=3600";

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/sitemap.xml", get(sitemap))
        .route("/rss.xml", get(rss))
        .with_state(state)
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// CDATA section; a literal `]]>` is split across two sections.
fn cdata(text: &str) -> String {
    format!("<![CDATA[{}]]>", text.replace("]]>", "]]]]><![CDATA[>"))
}

pub fn sitemap_xml(entries: &[SitemapEntry]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for entry in entries {
        xml.push_str("  <url>\n");
        xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&entry.url)));
        xml.push_str(&format!("    <lastmod>{}</lastmod>\n", entry.last_modified.to_rfc3339()));
        if let Some(frequency) = entry.change_frequency {
            xml.push_str(&format!("    <changefreq>{}</changefreq>\n", frequency.as_str()));
        }
        if let Some(priority) = entry.priority {
            xml.push_str(&format!("    <priority>{:.1}</priority>\n", priority));
        }
        xml.push_str("  </url>\n");
    }
    xml.push_str("</urlset>\n");
    xml
}

pub fn rss_xml(feed: &RssFeed) -> String {
    let mut xml = String::from(concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
        "<rss version=\"2.0\" xmlns:atom=\"http://www.w3.org/2005/Atom\" ",
        "xmlns:content=\"http://purl.org/rss/1.0/modules/content/\" ",
        "xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\n",
        "  <channel>\n",
    ));
    xml.push_str(&format!("    <title>{}</title>\n", escape_xml(&feed.title)));
    xml.push_str(&format!("    <link>{}</link>\n", escape_xml(&feed.link)));
    xml.push_str(&format!("    <description>{}</description>\n", escape_xml(&feed.description)));
    xml.push_str("    <language>en-US</language>\n");
    xml.push_str(&format!("    <lastBuildDate>{}</lastBuildDate>\n", feed.last_build_date.to_rfc2822()));
    xml.push_str(&format!(
        "    <atom:link href=\"{}\" rel=\"self\" type=\"application/rss+xml\"/>\n",
        escape_xml(&feed.self_link)
    ));
    xml.push_str("    <generator>madea.blog</generator>\n");

    for item in &feed.items {
        let link = escape_xml(&item.link);
        xml.push_str("    <item>\n");
        xml.push_str(&format!("      <title>{}</title>\n", cdata(&item.title)));
        xml.push_str(&format!("      <link>{}</link>\n", link));
        xml.push_str(&format!("      <guid isPermaLink=\"true\">{}</guid>\n", link));
        xml.push_str(&format!("      <description>{}</description>\n", cdata(&item.description)));
        xml.push_str(&format!("      <pubDate>{}</pubDate>\n", item.pub_date.to_rfc2822()));
        xml.push_str(&format!("      <dc:creator>{}</dc:creator>\n", cdata(&item.creator)));
        xml.push_str("    </item>\n");
    }

    xml.push_str("  </channel>\n</rss>\n");
    xml
}

fn xml_response(body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, XML_CONTENT_TYPE),
            (header::CACHE_CONTROL, FEED_CACHE_CONTROL),
        ],
        body,
    )
        .into_response()
}

async fn sitemap(State(state): State<SharedState>, headers: HeaderMap) -> Result<Response, AppError> {
    let entries = match state.owner(&headers)? {
        Some(owner) => {
            generate_blog_sitemap(
                owner.provider.as_ref(),
                BlogSitemapOptions {
                    base_url: &owner.base_url,
                    blog_path: Some(state.site.base_path.as_str()),
                },
            )
            .await
        }
        None => vec![SitemapEntry {
            url: format!("{}{}", state.site.seo.base_url, state.site.base_path),
            last_modified: Utc::now(),
            change_frequency: Some(ChangeFrequency::Monthly),
            priority: Some(1.0),
        }],
    };

    Ok(xml_response(sitemap_xml(&entries)))
}

async fn rss(State(state): State<SharedState>, headers: HeaderMap) -> Result<Response, AppError> {
    let owner = state
        .owner(&headers)?
        .ok_or_else(|| AppError::NotFound("RSS feed".to_string()))?;

    let options = RssFeedOptions {
        base_url: &owner.base_url,
        blog_path: Some(state.site.base_path.as_str()),
    };
    let feed = generate_rss_feed(owner.provider.as_ref(), options)
        .await
        .map_err(|e| {
            tracing::warn!("RSS feed for {} failed: {}", owner.username, e);
            AppError::from(e)
        })?
        .ok_or_else(|| AppError::NotFound("content".to_string()))?;

    Ok(xml_response(rss_xml(&feed)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RssItem;
    use crate::routes::create_router;
    use crate::routes::test_support::single_state;
    use crate::test_helpers::{article_at, StubProvider};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{DateTime, TimeZone};
    use tower::ServiceExt;

    fn date(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    async fn get_text(state: SharedState, uri: &str) -> (StatusCode, String) {
        let response = create_router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn sitemap_xml_escapes_urls() {
        let xml = sitemap_xml(&[SitemapEntry {
            url: "https://pond.audio/blog/a&b".to_string(),
            last_modified: Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap(),
            change_frequency: Some(ChangeFrequency::Weekly),
            priority: Some(0.8),
        }]);

        assert!(xml.contains("<loc>https://pond.audio/blog/a&amp;b</loc>"));
        assert!(xml.contains("<lastmod>2025-01-02T03:04:05+00:00</lastmod>"));
        assert!(xml.contains("<changefreq>weekly</changefreq>"));
        assert!(xml.contains("<priority>0.8</priority>"));
    }

    #[test]
    fn rss_xml_wraps_text_in_cdata() {
        let feed = RssFeed {
            title: "Jane's Blog".to_string(),
            link: "https://pond.audio".to_string(),
            description: "Jane's blog powered by madea.blog".to_string(),
            self_link: "https://pond.audio/rss.xml".to_string(),
            last_build_date: date("2025-06-01T00:00:00Z"),
            items: vec![RssItem {
                title: "Arrays ]]> and more".to_string(),
                link: "https://pond.audio/a.md".to_string(),
                description: "Plain text".to_string(),
                pub_date: date("2025-05-15T12:00:00Z"),
                creator: "Jane".to_string(),
            }],
        };

        let xml = rss_xml(&feed);
        assert!(xml.contains("<title>Jane&apos;s Blog</title>"));
        assert!(xml.contains("<title><![CDATA[Arrays ]]]]><![CDATA[> and more]]></title>"));
        assert!(xml.contains("<guid isPermaLink=\"true\">https://pond.audio/a.md</guid>"));
        assert!(xml.contains("<pubDate>Thu, 15 May 2025 12:00:00 +0000</pubDate>"));
        assert!(xml.contains("<dc:creator><![CDATA[Jane]]></dc:creator>"));
    }

    /// Text of every `<tag>...</tag>` element in `xml`.
    fn tag_values(xml: &str, tag: &str) -> Vec<String> {
        let open = format!("<{}>", tag);
        let close = format!("</{}>", tag);
        xml.split(open.as_str())
            .skip(1)
            .filter_map(|rest| rest.split(close.as_str()).next())
            .map(str::to_string)
            .collect()
    }

    #[tokio::test]
    async fn rss_route_serves_feed() {
        let state = single_state(StubProvider::new(vec![article_at("hello.md", "2025-01-01T00:00:00Z")]));
        let (status, body) = get_text(state, "/rss.xml").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<link>https://pond.audio/blog/hello</link>"));
        assert!(body.contains("Jane Doe&apos;s Blog"));
    }

    #[tokio::test]
    async fn advertised_urls_all_resolve() {
        let state = single_state(StubProvider::new(vec![
            article_at("posts/hello.md", "2025-01-01T00:00:00Z"),
            article_at("about.md", "2024-06-01T00:00:00Z"),
        ]));

        let (_, rss) = get_text(state.clone(), "/rss.xml").await;
        let (_, sitemap) = get_text(state.clone(), "/sitemap.xml").await;
        let (_, metadata) = get_text(state.clone(), "/api/v1/metadata?path=posts/hello").await;
        let metadata: serde_json::Value = serde_json::from_str(&metadata).unwrap();

        let mut urls = tag_values(&rss, "link");
        urls.extend(tag_values(&sitemap, "loc"));
        urls.push(metadata["alternates"]["canonical"].as_str().unwrap().to_string());
        assert_eq!(urls.len(), 3 + 3 + 1);

        for url in urls {
            let path = url.strip_prefix("https://pond.audio").unwrap();
            let (status, _) = get_text(state.clone(), path).await;
            assert_eq!(status, StatusCode::OK, "{} is advertised but does not resolve", url);
        }
    }

    #[tokio::test]
    async fn rss_route_404s_on_empty_listing_and_500s_on_failure() {
        let (status, _) = get_text(single_state(StubProvider::new(Vec::new())), "/rss.xml").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let mut failing = StubProvider::new(Vec::new());
        failing.fail_list = true;
        let (status, _) = get_text(single_state(failing), "/rss.xml").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn sitemap_route_lists_articles() {
        let state = single_state(StubProvider::new(vec![article_at("posts/hello.md", "2025-01-01T00:00:00Z")]));
        let (status, body) = get_text(state, "/sitemap.xml").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<loc>https://pond.audio/blog</loc>"));
        assert!(body.contains("<loc>https://pond.audio/blog/posts/hello</loc>"));
    }
}
