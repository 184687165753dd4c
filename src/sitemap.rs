// src/sitemap.rs
//! Dynamic sitemap: static pages plus one entry per post slug.

use anyhow::anyhow;
use serde::Serialize;

use crate::models::Post;

#[derive(Serialize)]
#[serde(rename = "urlset")]
struct UrlSet {
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    url: Vec<UrlEntry>,
}

#[derive(Serialize)]
struct UrlEntry {
    loc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    lastmod: Option<String>,
    changefreq: &'static str,
    priority: &'static str,
}

/// Render the sitemap XML. Posts appear newest-updated first.
pub fn render(base_url: &str, posts: &[Post]) -> anyhow::Result<String> {
    let base = base_url.trim_end_matches('/');

    let mut urls = vec![
        UrlEntry {
            loc: format!("{base}/"),
            lastmod: None,
            changefreq: "daily",
            priority: "1.0",
        },
        UrlEntry {
            loc: format!("{base}/feed"),
            lastmod: None,
            changefreq: "always",
            priority: "1.0",
        },
        UrlEntry {
            loc: format!("{base}/search"),
            lastmod: None,
            changefreq: "monthly",
            priority: "0.8",
        },
    ];

    let mut sorted: Vec<&Post> = posts.iter().collect();
    sorted.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
    for post in sorted {
        urls.push(UrlEntry {
            loc: format!("{base}/posts/{}", post.slug),
            lastmod: Some(post.updated_at.to_rfc3339()),
            changefreq: "weekly",
            priority: "0.8",
        });
    }

    let set = UrlSet {
        xmlns: "http://www.sitemaps.org/schemas/sitemap/0.9",
        url: urls,
    };
    let body = quick_xml::se::to_string(&set).map_err(|e| anyhow!("sitemap serialize: {e}"))?;
    Ok(format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>{body}"))
}
