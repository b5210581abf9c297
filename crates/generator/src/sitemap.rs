//! `sitemap.xml` listing the index, every section and every item.

use crate::site::section_url;
use blog_kit_core::{Content, SectionId, SiteConfig};
use std::borrow::Cow;

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

struct UrlEntry {
    loc: String,
    lastmod: Option<String>,
}

pub fn render_sitemap<S: SectionId>(config: &SiteConfig<S>, content: &Content<S>) -> String {
    let mut urls = vec![UrlEntry {
        loc: config.absolute_url("/"),
        lastmod: None,
    }];
    urls.extend(config.sections.iter().map(|&id| UrlEntry {
        loc: config.absolute_url(&section_url(id)),
        lastmod: None,
    }));
    urls.extend(content.all_items_sorted().into_iter().map(|item| UrlEntry {
        loc: config.absolute_url(&item.url_path()),
        lastmod: item.metadata.date.map(|d| d.format("%Y-%m-%d").to_string()),
    }));

    let mut xml = String::with_capacity(4096);
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<urlset xmlns=\"");
    xml.push_str(SITEMAP_NS);
    xml.push_str("\">\n");
    for entry in urls {
        xml.push_str("  <url>\n    <loc>");
        xml.push_str(&escape_xml(&entry.loc));
        xml.push_str("</loc>\n");
        if let Some(lastmod) = entry.lastmod {
            xml.push_str("    <lastmod>");
            xml.push_str(&lastmod);
            xml.push_str("</lastmod>\n");
        }
        xml.push_str("  </url>\n");
    }
    xml.push_str("</urlset>\n");
    xml
}

fn escape_xml(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&apos;"),
    )
}
