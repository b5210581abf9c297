//! RSS 2.0 feed generation.

use crate::markdown::markdown_to_html;
use blog_kit_core::{Content, ContentItem, RenderError, SectionId, SiteConfig};
use chrono::NaiveDateTime;
use rss::{ChannelBuilder, GuidBuilder, ItemBuilder, validation::Validate};

const FEED_PATH: &str = "feed.rss";

/// Render `feed.rss` for the newest `feed.max_items` items.
///
/// `lastBuildDate` is the newest item's date rather than the wall clock so
/// that unchanged content yields an unchanged feed.
pub fn render_feed<S: SectionId>(
    config: &SiteConfig<S>,
    content: &Content<S>,
) -> Result<String, RenderError> {
    let items: Vec<&ContentItem<S>> = content
        .all_items_sorted()
        .into_iter()
        .take(config.feed.max_items)
        .collect();

    let last_build_date = items.iter().filter_map(|i| i.metadata.date).max().map(rfc2822);

    let channel = ChannelBuilder::default()
        .title(&config.site.name)
        .link(config.absolute_url("/"))
        .description(&config.site.description)
        .language(Some(config.site.language.clone()))
        .ttl(Some(config.feed.ttl.to_string()))
        .last_build_date(last_build_date)
        .generator(Some("blog-kit".to_string()))
        .items(items.iter().map(|item| to_rss_item(config, item)).collect::<Vec<_>>())
        .build();

    channel
        .validate()
        .map_err(|e| RenderError::new(FEED_PATH, format!("RSS validation failed: {e}")))?;
    Ok(channel.to_string())
}

fn to_rss_item<S: SectionId>(config: &SiteConfig<S>, item: &ContentItem<S>) -> rss::Item {
    let link = config.absolute_url(&item.url_path());
    let description = if item.metadata.description.is_empty() {
        None
    } else {
        Some(item.metadata.description.clone())
    };

    ItemBuilder::default()
        .title(Some(item.metadata.title.clone()))
        .link(Some(link.clone()))
        .guid(Some(GuidBuilder::default().permalink(true).value(link).build()))
        .description(description)
        .content(Some(markdown_to_html(&item.body)))
        .pub_date(item.metadata.date.map(rfc2822))
        .build()
}

fn rfc2822(date: NaiveDateTime) -> String {
    date.and_utc().to_rfc2822()
}
