//! The theming contract.
//!
//! A theme turns site data into page [`Document`]s. The renderer in
//! [`crate::site`] drives it and checks what it returns, so any type
//! implementing [`Theme`] can be swapped in without touching the pipeline.

mod basic;

pub use basic::BasicTheme;

use crate::node::Document;
use blog_kit_core::{Content, ContentItem, RenderError, SectionId, SiteConfig, Tag};
use std::path::PathBuf;

/// Site-wide data every page can draw on
pub struct SiteContext<'a, S: SectionId> {
    pub config: &'a SiteConfig<S>,
    pub content: &'a Content<S>,
    /// Rendered `index.md` at the content root
    pub intro_html: Option<String>,
}

/// A section listing
pub struct SectionView<'a, S: SectionId> {
    pub id: S,
    pub title: String,
    pub description: Option<&'a str>,
    pub intro_html: Option<String>,
    pub items: &'a [ContentItem<S>],
}

/// One item with its body rendered to HTML
pub struct ItemView<'a, S: SectionId> {
    pub item: &'a ContentItem<S>,
    pub html: String,
}

/// Items sharing a tag, newest first
pub struct TagView<'a, S: SectionId> {
    pub tag: Tag,
    pub items: Vec<&'a ContentItem<S>>,
}

pub trait Theme<S: SectionId>: Send + Sync {
    fn render_index(&self, site: &SiteContext<'_, S>) -> Result<Document, RenderError>;

    fn render_section(
        &self,
        site: &SiteContext<'_, S>,
        section: &SectionView<'_, S>,
    ) -> Result<Document, RenderError>;

    fn render_item(
        &self,
        site: &SiteContext<'_, S>,
        item: &ItemView<'_, S>,
    ) -> Result<Document, RenderError>;

    /// `tags/index.html`; themes without tag pages return `None`
    fn render_tag_list(
        &self,
        _site: &SiteContext<'_, S>,
        _tags: &[TagView<'_, S>],
    ) -> Result<Option<Document>, RenderError> {
        Ok(None)
    }

    /// `tags/<tag>/index.html`
    fn render_tag(
        &self,
        _site: &SiteContext<'_, S>,
        _tag: &TagView<'_, S>,
    ) -> Result<Option<Document>, RenderError> {
        Ok(None)
    }

    /// Static files shipped with the theme, keyed by output path
    fn assets(&self) -> Vec<(PathBuf, Vec<u8>)> {
        Vec::new()
    }
}
