//! Site rendering: drives a [`Theme`] over loaded content and collects the
//! result into an [`OutputTree`].

use crate::feed::render_feed;
use crate::markdown::markdown_to_html;
use crate::node::Document;
use crate::sitemap::render_sitemap;
use crate::theme::{ItemView, SectionView, SiteContext, TagView, Theme};
use blog_kit_core::{Content, ContentItem, RenderError, SectionId, SiteConfig, Tag};
use rayon::prelude::*;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub fn section_url<S: SectionId>(section: S) -> String {
    format!("/{}/", section.as_str())
}

pub fn tag_url(tag: &Tag) -> String {
    format!("/tags/{}/", tag.slug())
}

/// Output file for a site-relative URL such as `/posts/hello/`
fn page_path(url: &str) -> PathBuf {
    let trimmed = url.trim_matches('/');
    if trimmed.is_empty() {
        PathBuf::from("index.html")
    } else {
        PathBuf::from(trimmed).join("index.html")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFile {
    Page(Document),
    Asset(Vec<u8>),
}

impl OutputFile {
    pub fn to_bytes(&self) -> Cow<'_, [u8]> {
        match self {
            OutputFile::Page(doc) => Cow::Owned(doc.to_html().into_bytes()),
            OutputFile::Asset(bytes) => Cow::Borrowed(bytes),
        }
    }
}

/// Every generated file, keyed by its path relative to the output directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputTree {
    files: BTreeMap<PathBuf, OutputFile>,
}

impl OutputTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a page. Pages must have a title and a path of their own.
    pub fn insert_page(&mut self, path: impl Into<PathBuf>, doc: Document) -> Result<(), RenderError> {
        let path = path.into();
        if doc.title.trim().is_empty() {
            return Err(RenderError::new(path.display().to_string(), "page has an empty title"));
        }
        self.insert(path, OutputFile::Page(doc))
    }

    pub fn insert_asset(&mut self, path: impl Into<PathBuf>, bytes: Vec<u8>) -> Result<(), RenderError> {
        self.insert(path.into(), OutputFile::Asset(bytes))
    }

    fn insert(&mut self, path: PathBuf, file: OutputFile) -> Result<(), RenderError> {
        if self.files.contains_key(&path) {
            return Err(RenderError::new(
                path.display().to_string(),
                "output path is produced more than once",
            ));
        }
        self.files.insert(path, file);
        Ok(())
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<&OutputFile> {
        self.files.get(path.as_ref())
    }

    pub fn page(&self, path: impl AsRef<Path>) -> Option<&Document> {
        match self.get(path) {
            Some(OutputFile::Page(doc)) => Some(doc),
            _ => None,
        }
    }

    pub fn pages_mut(&mut self) -> impl Iterator<Item = &mut Document> {
        self.files.values_mut().filter_map(|file| match file {
            OutputFile::Page(doc) => Some(doc),
            OutputFile::Asset(_) => None,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &OutputFile)> {
        self.files.iter().map(|(path, file)| (path.as_path(), file))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn page_count(&self) -> usize {
        self.files
            .values()
            .filter(|f| matches!(f, OutputFile::Page(_)))
            .count()
    }
}

/// Render the whole site with `theme`.
///
/// Deterministic: the same configuration and content always give the same
/// tree. Item pages render in parallel; the first failing item in publish
/// order is reported.
pub fn render_site<S, T>(
    config: &SiteConfig<S>,
    content: &Content<S>,
    theme: &T,
) -> Result<OutputTree, RenderError>
where
    S: SectionId,
    T: Theme<S> + ?Sized,
{
    let site = SiteContext {
        config,
        content,
        intro_html: content.intro.as_ref().map(|i| markdown_to_html(&i.body)),
    };
    let mut tree = OutputTree::new();

    tree.insert_page("index.html", theme.render_index(&site)?)?;

    for &id in &config.sections {
        let Some(section) = content.sections.get(&id) else {
            continue;
        };
        let intro = section.intro.as_ref();
        let view = SectionView {
            id,
            title: intro
                .and_then(|i| i.title.clone())
                .unwrap_or_else(|| config.section_title(id)),
            description: intro.and_then(|i| i.description.as_deref()),
            intro_html: intro.map(|i| markdown_to_html(&i.body)),
            items: &section.items,
        };
        tree.insert_page(page_path(&section_url(id)), theme.render_section(&site, &view)?)?;
    }

    let items = content.all_items_sorted();
    let rendered: Vec<Result<(PathBuf, Document), RenderError>> = items
        .par_iter()
        .map(|item| render_item_page(&site, theme, item))
        .collect();
    for page in rendered {
        let (path, doc) = page?;
        tree.insert_page(path, doc)?;
    }

    let tags = content.tags();
    if !tags.is_empty() {
        let views: Vec<TagView<'_, S>> = tags
            .into_iter()
            .map(|(tag, items)| TagView { tag, items })
            .collect();
        if let Some(view) = views.iter().find(|v| v.tag.slug().is_empty()) {
            return Err(RenderError::new(
                format!("tag '{}'", view.tag.name()),
                "tag name has no letters or digits",
            ));
        }
        if let Some(doc) = theme.render_tag_list(&site, &views)? {
            tree.insert_page("tags/index.html", doc)?;
        }
        for view in &views {
            if let Some(doc) = theme.render_tag(&site, view)? {
                tree.insert_page(page_path(&tag_url(&view.tag)), doc)?;
            }
        }
    }

    for (path, bytes) in theme.assets() {
        tree.insert_asset(path, bytes)?;
    }

    if config.feed.enabled {
        tree.insert_asset("feed.rss", render_feed(config, content)?.into_bytes())?;
    }
    tree.insert_asset("sitemap.xml", render_sitemap(config, content).into_bytes())?;

    info!(files = tree.len(), pages = tree.page_count(), "site rendered");
    Ok(tree)
}

fn render_item_page<S, T>(
    site: &SiteContext<'_, S>,
    theme: &T,
    item: &ContentItem<S>,
) -> Result<(PathBuf, Document), RenderError>
where
    S: SectionId,
    T: Theme<S> + ?Sized,
{
    let view = ItemView {
        item,
        html: markdown_to_html(&item.body),
    };
    let doc = theme.render_item(site, &view).map_err(|e| RenderError {
        target: item.path.display().to_string(),
        reason: e.reason,
    })?;
    debug!(path = %item.path.display(), "rendered item");
    Ok((page_path(&item.url_path()), doc))
}
