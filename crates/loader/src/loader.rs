use crate::front_matter::{FrontMatter, split_front_matter};
use blog_kit_core::{
    Content, ContentItem, Intro, LoadError, LoadErrorKind, MetadataSchema, SectionId, SiteConfig,
    slugify,
};
use rayon::prelude::*;
use std::fs;
use std::marker::PhantomData;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

const INDEX_FILE: &str = "index.md";

/// What a markdown file under the content root represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind<S: SectionId> {
    /// `index.md` at the content root
    SiteIntro,
    /// `<section>/index.md`
    SectionIntro(S),
    /// Any other `<section>/**/*.md`
    Item(S),
}

/// A discovered markdown file, not yet parsed
#[derive(Debug, Clone)]
pub struct Source<S: SectionId> {
    pub kind: SourceKind<S>,
    /// Relative to the content root
    pub path: PathBuf,
}

enum Parsed<S: SectionId> {
    SiteIntro(Intro),
    SectionIntro(S, Intro),
    Item(ContentItem<S>),
}

/// Reads `<section>/<item>.md` files below a content root
pub struct ContentLoader<S: SectionId> {
    root: PathBuf,
    schema: MetadataSchema,
    _sections: PhantomData<S>,
}

impl<S: SectionId> ContentLoader<S> {
    pub fn new(root: impl Into<PathBuf>, schema: MetadataSchema) -> Self {
        Self {
            root: root.into(),
            schema,
            _sections: PhantomData,
        }
    }

    /// Loader for the content directory of a site rooted at `site_root`
    pub fn from_config(site_root: &Path, config: &SiteConfig<S>) -> Self {
        Self::new(
            site_root.join(&config.paths.content),
            config.metadata.clone(),
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lazily walk the content root in file-name order.
    ///
    /// Markdown files in undeclared section directories, or directly in the
    /// root (other than `index.md`), are reported as errors. Hidden entries
    /// and non-markdown files are skipped.
    pub fn sources(&self) -> impl Iterator<Item = Result<Source<S>, LoadError>> + '_ {
        WalkDir::new(&self.root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !e.file_name().to_string_lossy().starts_with('.'))
            .filter_map(move |entry| {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        let path = err.path().unwrap_or(&self.root).to_path_buf();
                        return Some(Err(LoadError::new(path, LoadErrorKind::Io(err.into()))));
                    }
                };
                if !entry.file_type().is_file() || !is_markdown(entry.path()) {
                    return None;
                }
                let relative = entry
                    .path()
                    .strip_prefix(&self.root)
                    .unwrap_or(entry.path())
                    .to_path_buf();
                Some(classify(relative))
            })
    }

    /// Lazily parse every item, skipping intros
    pub fn items(&self) -> impl Iterator<Item = Result<ContentItem<S>, LoadError>> + '_ {
        self.sources().filter_map(move |source| match source {
            Err(err) => Some(Err(err)),
            Ok(source) => match source.kind {
                SourceKind::Item(section) => Some(self.parse_item(section, &source.path)),
                _ => None,
            },
        })
    }

    /// Discover and parse everything, grouped by section.
    ///
    /// Discovery runs to completion first, so an undeclared section fails
    /// the load before any file is parsed. Parsing then runs in parallel; on
    /// failure the error of the first file in walk order is returned.
    pub fn load(&self) -> Result<Content<S>, LoadError> {
        if !self.root.is_dir() {
            return Err(LoadError::new(
                &self.root,
                LoadErrorKind::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "content directory not found",
                )),
            ));
        }

        let sources = self.sources().collect::<Result<Vec<_>, _>>()?;

        let parsed: Vec<Result<Parsed<S>, LoadError>> = sources
            .par_iter()
            .map(|source| self.parse(source))
            .collect();

        let mut content = Content::empty();
        for result in parsed {
            match result? {
                Parsed::SiteIntro(intro) => content.intro = Some(intro),
                Parsed::SectionIntro(section, intro) => {
                    if let Some(s) = content.sections.get_mut(&section) {
                        s.intro = Some(intro);
                    }
                }
                Parsed::Item(item) => {
                    if let Some(s) = content.sections.get_mut(&item.section) {
                        s.items.push(item);
                    }
                }
            }
        }

        for section in content.sections.values_mut() {
            section.items.sort_by(ContentItem::publish_order);
        }

        info!(
            root = %self.root.display(),
            items = content.item_count(),
            "content loaded"
        );
        Ok(content)
    }

    fn parse(&self, source: &Source<S>) -> Result<Parsed<S>, LoadError> {
        match source.kind {
            SourceKind::SiteIntro => Ok(Parsed::SiteIntro(self.parse_intro(&source.path)?)),
            SourceKind::SectionIntro(section) => Ok(Parsed::SectionIntro(
                section,
                self.parse_intro(&source.path)?,
            )),
            SourceKind::Item(section) => Ok(Parsed::Item(self.parse_item(section, &source.path)?)),
        }
    }

    fn read(&self, path: &Path) -> Result<String, LoadError> {
        fs::read_to_string(self.root.join(path)).map_err(|e| LoadError::new(path, e.into()))
    }

    fn parse_item(&self, section: S, path: &Path) -> Result<ContentItem<S>, LoadError> {
        let text = self.read(path)?;
        let (header, body) = split_front_matter(&text)
            .map_err(|kind| LoadError::new(path, kind))?
            .ok_or_else(|| LoadError::new(path, LoadErrorKind::MissingHeader))?;

        let metadata = FrontMatter::parse(header)
            .and_then(|front| front.into_metadata(&self.schema))
            .map_err(|kind| LoadError::new(path, kind))?;

        debug!(path = %path.display(), title = %metadata.title, "parsed item");

        Ok(ContentItem {
            section,
            path: path.to_path_buf(),
            route: route_for(path),
            metadata,
            body: body.to_string(),
        })
    }

    /// Intros may omit the header entirely
    fn parse_intro(&self, path: &Path) -> Result<Intro, LoadError> {
        let text = self.read(path)?;
        let (front, body) = match split_front_matter(&text).map_err(|k| LoadError::new(path, k))? {
            Some((header, body)) => (
                FrontMatter::parse(header).map_err(|k| LoadError::new(path, k))?,
                body,
            ),
            None => (FrontMatter::default(), text.as_str()),
        };

        Ok(Intro {
            path: path.to_path_buf(),
            title: front.title,
            description: front.description,
            body: body.to_string(),
        })
    }
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("md") || ext.eq_ignore_ascii_case("markdown"))
        .unwrap_or(false)
}

fn classify<S: SectionId>(path: PathBuf) -> Result<Source<S>, LoadError> {
    let parts: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    let kind = match parts.as_slice() {
        [file] if file == INDEX_FILE => SourceKind::SiteIntro,
        [_] => return Err(LoadError::new(path, LoadErrorKind::OutsideSection)),
        [dir, rest @ ..] => {
            let section = S::from_tag(dir).ok_or_else(|| {
                LoadError::new(&path, LoadErrorKind::UndeclaredSection(dir.clone()))
            })?;
            if rest.len() == 1 && rest[0] == INDEX_FILE {
                SourceKind::SectionIntro(section)
            } else {
                SourceKind::Item(section)
            }
        }
        [] => return Err(LoadError::new(path, LoadErrorKind::OutsideSection)),
    };

    Ok(Source { kind, path })
}

/// `posts/2020/Hello World.md` becomes `posts/2020/hello-world`
fn route_for(path: &Path) -> String {
    let stemmed = path.with_extension("");
    stemmed
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => {
                let part = part.to_string_lossy();
                let slug = slugify(&part);
                Some(if slug.is_empty() {
                    part.to_lowercase()
                } else {
                    slug
                })
            }
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
