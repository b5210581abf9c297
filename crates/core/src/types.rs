use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::path::PathBuf;

/// A closed set of content sections.
///
/// Implemented by a plain enum so the set of sections is fixed at compile
/// time. The tag doubles as the content directory name and the URL prefix.
pub trait SectionId: Copy + Eq + Ord + Hash + Debug + Send + Sync + 'static {
    /// Every declared section, in navigation order
    fn all() -> &'static [Self];

    /// Directory and URL tag, e.g. `posts`
    fn as_str(&self) -> &'static str;

    /// Resolve a directory name to a declared section
    fn from_tag(tag: &str) -> Option<Self> {
        Self::all().iter().copied().find(|s| s.as_str() == tag)
    }

    /// Default display title: the tag with its first letter capitalized
    fn default_title(&self) -> String {
        let tag = self.as_str();
        let mut chars = tag.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

/// Sections of the blog
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BlogSection {
    Posts,
    About,
    Links,
}

impl SectionId for BlogSection {
    fn all() -> &'static [Self] {
        &[BlogSection::Posts, BlogSection::About, BlogSection::Links]
    }

    fn as_str(&self) -> &'static str {
        match self {
            BlogSection::Posts => "posts",
            BlogSection::About => "about",
            BlogSection::Links => "links",
        }
    }
}

/// Complete site configuration, immutable once parsed
#[derive(Debug, Clone)]
pub struct SiteConfig<S: SectionId> {
    pub site: SiteInfo,
    pub paths: ContentPaths,
    pub sections: Vec<S>,
    /// Display titles; sections without an override use `default_title`
    pub section_titles: BTreeMap<S, String>,
    pub metadata: MetadataSchema,
    pub feed: FeedConfig,
    pub plugins: PluginsConfig,
    pub deploy: Option<DeploymentTarget>,
}

impl<S: SectionId> SiteConfig<S> {
    pub fn section_title(&self, section: S) -> String {
        self.section_titles
            .get(&section)
            .cloned()
            .unwrap_or_else(|| section.default_title())
    }

    /// Absolute URL for a site-relative path such as `/posts/hello/`
    pub fn absolute_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.site.url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Site identity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteInfo {
    pub url: String,
    pub name: String,
    pub description: String,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Directories, relative to the site root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentPaths {
    pub content: PathBuf,
    pub resources: PathBuf,
    pub output: PathBuf,
}

impl Default for ContentPaths {
    fn default() -> Self {
        Self {
            content: PathBuf::from("Content"),
            resources: PathBuf::from("Resources"),
            output: PathBuf::from("Output"),
        }
    }
}

/// Extra metadata keys every item must carry (title is always required)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetadataSchema {
    #[serde(default)]
    pub required: Vec<String>,
}

/// RSS feed settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub enabled: bool,
    pub max_items: usize,
    /// Minutes readers may cache the feed
    pub ttl: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_items: 100,
            ttl: 250,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginsConfig {
    pub highlight: HighlightConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicon: Option<FaviconConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighlightConfig {
    pub enabled: bool,
    /// Name of a bundled syntect theme
    pub theme: String,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            theme: "InspiredGitHub".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaviconConfig {
    /// Source image, relative to the site root
    pub source: PathBuf,
}

/// Where a built site gets pushed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeploymentTarget {
    GitHub {
        /// `owner/name`
        repository: String,
        branch: String,
        use_ssh: bool,
    },
    Git {
        remote: String,
        branch: String,
    },
}

impl DeploymentTarget {
    pub fn remote_url(&self) -> String {
        match self {
            DeploymentTarget::GitHub {
                repository,
                use_ssh: true,
                ..
            } => format!("git@github.com:{}.git", repository),
            DeploymentTarget::GitHub { repository, .. } => {
                format!("https://github.com/{}.git", repository)
            }
            DeploymentTarget::Git { remote, .. } => remote.clone(),
        }
    }

    pub fn branch(&self) -> &str {
        match self {
            DeploymentTarget::GitHub { branch, .. } | DeploymentTarget::Git { branch, .. } => branch,
        }
    }
}

/// A tag attached to items
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(pub String);

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Tag(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Path segment for the tag's pages. Names with no ASCII letters or
    /// digits keep their other alphanumerics, lowercased.
    pub fn slug(&self) -> String {
        let slug = slugify(&self.0);
        if slug.is_empty() {
            slug_keeping(&self.0, char::is_alphanumeric)
        } else {
            slug
        }
    }
}

/// Parsed front matter of a content item
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemMetadata {
    pub title: String,
    pub date: Option<NaiveDateTime>,
    pub description: String,
    pub tags: Vec<Tag>,
    pub extra: BTreeMap<String, String>,
}

/// One published document
#[derive(Debug, Clone)]
pub struct ContentItem<S: SectionId> {
    pub section: S,
    /// Source path relative to the content root, e.g. `posts/hello.md`
    pub path: PathBuf,
    /// Route below the site root, e.g. `posts/hello`
    pub route: String,
    pub metadata: ItemMetadata,
    /// Markdown body
    pub body: String,
}

impl<S: SectionId> ContentItem<S> {
    pub fn url_path(&self) -> String {
        format!("/{}/", self.route)
    }

    /// Newest first, undated last, then by source path
    pub fn publish_order(a: &Self, b: &Self) -> std::cmp::Ordering {
        b.metadata
            .date
            .cmp(&a.metadata.date)
            .then_with(|| a.path.cmp(&b.path))
    }
}

/// Optional `index.md` introducing the site or a section
#[derive(Debug, Clone, Default)]
pub struct Intro {
    pub path: PathBuf,
    pub title: Option<String>,
    pub description: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct SectionContent<S: SectionId> {
    pub id: S,
    pub intro: Option<Intro>,
    pub items: Vec<ContentItem<S>>,
}

/// Everything the loader found, grouped by section
#[derive(Debug, Clone)]
pub struct Content<S: SectionId> {
    pub intro: Option<Intro>,
    pub sections: BTreeMap<S, SectionContent<S>>,
}

impl<S: SectionId> Content<S> {
    /// Empty content for every declared section
    pub fn empty() -> Self {
        Self {
            intro: None,
            sections: S::all()
                .iter()
                .map(|&id| {
                    (
                        id,
                        SectionContent {
                            id,
                            intro: None,
                            items: Vec::new(),
                        },
                    )
                })
                .collect(),
        }
    }

    pub fn items(&self) -> impl Iterator<Item = &ContentItem<S>> {
        self.sections.values().flat_map(|s| s.items.iter())
    }

    pub fn item_count(&self) -> usize {
        self.sections.values().map(|s| s.items.len()).sum()
    }

    /// All items across sections in publish order
    pub fn all_items_sorted(&self) -> Vec<&ContentItem<S>> {
        let mut items: Vec<_> = self.items().collect();
        items.sort_by(|a, b| ContentItem::<S>::publish_order(a, b));
        items
    }

    /// Tags with their items in publish order, sorted by slug.
    ///
    /// Tags with the same slug (`Rust` and `rust`) are one group, named by
    /// the spelling seen first in publish order.
    pub fn tags(&self) -> Vec<(Tag, Vec<&ContentItem<S>>)> {
        let mut groups: BTreeMap<String, (Tag, Vec<&ContentItem<S>>)> = BTreeMap::new();
        for item in self.all_items_sorted() {
            for tag in &item.metadata.tags {
                let (_, items) = groups
                    .entry(tag.slug())
                    .or_insert_with(|| (tag.clone(), Vec::new()));
                if !items.last().is_some_and(|last| std::ptr::eq(*last, item)) {
                    items.push(item);
                }
            }
        }
        groups.into_values().collect()
    }
}

/// URL-safe slug: lowercase ASCII alphanumerics joined by single hyphens
pub fn slugify(s: &str) -> String {
    slug_keeping(s, |c| c.is_ascii_alphanumeric())
}

fn slug_keeping(s: &str, keep: impl Fn(char) -> bool) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| {
            if keep(c) {
                c
            } else if c.is_whitespace() || c == '-' || c == '_' || c == '.' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|&c| c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn item(path: &str, date: Option<(i32, u32, u32)>) -> ContentItem<BlogSection> {
        ContentItem {
            section: BlogSection::Posts,
            path: PathBuf::from(path),
            route: path.trim_end_matches(".md").to_string(),
            metadata: ItemMetadata {
                title: path.to_string(),
                date: date.map(|(y, m, d)| {
                    NaiveDate::from_ymd_opt(y, m, d)
                        .unwrap()
                        .and_hms_opt(0, 0, 0)
                        .unwrap()
                }),
                ..Default::default()
            },
            body: String::new(),
        }
    }

    #[test]
    fn test_section_from_tag() {
        assert_eq!(BlogSection::from_tag("posts"), Some(BlogSection::Posts));
        assert_eq!(BlogSection::from_tag("links"), Some(BlogSection::Links));
        assert_eq!(BlogSection::from_tag("drafts"), None);
        assert_eq!(BlogSection::from_tag("Posts"), None);
    }

    #[test]
    fn test_section_default_title() {
        assert_eq!(BlogSection::Posts.default_title(), "Posts");
        assert_eq!(BlogSection::About.default_title(), "About");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("LLVM & MLIR"), "llvm-mlir");
        assert_eq!(slugify("  many   spaces "), "many-spaces");
        assert_eq!(slugify("snake_case-and.dots"), "snake-case-and-dots");
        assert_eq!(slugify("Café"), "caf");
        assert_eq!(slugify("c++"), "c");
    }

    #[test]
    fn test_publish_order_newest_first_undated_last() {
        let mut items = vec![
            item("posts/undated.md", None),
            item("posts/old.md", Some((2020, 1, 1))),
            item("posts/new.md", Some((2024, 5, 1))),
            item("posts/also-undated.md", None),
        ];
        items.sort_by(ContentItem::publish_order);
        let order: Vec<_> = items.iter().map(|i| i.path.to_str().unwrap()).collect();
        assert_eq!(
            order,
            vec![
                "posts/new.md",
                "posts/old.md",
                "posts/also-undated.md",
                "posts/undated.md"
            ]
        );
    }

    #[test]
    fn test_remote_url() {
        let ssh = DeploymentTarget::GitHub {
            repository: "tg908/tg908.github.io".into(),
            branch: "master".into(),
            use_ssh: true,
        };
        assert_eq!(ssh.remote_url(), "git@github.com:tg908/tg908.github.io.git");

        let https = DeploymentTarget::GitHub {
            repository: "tg908/tg908.github.io".into(),
            branch: "master".into(),
            use_ssh: false,
        };
        assert_eq!(
            https.remote_url(),
            "https://github.com/tg908/tg908.github.io.git"
        );
        assert_eq!(https.branch(), "master");
    }

    #[test]
    fn test_content_tags_grouped_and_sorted() {
        let mut a = item("posts/a.md", Some((2021, 1, 1)));
        a.metadata.tags = vec![Tag::new("rust"), Tag::new("llvm")];
        let mut b = item("posts/b.md", Some((2022, 1, 1)));
        b.metadata.tags = vec![Tag::new("rust")];

        let mut content = Content::<BlogSection>::empty();
        content
            .sections
            .get_mut(&BlogSection::Posts)
            .unwrap()
            .items = vec![a, b];

        let tags = content.tags();
        let names: Vec<_> = tags.iter().map(|(tag, _)| tag.name()).collect();
        assert_eq!(names, vec!["llvm", "rust"]);
        let rust: Vec<_> = tags[1]
            .1
            .iter()
            .map(|i| i.path.to_str().unwrap())
            .collect();
        assert_eq!(rust, vec!["posts/b.md", "posts/a.md"]);
    }

    #[test]
    fn test_tags_differing_in_case_share_a_group() {
        let mut a = item("posts/a.md", Some((2021, 1, 1)));
        a.metadata.tags = vec![Tag::new("rust")];
        let mut b = item("posts/b.md", Some((2022, 1, 1)));
        b.metadata.tags = vec![Tag::new("Rust"), Tag::new("RUST")];

        let mut content = Content::<BlogSection>::empty();
        content
            .sections
            .get_mut(&BlogSection::Posts)
            .unwrap()
            .items = vec![a, b];

        let tags = content.tags();
        assert_eq!(tags.len(), 1);
        let (tag, items) = &tags[0];
        assert_eq!(tag.name(), "Rust");
        let paths: Vec<_> = items.iter().map(|i| i.path.to_str().unwrap()).collect();
        assert_eq!(paths, vec!["posts/b.md", "posts/a.md"]);
    }

    #[test]
    fn test_tag_slug_keeps_non_ascii_names() {
        assert_eq!(Tag::new("Compilers & VMs").slug(), "compilers-vms");
        assert_eq!(Tag::new("日本語").slug(), "日本語");
        assert_eq!(Tag::new("Ωμέγα Λ").slug(), "ωμέγα-λ");
        assert_eq!(Tag::new("++").slug(), "");
    }
}
