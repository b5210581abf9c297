use super::{ItemView, SectionView, SiteContext, TagView, Theme};
use crate::node::{Document, Element, Node, el, raw};
use crate::site::{section_url, tag_url};
use blog_kit_core::{ContentItem, RenderError, SectionId, Tag};
use std::path::PathBuf;

const STYLESHEET_PATH: &str = "styles.css";

/// The default blog theme: a header with section navigation, item lists
/// with tags, and a footer linking the RSS feed.
#[derive(Debug, Clone, Default)]
pub struct BasicTheme;

impl BasicTheme {
    pub fn new() -> Self {
        Self
    }

    fn page<S: SectionId>(
        &self,
        site: &SiteContext<'_, S>,
        title: String,
        description: &str,
        selected: Option<S>,
        main: Vec<Node>,
    ) -> Document {
        let config = site.config;
        let mut doc = Document::new(&config.site.language, title);

        let description = if description.is_empty() {
            config.site.description.as_str()
        } else {
            description
        };
        doc.head.push(
            el("meta")
                .attr("name", "description")
                .attr("content", description)
                .into(),
        );
        doc.head.push(
            el("link")
                .attr("rel", "stylesheet")
                .attr("href", format!("/{}", STYLESHEET_PATH))
                .into(),
        );
        if config.feed.enabled {
            doc.head.push(
                el("link")
                    .attr("rel", "alternate")
                    .attr("type", "application/rss+xml")
                    .attr("title", format!("Subscribe to {}", config.site.name))
                    .attr("href", "/feed.rss")
                    .into(),
            );
        }
        if let Some(image) = &config.site.image {
            doc.head.push(
                el("meta")
                    .attr("property", "og:image")
                    .attr("content", config.absolute_url(image))
                    .into(),
            );
        }

        doc.body.push(self.header(site, selected).into());
        doc.body.push(el("div").class("wrapper").children(main).into());
        doc.body.push(self.footer(site).into());
        doc
    }

    fn header<S: SectionId>(&self, site: &SiteContext<'_, S>, selected: Option<S>) -> Element {
        let config = site.config;
        let nav_items = config.sections.iter().map(|&section| {
            let mut link = el("a").attr("href", section_url(section));
            if selected == Some(section) {
                link = link.class("selected");
            }
            el("li").child(link.text(config.section_title(section)))
        });

        el("header").child(
            el("div")
                .class("wrapper")
                .child(
                    el("a")
                        .class("site-name")
                        .attr("href", "/")
                        .text(&config.site.name),
                )
                .child(el("nav").child(el("ul").children(nav_items))),
        )
    }

    fn footer<S: SectionId>(&self, site: &SiteContext<'_, S>) -> Element {
        let mut footer = el("footer").child(
            el("p")
                .text("Generated using ")
                .child(
                    el("a")
                        .attr("href", "https://github.com/navicore/blog-kit")
                        .text("blog-kit"),
                ),
        );
        if site.config.feed.enabled {
            footer = footer.child(el("p").child(el("a").attr("href", "/feed.rss").text("RSS feed")));
        }
        footer
    }

    fn item_list<'a, S: SectionId>(&self, items: impl IntoIterator<Item = &'a ContentItem<S>>) -> Element {
        el("ul").class("item-list").children(items.into_iter().map(|item| {
            let mut article = el("article").child(
                el("h1").child(el("a").attr("href", item.url_path()).text(&item.metadata.title)),
            );
            if let Some(date) = item.metadata.date {
                article = article.child(
                    el("p")
                        .class("date")
                        .text(date.format("%Y-%m-%d").to_string()),
                );
            }
            if !item.metadata.tags.is_empty() {
                article = article.child(self.tag_list(&item.metadata.tags));
            }
            if !item.metadata.description.is_empty() {
                article = article.child(el("p").text(&item.metadata.description));
            }
            el("li").child(article)
        }))
    }

    fn tag_list(&self, tags: &[Tag]) -> Element {
        el("ul").class("tag-list").children(tags.iter().map(|tag| {
            el("li").child(el("a").attr("href", tag_url(tag)).text(tag.name()))
        }))
    }
}

impl<S: SectionId> Theme<S> for BasicTheme {
    fn render_index(&self, site: &SiteContext<'_, S>) -> Result<Document, RenderError> {
        let config = site.config;
        let description = match &site.intro_html {
            Some(html) => el("div").class("description").child(raw(html.clone())),
            None => el("div")
                .class("description")
                .child(el("p").text(&config.site.description)),
        };

        let main = vec![
            description.into(),
            el("h2").text("Latest content").into(),
            self.item_list(site.content.all_items_sorted()).into(),
        ];
        Ok(self.page(site, config.site.name.clone(), "", None, main))
    }

    fn render_section(
        &self,
        site: &SiteContext<'_, S>,
        section: &SectionView<'_, S>,
    ) -> Result<Document, RenderError> {
        let mut main: Vec<Node> = vec![el("h1").text(&section.title).into()];
        if let Some(html) = &section.intro_html {
            main.push(el("div").class("description").child(raw(html.clone())).into());
        }
        main.push(self.item_list(section.items).into());

        Ok(self.page(
            site,
            format!("{} | {}", section.title, site.config.site.name),
            section.description.unwrap_or_default(),
            Some(section.id),
            main,
        ))
    }

    fn render_item(
        &self,
        site: &SiteContext<'_, S>,
        view: &ItemView<'_, S>,
    ) -> Result<Document, RenderError> {
        let item = view.item;
        let mut article = el("article")
            .child(el("h1").text(&item.metadata.title))
            .child(el("div").class("content").child(raw(view.html.clone())));
        if !item.metadata.tags.is_empty() {
            article = article
                .child(el("span").text("Tagged with: "))
                .child(self.tag_list(&item.metadata.tags));
        }

        Ok(self.page(
            site,
            format!("{} | {}", item.metadata.title, site.config.site.name),
            &item.metadata.description,
            Some(item.section),
            vec![article.into()],
        ))
    }

    fn render_tag_list(
        &self,
        site: &SiteContext<'_, S>,
        tags: &[TagView<'_, S>],
    ) -> Result<Option<Document>, RenderError> {
        let list = el("ul").class("all-tags").children(tags.iter().map(|view| {
            el("li")
                .class("tag")
                .child(el("a").attr("href", tag_url(&view.tag)).text(view.tag.name()))
        }));
        let main = vec![el("h1").text("Browse all tags").into(), list.into()];
        Ok(Some(self.page(
            site,
            format!("Tags | {}", site.config.site.name),
            "",
            None,
            main,
        )))
    }

    fn render_tag(
        &self,
        site: &SiteContext<'_, S>,
        view: &TagView<'_, S>,
    ) -> Result<Option<Document>, RenderError> {
        let main = vec![
            el("h1")
                .text("Tagged with ")
                .child(el("span").class("tag").text(view.tag.name()))
                .into(),
            el("a")
                .class("browse-all")
                .attr("href", "/tags/")
                .text("Browse all tags")
                .into(),
            self.item_list(view.items.iter().copied()).into(),
        ];
        Ok(Some(self.page(
            site,
            format!("{} | {}", view.tag.name(), site.config.site.name),
            "",
            None,
            main,
        )))
    }

    fn assets(&self) -> Vec<(PathBuf, Vec<u8>)> {
        vec![(PathBuf::from(STYLESHEET_PATH), STYLESHEET.as_bytes().to_vec())]
    }
}

const STYLESHEET: &str = r#"* { margin: 0; padding: 0; box-sizing: border-box; }

body {
    font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
    line-height: 1.6;
    color: #222;
    background: #fff;
    text-align: center;
}

.wrapper {
    max-width: 900px;
    margin: 0 auto;
    padding: 40px;
    text-align: left;
}

header { background: #202020; color: #ddd; }
header .wrapper { padding-top: 30px; padding-bottom: 20px; text-align: center; }
header a { text-decoration: none; }
header .site-name { font-size: 1.5em; color: #fff; font-weight: bold; }
nav { margin-top: 20px; }
nav li { display: inline-block; margin: 0 7px; line-height: 1.5em; }
nav li a.selected { text-decoration: underline; }

h1 { margin-bottom: 20px; font-size: 2em; }
h2 { margin: 20px 0; }

a { color: inherit; }

.description { margin-bottom: 40px; }

.item-list > li {
    display: block;
    padding: 20px;
    border-radius: 20px;
    background-color: #eee;
    margin-bottom: 20px;
}
.item-list > li:last-child { margin-bottom: 0; }
.item-list h1 { margin-bottom: 15px; font-size: 1.3em; }
.item-list p { margin-bottom: 0; }
.item-list .date { color: #666; font-size: 0.9em; }

.tag-list { margin-bottom: 15px; }
.tag-list li, .tag {
    display: inline-block;
    background-color: #000;
    color: #ddd;
    padding: 4px 6px;
    border-radius: 5px;
    margin-right: 5px;
}
.tag-list a, .tag a { text-decoration: none; }

.item-page .tag-list { display: inline-block; }

.content { margin-bottom: 40px; }
.content p, .content ul, .content ol, .content pre { margin-bottom: 20px; }
.content li { margin-left: 20px; }
.content pre {
    background-color: #f6f8fa;
    padding: 16px;
    border-radius: 6px;
    overflow-x: auto;
    text-align: left;
}
.content code { font-family: "SF Mono", Menlo, Consolas, monospace; font-size: 0.9em; }

.browse-all { display: block; margin-bottom: 30px; }
.all-tags li { font-size: 1.4em; margin-right: 10px; padding: 6px 10px; }

footer { color: #8a8a8a; }
footer .wrapper, footer p { text-align: center; margin-bottom: 10px; }

@media (prefers-color-scheme: dark) {
    body { background: #222; color: #ddd; }
    .item-list > li { background-color: #333; }
    .content pre { background-color: #2d2d2d; }
}
"#;
