use super::Plugin;
use crate::markdown;
use crate::node::el;
use crate::site::OutputTree;
use anyhow::Context;
use blog_kit_core::PluginError;
use pulldown_cmark::{CodeBlockKind, Event, Tag, TagEnd};
use std::ops::Range;
use std::path::Path;
use syntect::html::{ClassStyle, ClassedHTMLGenerator, css_for_theme_with_class_style};
use syntect::highlighting::ThemeSet;
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

const NAME: &str = "highlight";
const CSS_PATH: &str = "highlight.css";
const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "hl-" };

/// Syntax highlighting for fenced code blocks that name a language.
///
/// Blocks are replaced by class-annotated `<pre>` markup kept on one line,
/// so the markdown renderer passes it through as an HTML block wherever the
/// fence sat (lists, quotes). Colours come from `highlight.css`, generated
/// from a bundled syntect theme.
pub struct Highlighter {
    syntaxes: SyntaxSet,
    css: String,
}

impl Highlighter {
    pub fn new(theme: &str) -> Result<Self, PluginError> {
        let error = |reason: String| PluginError {
            plugin: NAME.to_string(),
            target: format!("theme '{theme}'"),
            reason,
        };

        let themes = ThemeSet::load_defaults();
        let selected = themes.themes.get(theme).ok_or_else(|| {
            error(format!(
                "unknown theme; available: {}",
                themes.themes.keys().cloned().collect::<Vec<_>>().join(", ")
            ))
        })?;
        let css = css_for_theme_with_class_style(selected, CLASS_STYLE)
            .map_err(|e| error(e.to_string()))?;

        Ok(Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            css,
        })
    }

    pub fn css(&self) -> &str {
        &self.css
    }

    fn highlight_block(&self, syntax: &SyntaxReference, lang: &str, code: &str) -> anyhow::Result<String> {
        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &self.syntaxes, CLASS_STYLE);
        for line in LinesWithEndings::from(code) {
            generator
                .parse_html_for_line_which_includes_newline(line)
                .with_context(|| format!("failed to highlight {lang} code"))?;
        }
        let html = generator.finalize();
        Ok(format!(
            "<pre class=\"highlight\"><code class=\"language-{}\">{}</code></pre>",
            lang,
            html.trim_end_matches('\n').replace('\n', "&#10;")
        ))
    }
}

struct FencedBlock<'a> {
    range: Range<usize>,
    lang: String,
    syntax: &'a SyntaxReference,
    code: String,
}

impl Plugin for Highlighter {
    fn name(&self) -> &str {
        NAME
    }

    fn transform_body(&self, _path: &Path, body: String) -> anyhow::Result<String> {
        let mut blocks: Vec<FencedBlock<'_>> = Vec::new();
        let mut current: Option<FencedBlock<'_>> = None;

        for (event, range) in markdown::parser(&body).into_offset_iter() {
            match event {
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                    let lang = info.split_whitespace().next().unwrap_or_default();
                    if lang.is_empty() {
                        continue;
                    }
                    if let Some(syntax) = self.syntaxes.find_syntax_by_token(lang) {
                        current = Some(FencedBlock {
                            range,
                            lang: lang.to_string(),
                            syntax,
                            code: String::new(),
                        });
                    }
                }
                Event::Text(text) => {
                    if let Some(block) = current.as_mut() {
                        block.code.push_str(&text);
                    }
                }
                Event::End(TagEnd::CodeBlock) => {
                    if let Some(block) = current.take() {
                        blocks.push(block);
                    }
                }
                _ => {}
            }
        }

        if blocks.is_empty() {
            return Ok(body);
        }

        let mut out = String::with_capacity(body.len() * 2);
        let mut cursor = 0;
        for block in &blocks {
            out.push_str(&body[cursor..block.range.start]);
            out.push_str(&self.highlight_block(block.syntax, &block.lang, &block.code)?);
            if body[block.range.clone()].ends_with('\n') {
                out.push('\n');
            }
            cursor = block.range.end;
        }
        out.push_str(&body[cursor..]);
        Ok(out)
    }

    fn transform_output(&self, tree: &mut OutputTree) -> anyhow::Result<()> {
        tree.insert_asset(CSS_PATH, self.css.as_bytes().to_vec())?;
        for page in tree.pages_mut() {
            page.head.push(
                el("link")
                    .attr("rel", "stylesheet")
                    .attr("href", format!("/{CSS_PATH}"))
                    .into(),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::markdown_to_html;
    use crate::node::Document;
    use crate::site::OutputFile;

    fn highlighter() -> Highlighter {
        Highlighter::new("InspiredGitHub").unwrap()
    }

    fn transform(body: &str) -> String {
        highlighter()
            .transform_body(Path::new("posts/code.md"), body.to_string())
            .unwrap()
    }

    #[test]
    fn test_known_language_is_highlighted() {
        let out = transform("Intro\n\n```rust\nfn main() {\n    let x = 1;\n}\n```\n\nAfter\n");
        assert!(out.starts_with("Intro\n\n<pre class=\"highlight\"><code class=\"language-rust\">"));
        assert!(out.contains("hl-"));
        assert!(out.contains("&#10;"));
        assert!(out.ends_with("</code></pre>\n\nAfter\n"));

        let html = markdown_to_html(&out);
        assert!(html.contains("<pre class=\"highlight\">"));
        assert!(html.contains("<p>After</p>"));
        assert!(!html.contains("```"));
    }

    #[test]
    fn test_unknown_language_is_left_alone() {
        let body = "```nosuchlang\nsome code\n```\n";
        assert_eq!(transform(body), body);
    }

    #[test]
    fn test_plain_fence_is_left_alone() {
        let body = "```\nplain\n```\n";
        assert_eq!(transform(body), body);
    }

    #[test]
    fn test_info_string_extras_ignored() {
        let out = transform("```python title=\"x.py\"\nprint('hi')\n```\n");
        assert!(out.contains("class=\"language-python\""));
    }

    #[test]
    fn test_code_is_escaped() {
        let out = transform("```html\n<script>alert(1)</script>\n```\n");
        assert!(!out.contains("<script>"));
        assert!(out.contains("&lt;"));
    }

    #[test]
    fn test_block_inside_list_stays_in_item() {
        let out = transform("- step one\n\n  ```rust\n  let a = 1;\n  ```\n- step two\n");
        let html = markdown_to_html(&out);
        assert_eq!(html.matches("<li>").count(), 2);
        assert!(html.contains("<pre class=\"highlight\">"));
    }

    #[test]
    fn test_unknown_theme_fails() {
        let err = Highlighter::new("NoSuchTheme").err().unwrap();
        assert_eq!(err.plugin, "highlight");
        assert!(err.reason.contains("unknown theme"));
    }

    #[test]
    fn test_output_gets_stylesheet() {
        let highlighter = highlighter();
        let mut tree = OutputTree::new();
        tree.insert_page("index.html", Document::new("en", "Home")).unwrap();
        highlighter.transform_output(&mut tree).unwrap();

        match tree.get("highlight.css") {
            Some(OutputFile::Asset(bytes)) => assert_eq!(bytes, highlighter.css().as_bytes()),
            other => panic!("unexpected {other:?}"),
        }
        assert!(tree
            .page("index.html")
            .unwrap()
            .to_html()
            .contains(r#"<link rel="stylesheet" href="/highlight.css">"#));
    }
}
