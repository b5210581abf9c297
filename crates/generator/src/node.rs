//! Output document tree.
//!
//! Themes build pages out of [`Node`]s; plugins may amend a [`Document`]
//! (e.g. append `<link>` elements to its head) before it is serialized.

const VOID_ELEMENTS: &[&str] = &["area", "base", "br", "col", "hr", "img", "input", "link", "meta", "source"];

/// HTML-escape a string to prevent XSS attacks
///
/// Escapes: & < > " '
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Escaped on output
    Text(String),
    /// Trusted markup, written verbatim (rendered markdown)
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: &'static str,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

/// Start an element
pub fn el(name: &'static str) -> Element {
    Element {
        name,
        attrs: Vec::new(),
        children: Vec::new(),
    }
}

pub fn text(s: impl Into<String>) -> Node {
    Node::Text(s.into())
}

pub fn raw(s: impl Into<String>) -> Node {
    Node::Raw(s.into())
}

impl Element {
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn class(self, value: impl Into<String>) -> Self {
        self.attr("class", value)
    }

    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    pub fn children<I, N>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        self.children.extend(nodes.into_iter().map(Into::into));
        self
    }

    pub fn text(self, s: impl Into<String>) -> Self {
        self.child(Node::Text(s.into()))
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(self.name);
        for (name, value) in &self.attrs {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&html_escape(value));
            out.push('"');
        }
        out.push('>');
        if VOID_ELEMENTS.contains(&self.name) {
            return;
        }
        for child in &self.children {
            child.write_html(out);
        }
        out.push_str("</");
        out.push_str(self.name);
        out.push('>');
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl Node {
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Node::Element(element) => element.write_html(out),
            Node::Text(s) => out.push_str(&html_escape(s)),
            Node::Raw(s) => out.push_str(s),
        }
    }
}

/// A complete HTML page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub lang: String,
    pub title: String,
    /// Extra head content after the charset, viewport and title
    pub head: Vec<Node>,
    pub body: Vec<Node>,
}

impl Document {
    pub fn new(lang: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            title: title.into(),
            head: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn to_html(&self) -> String {
        let mut out = String::with_capacity(4096);
        out.push_str("<!DOCTYPE html>\n<html lang=\"");
        out.push_str(&html_escape(&self.lang));
        out.push_str("\"><head>");
        out.push_str("<meta charset=\"UTF-8\">");
        out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">");
        out.push_str("<title>");
        out.push_str(&html_escape(&self.title));
        out.push_str("</title>");
        for node in &self.head {
            node.write_html(&mut out);
        }
        out.push_str("</head><body>");
        for node in &self.body {
            node.write_html(&mut out);
        }
        out.push_str("</body></html>\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape_basic_characters() {
        assert_eq!(html_escape("Hello World"), "Hello World");
        assert_eq!(html_escape("Test & Test"), "Test &amp; Test");
        assert_eq!(html_escape("<script>"), "&lt;script&gt;");
        assert_eq!(html_escape("\"quoted\""), "&quot;quoted&quot;");
        assert_eq!(html_escape("'single'"), "&#x27;single&#x27;");
    }

    #[test]
    fn test_html_escape_xss_attempts() {
        assert_eq!(
            html_escape("<script>alert('XSS')</script>"),
            "&lt;script&gt;alert(&#x27;XSS&#x27;)&lt;/script&gt;"
        );
        assert_eq!(
            html_escape("\"><script>alert(document.cookie)</script>"),
            "&quot;&gt;&lt;script&gt;alert(document.cookie)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_html_escape_unicode() {
        assert_eq!(html_escape("llvm::BasicBlog"), "llvm::BasicBlog");
        assert_eq!(html_escape("Компилятор"), "Компилятор");
    }

    #[test]
    fn test_element_rendering() {
        let node: Node = el("a")
            .attr("href", "/posts/?a=1&b=2")
            .class("link")
            .text("Tom & Jerry")
            .into();
        assert_eq!(
            node.to_html(),
            r#"<a href="/posts/?a=1&amp;b=2" class="link">Tom &amp; Jerry</a>"#
        );
    }

    #[test]
    fn test_void_elements_have_no_close_tag() {
        let node: Node = el("link").attr("rel", "stylesheet").attr("href", "/styles.css").into();
        assert_eq!(node.to_html(), r#"<link rel="stylesheet" href="/styles.css">"#);
    }

    #[test]
    fn test_raw_is_verbatim() {
        let node: Node = el("div").child(raw("<p>ok</p>")).into();
        assert_eq!(node.to_html(), "<div><p>ok</p></div>");
    }

    #[test]
    fn test_document_to_html() {
        let mut doc = Document::new("en", "A <title>");
        doc.body.push(el("p").text("hi").into());
        let html = doc.to_html();
        assert!(html.starts_with("<!DOCTYPE html>\n<html lang=\"en\">"));
        assert!(html.contains("<title>A &lt;title&gt;</title>"));
        assert!(html.contains("<body><p>hi</p></body>"));
    }
}
