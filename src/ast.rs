//! Minimal per-language parsed-document models.
//!
//! Per-language grammars are out of scope here — parsers are meant to be
//! pluggable, external collaborators — so each language gets a small tagged
//! node list good enough for scanners to walk without needing a real,
//! lossless concrete syntax tree.

use serde_json::Value as JsonValue;

use crate::diagnostic::Span;

/// The language a document's contents are written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    /// HTML markup.
    Html,
    /// JavaScript (and, since no type information is needed here,
    /// TypeScript source reuses this variant too).
    JavaScript,
    /// CSS stylesheets.
    Css,
    /// JSON documents.
    Json,
}

impl Language {
    /// Infers a language from a URL's file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "html" | "htm" => Some(Self::Html),
            "js" | "mjs" | "ts" => Some(Self::JavaScript),
            "css" => Some(Self::Css),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// A single tagged node produced by a parser's walk over its input.
///
/// `kind` is a stable, lowercase-dashed string tag (`"import"`,
/// `"custom-element"`, `"rule"`, ...) rather than a concrete enum variant, so
/// that scanners can be written against whichever kinds they care about
/// without a single shared grammar enum growing unboundedly as parsers are
/// added.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// The node's kind tag.
    pub kind: &'static str,
    /// The node's span within the document's contents.
    pub span: Span,
    /// Attributes captured for the node (e.g. an HTML tag's attributes, or a
    /// `@import` target). Order is insertion order and is significant for
    /// some scanners (first-attribute-wins lookups).
    pub attributes: Vec<(String, String)>,
    /// The node's direct textual content, if meaningful standalone (e.g. an
    /// inline `<script>` body, or a CSS declaration value).
    pub text: Option<String>,
    /// Nodes nested within this one (e.g. a custom element's children).
    pub children: Vec<Node>,
}

impl Node {
    /// Creates a new, childless node with no attributes or text.
    pub fn new(kind: &'static str, span: Span) -> Self {
        Self {
            kind,
            span,
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    /// Sets the node's attributes, returning the updated node.
    pub fn with_attributes(mut self, attributes: Vec<(String, String)>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Sets the node's text, returning the updated node.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Sets the node's children, returning the updated node.
    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    /// Gets the value of a named attribute, if present.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Walks this node and every descendant, depth-first, pre-order.
    pub fn walk(&self) -> impl Iterator<Item = &Node> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }
}

/// A language's parsed form: a flat or shallow-nested node tree for markup
/// and style languages, or a decoded [`serde_json::Value`] for JSON, which
/// has an unambiguous grammar and needs no stand-in parser.
#[derive(Debug, Clone)]
pub enum Ast {
    /// An HTML document: the top-level nodes found by the HTML parser.
    Html(Vec<Node>),
    /// A JavaScript (or TypeScript) source file: the top-level statements
    /// found by the JavaScript parser.
    JavaScript(Vec<Node>),
    /// A CSS stylesheet: the top-level rules found by the CSS parser.
    Css(Vec<Node>),
    /// A JSON document, parsed in full.
    Json(JsonValue),
}

impl Ast {
    /// Gets the language this AST was parsed as.
    pub fn language(&self) -> Language {
        match self {
            Self::Html(_) => Language::Html,
            Self::JavaScript(_) => Language::JavaScript,
            Self::Css(_) => Language::Css,
            Self::Json(_) => Language::Json,
        }
    }

    /// Gets the top-level nodes, if this AST is node-tree shaped (i.e. not
    /// JSON).
    pub fn nodes(&self) -> &[Node] {
        match self {
            Self::Html(nodes) | Self::JavaScript(nodes) | Self::Css(nodes) => nodes,
            Self::Json(_) => &[],
        }
    }
}

/// A parsed document: its language, the decoded AST, and any diagnostics the
/// parse itself produced (as distinct from scan- or resolution-time
/// diagnostics, which live on [`crate::document::Document`]).
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// The parsed AST.
    pub ast: Ast,
    /// The original contents that were parsed, kept for span-to-text lookups
    /// and to back a [`crate::line_map::LineMap`].
    pub contents: String,
}

impl ParsedDocument {
    /// Creates a new parsed document.
    pub fn new(ast: Ast, contents: String) -> Self {
        Self { ast, contents }
    }

    /// Gets the text covered by the given span.
    pub fn text(&self, span: Span) -> &str {
        &self.contents[span.start()..span.end()]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn language_from_extension_is_case_insensitive() {
        assert_eq!(Language::from_extension("HTML"), Some(Language::Html));
        assert_eq!(Language::from_extension("Js"), Some(Language::JavaScript));
        assert_eq!(Language::from_extension("xyz"), None);
    }

    #[test]
    fn node_walk_is_pre_order_depth_first() {
        let leaf_a = Node::new("a", Span::new(0, 1));
        let leaf_b = Node::new("b", Span::new(1, 1));
        let root = Node::new("root", Span::new(0, 2)).with_children(vec![leaf_a, leaf_b]);

        let kinds: Vec<_> = root.walk().map(|n| n.kind).collect();
        assert_eq!(kinds, vec!["root", "a", "b"]);
    }

    #[test]
    fn node_attribute_lookup_finds_first_match() {
        let node = Node::new("element", Span::new(0, 0)).with_attributes(vec![
            ("is".to_string(), "my-el".to_string()),
            ("class".to_string(), "foo".to_string()),
        ]);
        assert_eq!(node.attribute("is"), Some("my-el"));
        assert_eq!(node.attribute("missing"), None);
    }
}
