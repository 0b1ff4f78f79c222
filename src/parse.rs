//! Parsers: turn a document's raw contents into a [`ParsedDocument`].
//!
//! Per the scope of this crate, parsers are pluggable external collaborators
//! rather than a single owned grammar; the defaults here are deliberately
//! small (line- and regex-scanned, not full grammars) but are real, complete
//! implementations of their slice of behavior, not stubs.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;

use crate::ast::Ast;
use crate::ast::Language;
use crate::ast::Node;
use crate::ast::ParsedDocument;
use crate::diagnostic::Span;

/// Parses a document's contents for one language.
pub trait Parser: Send + Sync {
    /// The language this parser handles.
    fn language(&self) -> Language;

    /// Parses the given contents, returning the parsed document.
    ///
    /// Parsers are expected to recover from malformed input rather than
    /// fail outright; callers have no other way to report a parse error for
    /// an otherwise-loadable document, so a best-effort partial AST is
    /// preferable to an empty one.
    fn parse(&self, contents: &str) -> ParsedDocument;
}

/// A registry of parsers, keyed by language.
#[derive(Clone)]
pub struct ParserRegistry {
    /// The registered parsers.
    parsers: HashMap<Language, Arc<dyn Parser>>,
}

impl ParserRegistry {
    /// Creates a registry with the default parsers installed.
    pub fn with_defaults() -> Self {
        let mut registry = Self {
            parsers: HashMap::new(),
        };
        registry.register(Arc::new(HtmlParser::new()));
        registry.register(Arc::new(JavaScriptParser::new()));
        registry.register(Arc::new(CssParser::new()));
        registry.register(Arc::new(JsonParser));
        registry
    }

    /// Creates an empty registry.
    pub fn empty() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    /// Registers a parser, replacing any existing parser for its language.
    pub fn register(&mut self, parser: Arc<dyn Parser>) {
        self.parsers.insert(parser.language(), parser);
    }

    /// Gets the parser for the given language, if one is registered.
    pub fn get(&self, language: Language) -> Option<&Arc<dyn Parser>> {
        self.parsers.get(&language)
    }
}

impl std::fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserRegistry")
            .field("languages", &self.parsers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A minimal line-oriented HTML parser.
///
/// Recognizes opening tags (capturing their name and attributes), and
/// special-cases `<script>`/`<style>` bodies as inline text nodes so that
/// [`crate::scan`]'s inline-document scanner can hand them to the
/// JavaScript/CSS parsers in turn.
pub struct HtmlParser {
    /// Matches an opening tag and its attribute list.
    tag_re: Regex,
}

impl HtmlParser {
    /// Creates a new HTML parser.
    pub fn new() -> Self {
        Self {
            tag_re: Regex::new(r#"<([a-zA-Z][a-zA-Z0-9-]*)((?:\s+[a-zA-Z_:][-a-zA-Z0-9_:.]*(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+))?)*)\s*/?>"#).unwrap(),
        }
    }

    /// Parses the attribute list captured after a tag name.
    fn parse_attributes(&self, raw: &str) -> Vec<(String, String)> {
        let attr_re = Regex::new(r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)(?:\s*=\s*("([^"]*)"|'([^']*)'|([^\s>]+)))?"#).unwrap();
        attr_re
            .captures_iter(raw)
            .map(|c| {
                let name = c[1].to_string();
                let value = c
                    .get(3)
                    .or_else(|| c.get(4))
                    .or_else(|| c.get(5))
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default();
                (name, value)
            })
            .collect()
    }
}

impl Default for HtmlParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for HtmlParser {
    fn language(&self) -> Language {
        Language::Html
    }

    fn parse(&self, contents: &str) -> ParsedDocument {
        let mut nodes = Vec::new();

        for caps in self.tag_re.captures_iter(contents) {
            let whole = caps.get(0).unwrap();
            let name = caps[1].to_ascii_lowercase();
            let attributes = self.parse_attributes(&caps[2]);
            let span = Span::from_offsets(whole.start(), whole.end());

            let mut node = Node::new(tag_kind(&name), span).with_attributes(attributes);

            if matches!(name.as_str(), "script" | "style") {
                if let Some(close) = contents[whole.end()..].find(&format!("</{name}")) {
                    let body_start = whole.end();
                    let body_end = body_start + close;
                    let body = &contents[body_start..body_end];
                    node = node
                        .with_text(body)
                        .with_children(vec![Node::new(
                            "inline-body",
                            Span::from_offsets(body_start, body_end),
                        )]);
                }
            }

            nodes.push(node);
        }

        ParsedDocument::new(Ast::Html(nodes), contents.to_string())
    }
}

/// Maps a lowercased tag name to a stable node kind.
fn tag_kind(name: &str) -> &'static str {
    match name {
        "link" => "link",
        "script" => "script",
        "style" => "style",
        "dom-module" => "dom-module",
        _ if name.contains('-') => "custom-element",
        _ => "element",
    }
}

/// A minimal regex-scanned JavaScript parser.
///
/// Recognizes ES module imports, `Polymer({...})`/`Polymer.Element`-style
/// registrations are left to the scanner (which walks the same node list
/// looking for call expressions), and this parser's job is limited to
/// surfacing import statements, top-level function declarations, and
/// identifier references as flat nodes.
pub struct JavaScriptParser {
    /// Matches `import ... from '...'` and bare `import '...'`.
    import_re: Regex,
    /// Matches top-level function declarations.
    function_re: Regex,
    /// Matches a bare identifier reference (used for the reference scanner).
    identifier_re: Regex,
}

impl JavaScriptParser {
    /// Creates a new JavaScript parser.
    pub fn new() -> Self {
        Self {
            import_re: Regex::new(r#"import\s+(?:[^'"]*?from\s+)?['"]([^'"]+)['"]"#).unwrap(),
            function_re: Regex::new(r"function\s+([A-Za-z_$][A-Za-z0-9_$]*)\s*\(").unwrap(),
            identifier_re: Regex::new(r"\b([A-Za-z_$][A-Za-z0-9_$]*)\b").unwrap(),
        }
    }
}

impl Default for JavaScriptParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for JavaScriptParser {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn parse(&self, contents: &str) -> ParsedDocument {
        let mut nodes = Vec::new();

        for caps in self.import_re.captures_iter(contents) {
            let whole = caps.get(0).unwrap();
            let target = caps[1].to_string();
            nodes.push(
                Node::new("import", Span::from_offsets(whole.start(), whole.end()))
                    .with_attributes(vec![("source".to_string(), target)]),
            );
        }

        for caps in self.function_re.captures_iter(contents) {
            let whole = caps.get(0).unwrap();
            let name = caps[1].to_string();
            nodes.push(
                Node::new("function", Span::from_offsets(whole.start(), whole.end()))
                    .with_attributes(vec![("name".to_string(), name)]),
            );
        }

        for caps in self.identifier_re.captures_iter(contents) {
            let whole = caps.get(0).unwrap();
            nodes.push(
                Node::new("reference", Span::from_offsets(whole.start(), whole.end()))
                    .with_text(caps[1].to_string()),
            );
        }

        ParsedDocument::new(Ast::JavaScript(nodes), contents.to_string())
    }
}

/// A minimal regex-scanned CSS parser: surfaces `@import` rules only, since
/// that's the sole cross-document edge CSS can introduce.
pub struct CssParser {
    /// Matches an `@import` at-rule.
    import_re: Regex,
}

impl CssParser {
    /// Creates a new CSS parser.
    pub fn new() -> Self {
        Self {
            import_re: Regex::new(r#"@import\s+(?:url\()?['"]?([^'")\s;]+)['"]?\)?\s*;"#).unwrap(),
        }
    }
}

impl Default for CssParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for CssParser {
    fn language(&self) -> Language {
        Language::Css
    }

    fn parse(&self, contents: &str) -> ParsedDocument {
        let nodes = self
            .import_re
            .captures_iter(contents)
            .map(|caps| {
                let whole = caps.get(0).unwrap();
                let target = caps[1].to_string();
                Node::new("import", Span::from_offsets(whole.start(), whole.end()))
                    .with_attributes(vec![("source".to_string(), target)])
            })
            .collect();

        ParsedDocument::new(Ast::Css(nodes), contents.to_string())
    }
}

/// A complete JSON parser: JSON has an unambiguous grammar, so this is a
/// real parser rather than a stand-in.
pub struct JsonParser;

impl Parser for JsonParser {
    fn language(&self) -> Language {
        Language::Json
    }

    fn parse(&self, contents: &str) -> ParsedDocument {
        let value = serde_json::from_str(contents).unwrap_or(serde_json::Value::Null);
        ParsedDocument::new(Ast::Json(value), contents.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn html_parser_captures_tags_and_attributes() {
        let parser = HtmlParser::new();
        let doc = parser.parse(r#"<link rel="import" href="../foo/foo.html">"#);
        let nodes = doc.ast.nodes();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].kind, "link");
        assert_eq!(nodes[0].attribute("href"), Some("../foo/foo.html"));
    }

    #[test]
    fn html_parser_captures_inline_script_body() {
        let parser = HtmlParser::new();
        let doc = parser.parse("<script>var x = 1;</script>");
        let nodes = doc.ast.nodes();
        assert_eq!(nodes[0].kind, "script");
        assert_eq!(nodes[0].text.as_deref(), Some("var x = 1;"));
    }

    #[test]
    fn html_parser_recognizes_custom_elements() {
        let parser = HtmlParser::new();
        let doc = parser.parse("<my-element></my-element>");
        assert_eq!(doc.ast.nodes()[0].kind, "custom-element");
    }

    #[test]
    fn javascript_parser_captures_imports() {
        let parser = JavaScriptParser::new();
        let doc = parser.parse("import { Foo } from './foo.js';\nimport './bar.js';");
        let imports: Vec<_> = doc
            .ast
            .nodes()
            .iter()
            .filter(|n| n.kind == "import")
            .map(|n| n.attribute("source").unwrap())
            .collect();
        assert_eq!(imports, vec!["./foo.js", "./bar.js"]);
    }

    #[test]
    fn css_parser_captures_import() {
        let parser = CssParser::new();
        let doc = parser.parse(r#"@import "./shared.css";"#);
        assert_eq!(doc.ast.nodes()[0].attribute("source"), Some("./shared.css"));
    }

    #[test]
    fn json_parser_parses_valid_documents() {
        let parser = JsonParser;
        let doc = parser.parse(r#"{"a": 1}"#);
        assert_eq!(doc.ast.nodes().len(), 0);
        match doc.ast {
            Ast::Json(value) => assert_eq!(value["a"], 1),
            _ => panic!("expected JSON ast"),
        }
    }

    #[test]
    fn registry_resolves_by_language() {
        let registry = ParserRegistry::with_defaults();
        assert!(registry.get(Language::Html).is_some());
        assert!(registry.get(Language::Json).is_some());
    }
}
