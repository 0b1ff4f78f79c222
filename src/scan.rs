//! Scanners: walk a [`ParsedDocument`] and emit [`ScannedFeature`]s.

use std::sync::Arc;
use std::sync::Mutex;

use regex::Regex;

use crate::ast::Ast;
use crate::ast::Language;
use crate::ast::Node;
use crate::ast::ParsedDocument;
use crate::diagnostic::Span;
use crate::diagnostic::Warning;
use crate::line_map::LocationOffset;

/// A scanned import edge: an HTML `<link>`/`<script src>`, a JS `import`, or
/// a CSS `@import`.
#[derive(Debug, Clone)]
pub struct ScannedImport {
    /// The import's type tag, e.g. `html-import`, `js-import`, `css-import`,
    /// `lazy-html-import`.
    pub kind: &'static str,
    /// The span of the whole import statement/tag.
    pub span: Span,
    /// The span of just the URL text, for diagnostics that point at it.
    pub url_span: Span,
    /// The (unresolved) URL text as written.
    pub url: String,
    /// Filled in by [`crate::context`] once the imported document has been
    /// scanned, so that later passes (cache invalidation, feature
    /// resolution) can walk the import graph without a second lookup.
    pub scanned_document: Arc<Mutex<Option<Arc<ScannedDocument>>>>,
    /// Filled in by [`crate::context`] if the import target could not be
    /// loaded, so that [`crate::document::Document::resolve`] can surface a
    /// `could-not-load` warning at this import's own source range.
    pub load_error: Arc<Mutex<Option<String>>>,
}

impl ScannedImport {
    /// Creates a new scanned import with an empty `scanned_document` slot.
    pub fn new(kind: &'static str, span: Span, url_span: Span, url: String) -> Self {
        Self {
            kind,
            span,
            url_span,
            url,
            scanned_document: Arc::new(Mutex::new(None)),
            load_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Determines whether this import is eagerly followed (all kinds except
    /// `lazy-html-import`).
    pub fn is_eager(&self) -> bool {
        self.kind != "lazy-html-import"
    }
}

/// A `<script>`/`<style>` body extracted from a host document for its own,
/// independent scan.
#[derive(Debug, Clone)]
pub struct ScannedInlineDocument {
    /// The inline document's language tag, `js` or `css`.
    pub kind: &'static str,
    /// The span of the inline body within the host document.
    pub span: Span,
    /// The inline body's contents.
    pub contents: String,
    /// The translation applied to source ranges produced for the inline doc.
    pub location_offset: LocationOffset,
    /// A host-doc comment immediately preceding the inline body, if any.
    pub attached_comment: Option<String>,
    /// Filled in once the inline document has itself been scanned.
    pub scanned_document: Arc<Mutex<Option<Arc<ScannedDocument>>>>,
}

impl ScannedInlineDocument {
    /// Creates a new scanned inline document with an empty slot.
    pub fn new(
        kind: &'static str,
        span: Span,
        contents: String,
        location_offset: LocationOffset,
    ) -> Self {
        Self {
            kind,
            span,
            contents,
            location_offset,
            attached_comment: None,
            scanned_document: Arc::new(Mutex::new(None)),
        }
    }
}

/// A custom-element-like tag found by the HTML element scanner.
#[derive(Debug, Clone)]
pub struct ScannedElement {
    /// The tag name, e.g. `my-element`.
    pub tag_name: String,
    /// The span of the opening tag.
    pub span: Span,
    /// A host-comment immediately preceding the element, attached as
    /// documentation if this was the first feature scanned.
    pub doc: Option<String>,
}

/// A Polymer-style element registration (`Polymer({...})` or
/// `customElements.define(...)`).
#[derive(Debug, Clone)]
pub struct ScannedPolymerElement {
    /// The tag name this element registers under.
    pub tag_name: String,
    /// The class name, if the registration used a class expression.
    pub class_name: Option<String>,
    /// The span of the whole registration call.
    pub span: Span,
    /// Behavior identifiers assigned via a `behaviors: [...]` array.
    pub behavior_assignments: Vec<String>,
    /// Property names declared in the `properties: {...}` object.
    pub properties: Vec<String>,
    /// A host-comment immediately preceding the registration, attached as
    /// documentation if this was the first feature scanned.
    pub doc: Option<String>,
}

/// A `Polymer.Behavior`-style assignment.
#[derive(Debug, Clone)]
pub struct ScannedBehavior {
    /// The behavior's identifier (the assigned-to namespace path).
    pub name: String,
    /// The span of the assignment.
    pub span: Span,
}

/// A namespace object declared via assignment (`window.Foo = {}` or
/// `Foo.Bar = {}`-style forms recognized by the namespace scanner).
#[derive(Debug, Clone)]
pub struct ScannedNamespace {
    /// The namespace's dotted name.
    pub name: String,
    /// The span of the declaration.
    pub span: Span,
}

/// A top-level function declaration.
#[derive(Debug, Clone)]
pub struct ScannedFunction {
    /// The function's name.
    pub name: String,
    /// The span of the declaration.
    pub span: Span,
}

/// A bare identifier reference recorded for later resolution.
#[derive(Debug, Clone)]
pub struct ScannedReference {
    /// The identifier text.
    pub identifier: String,
    /// The span of the reference.
    pub span: Span,
}

/// A `<dom-module>` element, associating a tag id with its template content.
#[derive(Debug, Clone)]
pub struct ScannedDomModule {
    /// The `id` attribute of the `<dom-module>`.
    pub id: Option<String>,
    /// The span of the element.
    pub span: Span,
}

/// A language-neutral tagged record produced by a scan.
#[derive(Debug, Clone)]
pub enum ScannedFeature {
    /// See [`ScannedImport`].
    Import(ScannedImport),
    /// See [`ScannedInlineDocument`].
    InlineDocument(ScannedInlineDocument),
    /// See [`ScannedElement`].
    Element(ScannedElement),
    /// See [`ScannedPolymerElement`].
    PolymerElement(ScannedPolymerElement),
    /// See [`ScannedBehavior`].
    Behavior(ScannedBehavior),
    /// See [`ScannedNamespace`].
    Namespace(ScannedNamespace),
    /// See [`ScannedFunction`].
    Function(ScannedFunction),
    /// See [`ScannedReference`].
    Reference(ScannedReference),
    /// See [`ScannedDomModule`].
    DomModule(ScannedDomModule),
}

impl ScannedFeature {
    /// The set of string tags this feature answers to, e.g. a Polymer
    /// element answers to both `element` and `polymer-element`.
    pub fn kinds(&self) -> &'static [&'static str] {
        match self {
            Self::Import(_) => &["import"],
            Self::InlineDocument(_) => &["inline-document"],
            Self::Element(_) => &["element"],
            Self::PolymerElement(_) => &["element", "polymer-element"],
            Self::Behavior(_) => &["behavior"],
            Self::Namespace(_) => &["namespace"],
            Self::Function(_) => &["function"],
            Self::Reference(_) => &["reference"],
            Self::DomModule(_) => &["dom-module"],
        }
    }

    /// The span the feature's diagnostics anchor to.
    pub fn span(&self) -> Span {
        match self {
            Self::Import(f) => f.span,
            Self::InlineDocument(f) => f.span,
            Self::Element(f) => f.span,
            Self::PolymerElement(f) => f.span,
            Self::Behavior(f) => f.span,
            Self::Namespace(f) => f.span,
            Self::Function(f) => f.span,
            Self::Reference(f) => f.span,
            Self::DomModule(f) => f.span,
        }
    }

    /// If this feature is an inline document, gets its (possibly still
    /// empty) scanned sub-document slot.
    pub fn inline_scanned_document(&self) -> Option<Arc<ScannedDocument>> {
        match self {
            Self::InlineDocument(f) => f.scanned_document.lock().unwrap().clone(),
            _ => None,
        }
    }

    /// If this feature is an import, gets its (possibly still empty) scanned
    /// target-document slot.
    pub fn import_scanned_document(&self) -> Option<Arc<ScannedDocument>> {
        match self {
            Self::Import(f) => f.scanned_document.lock().unwrap().clone(),
            _ => None,
        }
    }
}

/// The result of scanning one document: its parse, the features found, and
/// any warnings raised while scanning it.
#[derive(Debug)]
pub struct ScannedDocument {
    /// The parsed document this scan ran over.
    pub document: ParsedDocument,
    /// The features found, in scanner-registry order.
    pub features: Vec<ScannedFeature>,
    /// Warnings raised while scanning (not parsing or loading).
    pub warnings: Vec<Warning>,
    /// Whether this document was extracted inline from a host document.
    pub is_inline: bool,
}

impl ScannedDocument {
    /// Creates a new scanned document.
    pub fn new(
        document: ParsedDocument,
        features: Vec<ScannedFeature>,
        warnings: Vec<Warning>,
        is_inline: bool,
    ) -> Self {
        Self {
            document,
            features,
            warnings,
            is_inline,
        }
    }

    /// Produces a flattened feature stream: for each feature, if it is a
    /// populated [`ScannedInlineDocument`], its sub-document's nested
    /// features are spliced in instead of the marker, each carrying the
    /// inline document's own contents and [`LocationOffset`] so a caller can
    /// translate its span back into host-file coordinates. Stops at
    /// [`ScannedImport`] boundaries — imports are followed via the import
    /// graph, not inlined into this stream.
    pub fn nested_features(&self) -> Vec<NestedFeature> {
        self.nested_features_from(Arc::from(self.document.contents.as_str()), LocationOffset::none())
    }

    /// The recursive worker behind [`ScannedDocument::nested_features`],
    /// carrying the (contents, offset) pair of whichever document `self`
    /// itself is, so features local to `self` are tagged with it.
    fn nested_features_from(&self, contents: Arc<str>, location_offset: LocationOffset) -> Vec<NestedFeature> {
        let mut out = Vec::new();
        for feature in &self.features {
            match feature.inline_scanned_document() {
                Some(nested) => {
                    let nested_offset = match feature {
                        ScannedFeature::InlineDocument(inline) => inline.location_offset,
                        _ => location_offset,
                    };
                    let nested_contents: Arc<str> = Arc::from(nested.document.contents.as_str());
                    out.extend(nested.nested_features_from(nested_contents, nested_offset));
                }
                None => out.push(NestedFeature {
                    feature: feature.clone(),
                    contents: contents.clone(),
                    location_offset,
                }),
            }
        }
        out
    }
}

/// A [`ScannedFeature`] paired with the contents and [`LocationOffset`] of
/// the document it was actually scanned from, which for a feature spliced in
/// from an inline `<script>`/`<style>` body is that inline document's own
/// extracted text, not the host document's.
#[derive(Debug, Clone)]
pub struct NestedFeature {
    /// The feature itself.
    pub feature: ScannedFeature,
    /// The contents the feature's span indexes into.
    pub contents: Arc<str>,
    /// The translation to apply when building a host-coordinate source range.
    pub location_offset: LocationOffset,
}

impl NestedFeature {
    /// The feature's span, within `contents`.
    pub fn span(&self) -> Span {
        self.feature.span()
    }
}

/// Scans a parsed document for one language, producing features and
/// warnings.
pub trait Scanner: Send + Sync {
    /// The language this scanner applies to.
    fn language(&self) -> Language;

    /// Runs the scan, appending found features and warnings to the given
    /// accumulators.
    fn scan(&self, parsed: &ParsedDocument, offset: LocationOffset, out: &mut Vec<ScannedFeature>, warnings: &mut Vec<Warning>);
}

/// A registry of scanners, keyed by language, run in registration order.
#[derive(Default)]
pub struct ScannerRegistry {
    /// Scanners grouped by the language they apply to.
    scanners: std::collections::HashMap<Language, Vec<Arc<dyn Scanner>>>,
}

impl ScannerRegistry {
    /// Creates a registry with the default scanners installed.
    pub fn with_defaults() -> Self {
        let mut registry = Self::default();
        registry.register(Arc::new(HtmlImportScanner::new()));
        registry.register(Arc::new(HtmlInlineDocumentScanner));
        registry.register(Arc::new(HtmlDomModuleScanner));
        registry.register(Arc::new(HtmlElementScanner));
        registry.register(Arc::new(JsImportScanner));
        registry.register(Arc::new(JsPolymerElementScanner));
        registry.register(Arc::new(JsBehaviorScanner));
        registry.register(Arc::new(JsNamespaceScanner));
        registry.register(Arc::new(JsFunctionScanner));
        registry.register(Arc::new(JsReferenceScanner));
        registry
    }

    /// Registers a scanner under its language, appended after any already
    /// registered for that language.
    pub fn register(&mut self, scanner: Arc<dyn Scanner>) {
        self.scanners.entry(scanner.language()).or_default().push(scanner);
    }

    /// Runs every registered scanner for `parsed`'s language, in
    /// registration order, and attaches `attached_comment` to the first
    /// element-like feature found, per the contract in §4.2.
    pub fn scan(
        &self,
        parsed: &ParsedDocument,
        offset: LocationOffset,
        attached_comment: Option<String>,
    ) -> (Vec<ScannedFeature>, Vec<Warning>) {
        let mut features = Vec::new();
        let mut warnings = Vec::new();

        if let Some(scanners) = self.scanners.get(&parsed.ast.language()) {
            for scanner in scanners {
                scanner.scan(parsed, offset, &mut features, &mut warnings);
            }
        }

        if let Some(comment) = attached_comment {
            if let Some(first_element) = features.iter_mut().find(|f| f.kinds().contains(&"element")) {
                match first_element {
                    ScannedFeature::Element(e) => e.doc = Some(comment),
                    ScannedFeature::PolymerElement(p) => p.doc = Some(comment),
                    _ => unreachable!("kinds() guarantees an element-like variant"),
                }
            }
        }

        (features, warnings)
    }
}

/// HTML: scans `<link rel="import"|"lazy-import"|"stylesheet">` and
/// `<script src>` as import edges.
pub struct HtmlImportScanner {
    /// Matches an `href="..."`/`href='...'`/`href=...` attribute value.
    href_re: Regex,
    /// Matches a `src="..."`/`src='...'`/`src=...` attribute value.
    src_re: Regex,
}

impl HtmlImportScanner {
    /// Creates a new import scanner.
    pub fn new() -> Self {
        Self {
            href_re: Regex::new(r#"href\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).unwrap(),
            src_re: Regex::new(r#"src\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).unwrap(),
        }
    }

    /// Finds the span of an attribute's value text within `tag_span`,
    /// falling back to the whole tag span if the regex can't locate it
    /// (shouldn't happen, since the node already carries the parsed value).
    fn value_span(&self, re: &Regex, parsed: &ParsedDocument, tag_span: Span) -> Span {
        let tag_text = parsed.text(tag_span);
        re.captures(tag_text)
            .and_then(|caps| caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)))
            .map(|value| Span::from_offsets(tag_span.start() + value.start(), tag_span.start() + value.end()))
            .unwrap_or(tag_span)
    }
}

impl Default for HtmlImportScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner for HtmlImportScanner {
    fn language(&self) -> Language {
        Language::Html
    }

    fn scan(&self, parsed: &ParsedDocument, _offset: LocationOffset, out: &mut Vec<ScannedFeature>, _warnings: &mut Vec<Warning>) {
        for node in parsed.ast.nodes() {
            let kind = match node.kind {
                "link" => match node.attribute("rel") {
                    Some("import") => Some("html-import"),
                    Some("lazy-import") => Some("lazy-html-import"),
                    Some("stylesheet") => Some("html-style"),
                    _ => None,
                },
                "script" => node.attribute("src").map(|_| "html-script"),
                _ => None,
            };

            let Some(kind) = kind else { continue };
            let (url, url_span) = match node.attribute("href") {
                Some(url) => (url, self.value_span(&self.href_re, parsed, node.span)),
                None => match node.attribute("src") {
                    Some(url) => (url, self.value_span(&self.src_re, parsed, node.span)),
                    None => continue,
                },
            };

            out.push(ScannedFeature::Import(ScannedImport::new(
                kind,
                node.span,
                url_span,
                url.to_string(),
            )));
        }
    }
}

/// HTML: extracts `<script>`/`<style>` bodies without a `src`/`href` into
/// inline sub-documents.
pub struct HtmlInlineDocumentScanner;

impl Scanner for HtmlInlineDocumentScanner {
    fn language(&self) -> Language {
        Language::Html
    }

    fn scan(&self, parsed: &ParsedDocument, _offset: LocationOffset, out: &mut Vec<ScannedFeature>, _warnings: &mut Vec<Warning>) {
        for node in parsed.ast.nodes() {
            let kind = match node.kind {
                "script" if node.attribute("src").is_none() => "js",
                "style" => "css",
                _ => continue,
            };

            let Some(text) = &node.text else { continue };
            let body_span = node
                .children
                .first()
                .map(|c| c.span)
                .unwrap_or(node.span);

            let position = parsed.contents[..body_span.start()].lines().count().saturating_sub(1) as u32;
            let column_start = parsed.contents[..body_span.start()]
                .rfind('\n')
                .map(|i| body_span.start() - i - 1)
                .unwrap_or(body_span.start()) as u32;

            let location_offset = LocationOffset::new(position, column_start);
            out.push(ScannedFeature::InlineDocument(ScannedInlineDocument::new(
                kind,
                body_span,
                text.clone(),
                location_offset,
            )));
        }
    }
}

/// HTML: records `<dom-module>` elements by id.
pub struct HtmlDomModuleScanner;

impl Scanner for HtmlDomModuleScanner {
    fn language(&self) -> Language {
        Language::Html
    }

    fn scan(&self, parsed: &ParsedDocument, _offset: LocationOffset, out: &mut Vec<ScannedFeature>, _warnings: &mut Vec<Warning>) {
        for node in parsed.ast.nodes() {
            if node.kind != "dom-module" {
                continue;
            }
            out.push(ScannedFeature::DomModule(ScannedDomModule {
                id: node.attribute("id").map(str::to_string),
                span: node.span,
            }));
        }
    }
}

/// HTML: records custom-element tags (`[a-z][a-z0-9]*-[a-z0-9-]*`).
pub struct HtmlElementScanner;

impl Scanner for HtmlElementScanner {
    fn language(&self) -> Language {
        Language::Html
    }

    fn scan(&self, parsed: &ParsedDocument, _offset: LocationOffset, out: &mut Vec<ScannedFeature>, _warnings: &mut Vec<Warning>) {
        for node in parsed.ast.nodes() {
            if node.kind != "custom-element" {
                continue;
            }
            if let Some(tag_name) = tag_name_from_span(parsed, node.span) {
                out.push(ScannedFeature::Element(ScannedElement {
                    tag_name,
                    span: node.span,
                    doc: None,
                }));
            }
        }
    }
}

/// Recovers a tag's name from its opening-tag span (the [`Node`] model
/// doesn't carry the tag name directly, only its kind tag).
fn tag_name_from_span(parsed: &ParsedDocument, span: Span) -> Option<String> {
    let text = parsed.text(span);
    let name_re = Regex::new(r"^<([a-zA-Z][a-zA-Z0-9-]*)").unwrap();
    name_re.captures(text).map(|c| c[1].to_ascii_lowercase())
}

/// JS: scans `import`/`require` forms as import edges.
pub struct JsImportScanner;

impl Scanner for JsImportScanner {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn scan(&self, parsed: &ParsedDocument, _offset: LocationOffset, out: &mut Vec<ScannedFeature>, _warnings: &mut Vec<Warning>) {
        for node in parsed.ast.nodes() {
            if node.kind != "import" {
                continue;
            }
            if let Some(source) = node.attribute("source") {
                out.push(ScannedFeature::Import(ScannedImport::new(
                    "js-import",
                    node.span,
                    node.span,
                    source.to_string(),
                )));
            }
        }
    }
}

/// JS: scans `Polymer({is: '...', ...})` and `customElements.define(...)`
/// registrations.
pub struct JsPolymerElementScanner {
    /// Matches a `Polymer({...})` call, capturing the object literal body.
    polymer_call_re: Regex,
    /// Matches the `is: '...'` property inside an object literal.
    is_prop_re: Regex,
    /// Matches a `customElements.define('tag', ClassName)` call.
    define_re: Regex,
    /// Matches a `behaviors: [...]` array, capturing its contents.
    behaviors_re: Regex,
    /// Matches a `properties: {...}` object, capturing its contents.
    properties_re: Regex,
}

impl JsPolymerElementScanner {
    /// Creates a new Polymer-element scanner.
    pub fn new() -> Self {
        Self {
            polymer_call_re: Regex::new(r"Polymer\(\s*\{").unwrap(),
            is_prop_re: Regex::new(r#"is\s*:\s*['"]([^'"]+)['"]"#).unwrap(),
            define_re: Regex::new(r#"customElements\.define\(\s*['"]([^'"]+)['"]\s*,\s*([A-Za-z_$][A-Za-z0-9_$]*)"#).unwrap(),
            behaviors_re: Regex::new(r"behaviors\s*:\s*\[([^\]]*)\]").unwrap(),
            properties_re: Regex::new(r"properties\s*:\s*\{([^}]*)\}").unwrap(),
        }
    }

    /// Extracts the object-literal body following a matched opening brace,
    /// respecting nested `{}` pairs.
    fn object_body<'a>(&self, contents: &'a str, open_brace_at: usize) -> &'a str {
        let bytes = contents.as_bytes();
        let mut depth = 0i32;
        let mut end = open_brace_at;
        for (i, &b) in bytes[open_brace_at..].iter().enumerate() {
            match b {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        end = open_brace_at + i;
                        break;
                    }
                }
                _ => {}
            }
        }
        &contents[open_brace_at..=end.max(open_brace_at)]
    }

    /// Parses a comma-separated identifier list (used for `behaviors: [...]`).
    fn identifier_list(&self, raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Parses property names out of a `properties: {...}` object body.
    fn property_names(&self, raw: &str) -> Vec<String> {
        let key_re = Regex::new(r"([A-Za-z_$][A-Za-z0-9_$]*)\s*:").unwrap();
        key_re.captures_iter(raw).map(|c| c[1].to_string()).collect()
    }
}

impl Default for JsPolymerElementScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner for JsPolymerElementScanner {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn scan(&self, parsed: &ParsedDocument, _offset: LocationOffset, out: &mut Vec<ScannedFeature>, _warnings: &mut Vec<Warning>) {
        let contents = &parsed.document_contents();

        for call in self.polymer_call_re.find_iter(contents) {
            let open_brace = call.end() - 1;
            let body = self.object_body(contents, open_brace);

            let Some(tag_name) = self.is_prop_re.captures(body).map(|c| c[1].to_string()) else {
                continue;
            };

            let behavior_assignments = self
                .behaviors_re
                .captures(body)
                .map(|c| self.identifier_list(&c[1]))
                .unwrap_or_default();
            let properties = self
                .properties_re
                .captures(body)
                .map(|c| self.property_names(&c[1]))
                .unwrap_or_default();

            out.push(ScannedFeature::PolymerElement(ScannedPolymerElement {
                tag_name,
                class_name: None,
                span: Span::from_offsets(call.start(), open_brace + body.len()),
                behavior_assignments,
                properties,
                doc: None,
            }));
        }

        for caps in self.define_re.captures_iter(contents) {
            let whole = caps.get(0).unwrap();
            out.push(ScannedFeature::PolymerElement(ScannedPolymerElement {
                tag_name: caps[1].to_string(),
                class_name: Some(caps[2].to_string()),
                span: Span::from_offsets(whole.start(), whole.end()),
                behavior_assignments: Vec::new(),
                properties: Vec::new(),
                doc: None,
            }));
        }
    }
}

/// JS: scans `Namespace.Behavior = {...}`-style behavior declarations.
pub struct JsBehaviorScanner {
    /// Matches a dotted-path assignment whose right-hand side opens an
    /// object literal, ending in `Behavior` by convention.
    behavior_re: Regex,
}

impl JsBehaviorScanner {
    /// Creates a new behavior scanner.
    pub fn new() -> Self {
        Self {
            behavior_re: Regex::new(r"([A-Za-z_$][A-Za-z0-9_$.]*Behaviors?)\s*=\s*\{").unwrap(),
        }
    }
}

impl Default for JsBehaviorScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner for JsBehaviorScanner {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn scan(&self, parsed: &ParsedDocument, _offset: LocationOffset, out: &mut Vec<ScannedFeature>, _warnings: &mut Vec<Warning>) {
        let contents = &parsed.document_contents();
        for caps in self.behavior_re.captures_iter(contents) {
            let whole = caps.get(0).unwrap();
            out.push(ScannedFeature::Behavior(ScannedBehavior {
                name: caps[1].to_string(),
                span: Span::from_offsets(whole.start(), whole.end()),
            }));
        }
    }
}

/// JS: scans `window.Foo = {}` / `Foo.Bar = {}` namespace declarations that
/// are not behaviors or Polymer elements.
pub struct JsNamespaceScanner {
    /// Matches a dotted-path assignment to an object literal.
    namespace_re: Regex,
}

impl JsNamespaceScanner {
    /// Creates a new namespace scanner.
    pub fn new() -> Self {
        Self {
            namespace_re: Regex::new(r"(?:window\.)?([A-Za-z_$][A-Za-z0-9_$]*(?:\.[A-Za-z_$][A-Za-z0-9_$]*)+)\s*=\s*\{").unwrap(),
        }
    }
}

impl Default for JsNamespaceScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner for JsNamespaceScanner {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn scan(&self, parsed: &ParsedDocument, _offset: LocationOffset, out: &mut Vec<ScannedFeature>, _warnings: &mut Vec<Warning>) {
        let contents = &parsed.document_contents();
        for caps in self.namespace_re.captures_iter(contents) {
            let name = caps[1].to_string();
            if name.ends_with("Behavior") || name.ends_with("Behaviors") {
                continue;
            }
            let whole = caps.get(0).unwrap();
            out.push(ScannedFeature::Namespace(ScannedNamespace {
                name,
                span: Span::from_offsets(whole.start(), whole.end()),
            }));
        }
    }
}

/// JS: scans top-level function declarations (reuses nodes the parser
/// already extracted).
pub struct JsFunctionScanner;

impl Scanner for JsFunctionScanner {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn scan(&self, parsed: &ParsedDocument, _offset: LocationOffset, out: &mut Vec<ScannedFeature>, _warnings: &mut Vec<Warning>) {
        for node in parsed.ast.nodes() {
            if node.kind != "function" {
                continue;
            }
            if let Some(name) = node.attribute("name") {
                out.push(ScannedFeature::Function(ScannedFunction {
                    name: name.to_string(),
                    span: node.span,
                }));
            }
        }
    }
}

/// JS: scans bare identifier references (reuses nodes the parser already
/// extracted).
pub struct JsReferenceScanner;

impl Scanner for JsReferenceScanner {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn scan(&self, parsed: &ParsedDocument, _offset: LocationOffset, out: &mut Vec<ScannedFeature>, _warnings: &mut Vec<Warning>) {
        for node in parsed.ast.nodes() {
            if node.kind != "reference" {
                continue;
            }
            if let Some(identifier) = &node.text {
                out.push(ScannedFeature::Reference(ScannedReference {
                    identifier: identifier.clone(),
                    span: node.span,
                }));
            }
        }
    }
}

impl ParsedDocument {
    /// Convenience accessor used by scanners operating on raw contents
    /// rather than the node list (e.g. regexes that need to see nested
    /// braces the flat [`Node`] model doesn't capture).
    fn document_contents(&self) -> &str {
        &self.contents
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parse::CssParser;
    use crate::parse::HtmlParser;
    use crate::parse::JavaScriptParser;
    use crate::parse::Parser as _;

    fn scan_html(contents: &str) -> (Vec<ScannedFeature>, Vec<Warning>) {
        let parsed = HtmlParser::new().parse(contents);
        ScannerRegistry::with_defaults().scan(&parsed, LocationOffset::none(), None)
    }

    fn scan_js(contents: &str) -> (Vec<ScannedFeature>, Vec<Warning>) {
        let parsed = JavaScriptParser::new().parse(contents);
        ScannerRegistry::with_defaults().scan(&parsed, LocationOffset::none(), None)
    }

    #[test]
    fn html_import_scanner_tags_lazy_imports() {
        let (features, _) = scan_html(r#"<link rel="lazy-import" href="./lazy.html">"#);
        assert!(matches!(&features[0], ScannedFeature::Import(i) if i.kind == "lazy-html-import"));
        assert!(!matches!(&features[0], ScannedFeature::Import(i) if i.is_eager()));
    }

    #[test]
    fn html_inline_scanner_extracts_script_body() {
        let (features, _) = scan_html("<script>var x = 1;</script>");
        let inline = features.iter().find(|f| f.kinds().contains(&"inline-document"));
        assert!(inline.is_some());
    }

    #[test]
    fn html_element_scanner_finds_custom_tags() {
        let (features, _) = scan_html("<my-widget></my-widget>");
        assert!(features.iter().any(|f| matches!(f, ScannedFeature::Element(e) if e.tag_name == "my-widget")));
    }

    #[test]
    fn js_polymer_scanner_reads_behaviors_and_properties() {
        let (features, _) = scan_js(
            "Polymer({ is: 'my-el', behaviors: [Foo.BarBehavior], properties: { name: String } });",
        );
        let element = features
            .iter()
            .find_map(|f| match f {
                ScannedFeature::PolymerElement(p) => Some(p),
                _ => None,
            })
            .unwrap();
        assert_eq!(element.tag_name, "my-el");
        assert_eq!(element.behavior_assignments, vec!["Foo.BarBehavior"]);
        assert_eq!(element.properties, vec!["name"]);
    }

    #[test]
    fn js_custom_elements_define_is_recognized() {
        let (features, _) = scan_js("customElements.define('my-el', MyElement);");
        assert!(features.iter().any(|f| matches!(f, ScannedFeature::PolymerElement(p) if p.tag_name == "my-el" && p.class_name.as_deref() == Some("MyElement"))));
    }

    #[test]
    fn js_behavior_scanner_finds_assignment() {
        let (features, _) = scan_js("Foo.BarBehavior = { properties: {} };");
        assert!(features.iter().any(|f| matches!(f, ScannedFeature::Behavior(b) if b.name == "Foo.BarBehavior")));
    }

    #[test]
    fn css_parser_and_scan_roundtrip_has_no_scanners_registered() {
        let parsed = CssParser::new().parse("@import './a.css';");
        let (features, _) = ScannerRegistry::with_defaults().scan(&parsed, LocationOffset::none(), None);
        assert!(features.is_empty());
    }

    #[test]
    fn nested_features_splices_inline_documents() {
        let parsed = HtmlParser::new().parse("<script>var x = 1;</script>");
        let (features, warnings) = ScannerRegistry::with_defaults().scan(&parsed, LocationOffset::none(), None);
        let mut host = ScannedDocument::new(parsed, features, warnings, false);

        let js_parsed = JavaScriptParser::new().parse("var x = 1;");
        let (js_features, js_warnings) = ScannerRegistry::with_defaults().scan(&js_parsed, LocationOffset::none(), None);
        let inline_scanned = Arc::new(ScannedDocument::new(js_parsed, js_features, js_warnings, true));

        if let ScannedFeature::InlineDocument(inline) = &mut host.features[0] {
            *inline.scanned_document.lock().unwrap() = Some(inline_scanned.clone());
        }

        let nested = host.nested_features();
        assert_eq!(nested.len(), inline_scanned.nested_features().len());
    }
}
