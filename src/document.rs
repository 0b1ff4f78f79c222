//! The resolved counterpart of [`crate::scan::ScannedDocument`].
//!
//! Resolution walks the scan's nested feature list once, building the
//! `features_by_kind`/`features_by_kind_and_id` indexes that queries are
//! served from afterward.

use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Weak;

use indexmap::IndexMap;
use indexmap::IndexSet;
use url::Url;
use uuid::Uuid;

use crate::diagnostic::Warning;
use crate::feature::Feature;
use crate::scan::ScannedDocument;
use crate::scan::ScannedFeature;

/// Options controlling how a document's queries traverse its import graph.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryOptions {
    /// If true, union results across all transitively imported documents;
    /// if false, only the document's own local features are considered.
    pub imported: bool,
    /// If true, `lazy-html-import` edges are followed too when `imported`
    /// is set.
    pub lazy_imports: bool,
    /// If true, include features from documents outside the configured
    /// project root; if false, filter them out.
    pub external_packages: bool,
}

impl QueryOptions {
    /// The default options: local-only, no lazy imports, no external
    /// packages.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with `imported` set.
    pub fn imported(mut self, imported: bool) -> Self {
        self.imported = imported;
        self
    }

    /// Returns a copy with `lazy_imports` set.
    pub fn lazy_imports(mut self, lazy_imports: bool) -> Self {
        self.lazy_imports = lazy_imports;
        self
    }

    /// Returns a copy with `external_packages` set.
    pub fn external_packages(mut self, external_packages: bool) -> Self {
        self.external_packages = external_packages;
        self
    }
}

/// The resolution state machine's two transitioning flags.
#[derive(Debug, Default)]
struct ResolutionState {
    /// Transitions false→true exactly once, at the start of `resolve()`.
    begun_resolving: AtomicBool,
    /// Transitions false→true exactly once, at the end of `resolve()`.
    done_resolving: AtomicBool,
}

/// A resolved document: the originating [`ScannedDocument`], its resolved
/// local feature set, and the indexes built over that set.
pub struct Document {
    /// A fresh id assigned at construction; changes on every re-analysis so
    /// callers can cheaply detect "did this document actually change"
    /// without a deep comparison.
    id: Uuid,
    /// The canonical URL this document was analyzed from.
    url: Arc<Url>,
    /// A lookup-only back-reference to the owning analyzer's document
    /// cache, used by transitive queries to resolve import edges. Never an
    /// ownership edge (that would make every document keep its whole
    /// generation alive).
    resolver: Weak<dyn DocumentResolver>,
    /// The scan this document resolves.
    scanned: Arc<ScannedDocument>,
    /// The resolved local feature set.
    features: Vec<Arc<Feature>>,
    /// kind → features of that kind.
    features_by_kind: IndexMap<&'static str, Vec<Arc<Feature>>>,
    /// kind → identifier → features of that kind with that identifier.
    features_by_kind_and_id: IndexMap<(&'static str, String), Vec<Arc<Feature>>>,
    /// Warnings accumulated during resolution (in addition to the scan's
    /// own warnings).
    warnings: Vec<Warning>,
    /// The two-phase resolution flags.
    state: ResolutionState,
}

/// A lookup-only interface a [`Document`] uses to resolve import edges
/// during a transitive query, implemented by [`crate::context::Analyzer`].
///
/// Kept separate from a concrete `Analyzer` reference so that `document.rs`
/// does not need to know about context orchestration, only about how to
/// look a URL's already-analyzed document up.
pub trait DocumentResolver: Send + Sync {
    /// Gets the already-analyzed document for `url`, if one exists in the
    /// current generation.
    fn get_analyzed(&self, url: &Url) -> Option<Arc<Document>>;

    /// Determines whether `url` lies outside the configured project root.
    fn is_external_package(&self, url: &Url) -> bool;
}

impl Document {
    /// Constructs an unresolved document over the given scan. Call
    /// [`Document::resolve`] to populate its feature set.
    pub fn new(url: Arc<Url>, scanned: Arc<ScannedDocument>, resolver: Weak<dyn DocumentResolver>) -> Self {
        Self {
            id: Uuid::new_v4(),
            url,
            resolver,
            scanned,
            features: Vec::new(),
            features_by_kind: IndexMap::new(),
            features_by_kind_and_id: IndexMap::new(),
            warnings: Vec::new(),
            state: ResolutionState::default(),
        }
    }

    /// The document's id, a fresh UUID per construction.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The document's canonical URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The originating scan.
    pub fn scanned(&self) -> &Arc<ScannedDocument> {
        &self.scanned
    }

    /// Whether resolution has begun (possibly not yet finished — see the
    /// early-exit guard in [`Document::resolve`]).
    pub fn begun_resolving(&self) -> bool {
        self.state.begun_resolving.load(Ordering::Acquire)
    }

    /// Whether resolution has completed.
    pub fn done_resolving(&self) -> bool {
        self.state.done_resolving.load(Ordering::Acquire)
    }

    /// Runs resolution: walks the scanned document's nested features and
    /// resolves each into the local feature set, then builds the derived
    /// indexes.
    ///
    /// Guarded per the two-phase state machine: if resolution has already
    /// begun (whether still in progress or finished), this is a no-op. This
    /// is how recursive resolution via cyclic imports terminates — whichever
    /// document's `resolve()` is entered first marks itself `Resolving`
    /// before recursing into its dependencies, so when the cycle loops back
    /// around to it, the early exit lets the outer call continue.
    pub fn resolve(&mut self) {
        if self.state.begun_resolving.swap(true, Ordering::AcqRel) {
            return;
        }

        let mut behaviors_by_name = std::collections::HashMap::new();
        let mut identifier_counts: std::collections::HashMap<String, u32> = std::collections::HashMap::new();

        // First pass: behaviors must be indexed before any polymer element
        // resolves its `behaviors: [...]` assignments against them, and every
        // other nameable feature's identifiers are tallied up front so that
        // `Reference`s (which can appear before or after the thing they name)
        // can be looked up with `get_only_at_id` semantics in the second pass.
        for nested in self.scanned.nested_features() {
            let feature = &nested.feature;
            match feature {
                ScannedFeature::Behavior(scanned) => {
                    let source_range =
                        self.source_range_for(&nested.contents, nested.location_offset, feature.span());
                    if let Feature::Behavior(behavior) = crate::feature::resolve_behavior(scanned, source_range) {
                        behaviors_by_name.insert(scanned.name.clone(), Arc::new(behavior));
                    }
                    *identifier_counts.entry(scanned.name.clone()).or_default() += 1;
                }
                ScannedFeature::Namespace(scanned) => {
                    *identifier_counts.entry(scanned.name.clone()).or_default() += 1;
                }
                ScannedFeature::Function(scanned) => {
                    *identifier_counts.entry(scanned.name.clone()).or_default() += 1;
                }
                ScannedFeature::Element(scanned) => {
                    *identifier_counts.entry(scanned.tag_name.clone()).or_default() += 1;
                }
                ScannedFeature::PolymerElement(scanned) => {
                    *identifier_counts.entry(scanned.tag_name.clone()).or_default() += 1;
                    if let Some(class_name) = &scanned.class_name {
                        *identifier_counts.entry(class_name.clone()).or_default() += 1;
                    }
                }
                _ => {}
            }
        }

        for nested in self.scanned.nested_features() {
            let feature = &nested.feature;
            let source_range = self.source_range_for(&nested.contents, nested.location_offset, feature.span());

            let (resolved, mut warnings) = match feature {
                ScannedFeature::Import(scanned) => {
                    let url_source_range =
                        self.source_range_for(&nested.contents, nested.location_offset, scanned.url_span);

                    let mut import_warnings = Vec::new();
                    if let Some(message) = scanned.load_error.lock().unwrap().clone() {
                        import_warnings.push(Warning::error("could-not-load", message, url_source_range.clone()));
                    }

                    let target = self.url.join(&scanned.url).ok();
                    match target {
                        Some(target_url) => (
                            Some(crate::feature::resolve_import(scanned, Arc::new(target_url), url_source_range)),
                            import_warnings,
                        ),
                        None => (None, import_warnings),
                    }
                }
                ScannedFeature::Element(scanned) => {
                    (Some(crate::feature::resolve_element(scanned, source_range)), Vec::new())
                }
                ScannedFeature::PolymerElement(scanned) => {
                    let (feature, warnings) =
                        crate::feature::resolve_polymer_element(scanned, source_range, &behaviors_by_name);
                    (Some(feature), warnings)
                }
                ScannedFeature::Behavior(scanned) => {
                    (Some(crate::feature::resolve_behavior(scanned, source_range)), Vec::new())
                }
                ScannedFeature::Namespace(scanned) => {
                    (Some(crate::feature::resolve_namespace(scanned, source_range)), Vec::new())
                }
                ScannedFeature::Function(scanned) => {
                    (Some(crate::feature::resolve_function(scanned, source_range)), Vec::new())
                }
                ScannedFeature::DomModule(scanned) => {
                    (Some(crate::feature::resolve_dom_module(scanned, source_range)), Vec::new())
                }
                ScannedFeature::Reference(scanned) => {
                    let candidate = match identifier_counts.get(&scanned.identifier) {
                        Some(1) => Some(scanned.identifier.as_str()),
                        _ => None,
                    };
                    let (feature, warnings) = crate::feature::resolve_reference(scanned, source_range, candidate);
                    (Some(feature), warnings)
                }
                ScannedFeature::InlineDocument(_) => (None, Vec::new()),
            };

            self.warnings.append(&mut warnings);

            if let Some(resolved) = resolved {
                self.add_feature(Arc::new(resolved));
            }
        }

        self.state.done_resolving.store(true, Ordering::Release);
    }

    /// Builds a [`crate::diagnostic::SourceRange`] for a span within `contents`,
    /// which for a feature spliced in from an inline `<script>`/`<style>` body
    /// is that inline document's own extracted text, translated back to this
    /// document's coordinates via `location_offset`.
    fn source_range_for(
        &self,
        contents: &str,
        location_offset: crate::line_map::LocationOffset,
        span: crate::diagnostic::Span,
    ) -> crate::diagnostic::SourceRange {
        let map = crate::line_map::LineMap::new(contents, location_offset);
        let (start, end) = map.offsets_to_source_range(span);
        crate::diagnostic::SourceRange::new(self.url.clone(), start, end)
    }

    /// Adds a feature to the local set and updates both derived indexes.
    fn add_feature(&mut self, feature: Arc<Feature>) {
        for kind in feature.kinds() {
            self.features_by_kind.entry(kind).or_default().push(feature.clone());
            for id in feature.identifiers() {
                self.features_by_kind_and_id
                    .entry((*kind, id.to_string()))
                    .or_default()
                    .push(feature.clone());
            }
        }
        self.features.push(feature);
    }

    /// Features whose `kinds` contains `kind`.
    pub fn get_by_kind(&self, kind: &str, opts: QueryOptions) -> Vec<Arc<Feature>> {
        self.transitive_query(opts, &|doc| {
            doc.features_by_kind.get(kind).cloned().unwrap_or_default()
        })
    }

    /// Features of `kind` whose `identifiers` contains `id`.
    pub fn get_by_id(&self, kind: &str, id: &str, opts: QueryOptions) -> Vec<Arc<Feature>> {
        let key = (leak_kind(kind), id.to_string());
        self.transitive_query(opts, &|doc| {
            doc.features_by_kind_and_id.get(&key).cloned().unwrap_or_default()
        })
    }

    /// Returns the single feature of `kind`/`id`, or `None` if zero or more
    /// than one exist.
    pub fn get_only_at_id(&self, kind: &str, id: &str, opts: QueryOptions) -> Option<Arc<Feature>> {
        let mut matches = self.get_by_id(kind, id, opts);
        if matches.len() == 1 {
            matches.pop()
        } else {
            None
        }
    }

    /// All local (or transitively imported, per `opts`) features.
    pub fn get_features(&self, opts: QueryOptions) -> Vec<Arc<Feature>> {
        self.transitive_query(opts, &|doc| doc.features.clone())
    }

    /// All local (or transitively imported, per `opts`) warnings: both the
    /// scan's own warnings and ones raised during resolution.
    pub fn get_warnings(&self, opts: QueryOptions) -> Vec<Warning> {
        let mut combined = self.scanned.warnings.clone();
        combined.extend(self.warnings.iter().cloned());

        if !opts.imported {
            return combined;
        }

        let mut out = combined;
        for imported in self.transitive_imports(opts) {
            out.extend(imported.scanned.warnings.iter().cloned());
            out.extend(imported.warnings.iter().cloned());
        }
        out
    }

    /// Runs `extract` against this document and, if `opts.imported`, every
    /// transitively imported document, deduplicating by document identity
    /// (`Arc` pointer equality) rather than URL so the same document
    /// reached via two import edges isn't double-counted.
    fn transitive_query(
        &self,
        opts: QueryOptions,
        extract: &dyn Fn(&Document) -> Vec<Arc<Feature>>,
    ) -> Vec<Arc<Feature>> {
        let mut out = extract(self);

        if opts.imported {
            for imported in self.transitive_imports(opts) {
                out.extend(extract(&imported));
            }
        }

        out
    }

    /// Breadth-first walks this document's import edges (eager always;
    /// lazy too if `opts.lazy_imports`), filtering external packages unless
    /// `opts.external_packages`, deduplicated by document identity via the
    /// document id recorded in the visited set.
    fn transitive_imports(&self, opts: QueryOptions) -> Vec<Arc<Document>> {
        let Some(resolver) = self.resolver.upgrade() else {
            return Vec::new();
        };

        let mut visited_ids: HashSet<Uuid> = HashSet::new();
        visited_ids.insert(self.id);

        let mut out = Vec::new();
        let mut queue: std::collections::VecDeque<Arc<Document>> = std::collections::VecDeque::new();

        for feature in &self.features {
            if let Feature::Import(import) = feature.as_ref() {
                if !opts.lazy_imports && import.kind == "lazy-html-import" {
                    continue;
                }
                if let Some(doc) = resolver.get_analyzed(&import.url) {
                    queue.push_back(doc);
                }
            }
        }

        while let Some(doc) = queue.pop_front() {
            if !visited_ids.insert(doc.id) {
                continue;
            }
            if !opts.external_packages && resolver.is_external_package(&doc.url) {
                continue;
            }

            for feature in &doc.features {
                if let Feature::Import(import) = feature.as_ref() {
                    if !opts.lazy_imports && import.kind == "lazy-html-import" {
                        continue;
                    }
                    if let Some(next) = resolver.get_analyzed(&import.url) {
                        queue.push_back(next);
                    }
                }
            }

            out.push(doc);
        }

        out
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id)
            .field("url", &self.url.as_str())
            .field("features", &self.features.len())
            .field("begun_resolving", &self.begun_resolving())
            .field("done_resolving", &self.done_resolving())
            .finish()
    }
}

/// Leaks a kind string into a `'static` reference so it can key
/// `features_by_kind_and_id` lookups against the `&'static str` kinds
/// stored there. Kind tags are drawn from a small, fixed vocabulary (see
/// [`crate::feature::Feature::kinds`]), so the total number of distinct
/// leaked strings over a program's lifetime is bounded, not unbounded.
fn leak_kind(kind: &str) -> &'static str {
    static INTERNED: std::sync::OnceLock<parking_lot::Mutex<IndexSet<&'static str>>> = std::sync::OnceLock::new();
    let interned = INTERNED.get_or_init(Default::default);
    let mut interned = interned.lock();
    if let Some(existing) = interned.iter().find(|s| **s == kind) {
        return existing;
    }
    let leaked: &'static str = Box::leak(kind.to_string().into_boxed_str());
    interned.insert(leaked);
    leaked
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::Ast;
    use crate::ast::ParsedDocument;
    use crate::line_map::LocationOffset;
    use crate::parse::HtmlParser;
    use crate::parse::Parser as _;
    use crate::scan::ScannerRegistry;

    struct NullResolver;
    impl DocumentResolver for NullResolver {
        fn get_analyzed(&self, _url: &Url) -> Option<Arc<Document>> {
            None
        }

        fn is_external_package(&self, _url: &Url) -> bool {
            false
        }
    }

    fn document_for(contents: &str) -> Document {
        let url = Arc::new(Url::parse("file:///a.html").unwrap());
        let parsed = HtmlParser::new().parse(contents);
        let (features, warnings) = ScannerRegistry::with_defaults().scan(&parsed, LocationOffset::none(), None);
        let scanned = Arc::new(ScannedDocument::new(parsed, features, warnings, false));
        let resolver: Arc<dyn DocumentResolver> = Arc::new(NullResolver);
        Document::new(url, scanned, Arc::downgrade(&resolver))
    }

    #[test]
    fn resolve_is_idempotent() {
        let mut doc = document_for("<my-el></my-el>");
        doc.resolve();
        assert!(doc.done_resolving());
        let count_after_first = doc.get_features(QueryOptions::new()).len();

        doc.resolve();
        assert_eq!(doc.get_features(QueryOptions::new()).len(), count_after_first);
    }

    #[test]
    fn get_by_kind_finds_custom_elements() {
        let mut doc = document_for("<my-el></my-el>");
        doc.resolve();
        let elements = doc.get_by_kind("element", QueryOptions::new());
        assert_eq!(elements.len(), 1);
    }

    #[test]
    fn get_only_at_id_returns_none_when_ambiguous_or_missing() {
        let mut doc = document_for("<my-el></my-el>");
        doc.resolve();
        assert!(doc.get_only_at_id("element", "missing-el", QueryOptions::new()).is_none());
        assert!(doc.get_only_at_id("element", "my-el", QueryOptions::new()).is_some());
    }

    #[test]
    fn reference_resolves_when_the_name_is_declared_exactly_once() {
        let url = Arc::new(Url::parse("file:///a.js").unwrap());
        let parsed = crate::parse::JavaScriptParser::new().parse("function doThing() {}\nconst other = doThing;");
        let (features, warnings) = ScannerRegistry::with_defaults().scan(&parsed, LocationOffset::none(), None);
        let scanned = Arc::new(ScannedDocument::new(parsed, features, warnings, false));
        let resolver: Arc<dyn DocumentResolver> = Arc::new(NullResolver);
        let mut doc = Document::new(url, scanned, Arc::downgrade(&resolver));
        doc.resolve();

        let references = doc.get_by_kind("reference", QueryOptions::new());
        let do_thing_refs: Vec<_> = references
            .iter()
            .filter_map(|f| match f.as_ref() {
                Feature::Reference(r) if r.identifier == "doThing" => Some(r.clone()),
                _ => None,
            })
            .collect();
        assert!(!do_thing_refs.is_empty());
        assert!(do_thing_refs.iter().all(|r| r.resolved_identifier.as_deref() == Some("doThing")));

        let const_ref = references.iter().find_map(|f| match f.as_ref() {
            Feature::Reference(r) if r.identifier == "const" => Some(r.clone()),
            _ => None,
        });
        assert!(const_ref.unwrap().resolved_identifier.is_none());
    }

    #[test]
    fn empty_json_ast_has_no_nodes() {
        let parsed = ParsedDocument::new(Ast::Json(serde_json::Value::Null), String::new());
        assert_eq!(parsed.ast.nodes().len(), 0);
    }
}
