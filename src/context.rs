//! Analysis context orchestration: `analyze` → `scan_url` → `scan_document`
//! → `scan_dependencies` → `make_document`.

use std::collections::HashMap;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::Weak;

use futures::future::BoxFuture;
use futures::future::FutureExt;
use futures::future::Shared;
use futures::stream::StreamExt;
use indexmap::IndexMap;
use tokio::sync::Mutex;
use tracing::debug;
use tracing::info;
use tracing::warn;
use url::Url;

use crate::ast::Language;
use crate::cache::get_importers_of;
use crate::cache::AnalysisCache;
use crate::cache::Slot;
use crate::config::AnalyzerConfig;
use crate::diagnostic::SourcePosition;
use crate::diagnostic::SourceRange;
use crate::diagnostic::Warning;
use crate::document::Document;
use crate::document::DocumentResolver;
use crate::parse::Parser;
use crate::parse::ParserRegistry;
use crate::scan::ScannedDocument;
use crate::scan::ScannedFeature;
use crate::scan::ScannerRegistry;
use crate::telemetry::Telemetry;
use crate::telemetry::TelemetryKind;
use crate::url_source::LoadError;
use crate::url_source::UrlLoader;
use crate::url_source::UrlResolver;

/// A failure of the root `analyze` call itself, as distinct from a per-file
/// problem (which instead becomes a [`Warning`] attached to a document).
///
/// Hand-rolled `Display`/`Error`, not `thiserror`-derived, matching the rest
/// of this crate's core diagnostic types.
#[derive(Debug)]
pub enum AnalysisError {
    /// The root document's file type could not be determined or has no
    /// registered parser.
    UnknownFileType(Url),
    /// The root document could not be loaded.
    Load(LoadError),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownFileType(url) => write!(f, "no parser registered for `{url}`"),
            Self::Load(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for AnalysisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::UnknownFileType(_) => None,
            Self::Load(err) => Some(err),
        }
    }
}

/// The result of scanning one URL: either it was already being scanned
/// upstack in this same BFS (import cycle) or a [`ScannedDocument`] for it.
#[derive(Debug, Clone)]
pub enum ScanOutcome {
    /// `url` is already on the current scan path; the caller upstack owns
    /// its result.
    Visited,
    /// `url` was scanned (successfully or not — a load failure still
    /// produces a `ScannedDocument` carrying a `could-not-load` warning).
    Scanned(Arc<ScannedDocument>),
}

/// Construction options for an [`Analyzer`].
pub struct AnalyzerOptions {
    /// The loader used to fetch document contents. Required.
    pub loader: Arc<dyn UrlLoader>,
    /// The resolver used to canonicalize URLs. Defaults to
    /// [`crate::url_source::IdentityResolver`].
    pub resolver: Option<Arc<dyn UrlResolver>>,
    /// The parser registry. Defaults to [`ParserRegistry::with_defaults`].
    pub parsers: Option<ParserRegistry>,
    /// The scanner registry. Defaults to [`ScannerRegistry::with_defaults`].
    pub scanners: Option<ScannerRegistry>,
    /// Additional import edges not statically visible in source, consulted
    /// by `get_importers_of` and by transitive queries under
    /// `lazy_imports`.
    pub lazy_edges: Option<HashMap<Url, Vec<Url>>>,
    /// Ambient configuration. Defaults to [`AnalyzerConfig::default`].
    pub config: Option<AnalyzerConfig>,
}

/// The analysis engine: orchestrates parse → scan → dependency-scan →
/// analyze over one cache generation.
pub struct Analyzer {
    /// The loader, authoritative for all I/O.
    loader: Arc<dyn UrlLoader>,
    /// The URL resolver.
    resolver: Arc<dyn UrlResolver>,
    /// The parser registry.
    parsers: Arc<ParserRegistry>,
    /// The scanner registry.
    scanners: Arc<ScannerRegistry>,
    /// Lazy, not-statically-visible import edges.
    lazy_edges: HashMap<Url, Vec<Url>>,
    /// Ambient configuration.
    config: AnalyzerConfig,
    /// Per-operation timing.
    telemetry: Arc<Telemetry>,
    /// The current cache generation. The context is not `Sync` in the
    /// sense of safe concurrent entry from two callers at once; this
    /// `Mutex` exists to give the single logical thread of control a place
    /// to publish in-flight work before its first suspension, not to admit
    /// parallelism (see the concurrency discipline module docs).
    cache: Mutex<AnalysisCache>,
}

impl Analyzer {
    /// Creates a new analyzer, wrapped in `Arc` since document resolution
    /// holds a [`Weak`] back-reference to it.
    pub fn new(options: AnalyzerOptions) -> Arc<Self> {
        let config = options.config.unwrap_or_default();
        Arc::new(Self {
            loader: options.loader,
            resolver: options.resolver.unwrap_or_else(|| Arc::new(crate::url_source::IdentityResolver)),
            parsers: Arc::new(options.parsers.unwrap_or_else(ParserRegistry::with_defaults)),
            scanners: Arc::new(options.scanners.unwrap_or_else(ScannerRegistry::with_defaults)),
            lazy_edges: options.lazy_edges.unwrap_or_default(),
            telemetry: Arc::new(Telemetry::new(config.telemetry_enabled)),
            config,
            cache: Mutex::new(AnalysisCache::empty()),
        })
    }

    /// Returns a snapshot of every telemetry measurement recorded so far.
    pub fn telemetry_measurements(&self) -> Vec<crate::telemetry::Measurement> {
        self.telemetry.measurements()
    }

    /// Loads a URL's contents, bypassing nothing: this is the loader's raw
    /// result, used directly by `analyze` and exposed for callers who want
    /// to inspect a document's contents without triggering a full analysis.
    pub async fn load(&self, url: &Url) -> Result<String, LoadError> {
        let stopwatch = self.telemetry.start(TelemetryKind::Load, Arc::new(url.clone()));
        let result = self.loader.load(url).await;
        stopwatch.finish();
        result
    }

    /// Replaces the cache with an empty one at the next generation.
    pub async fn clear_caches(&self) {
        let mut cache = self.cache.lock().await;
        cache.clear();
    }

    /// Forks the cache to reflect an in-memory edit to `url`'s contents:
    /// computes `url`'s dependants via `get_importers_of` and drops both
    /// from every cache map, then re-analyzes `url` against the provided
    /// contents on the fresh generation.
    pub async fn analyze(self: &Arc<Self>, url: &Url, contents: Option<String>) -> Result<Arc<Document>, AnalysisError> {
        let resolved = self.resolver.resolve(url);

        if let Some(contents) = contents {
            self.file_changed(&resolved).await;
            return self.analyze_with_contents(resolved, contents).await;
        }

        if let Some(doc) = self.get_analyzed(&resolved) {
            return Self::root_load_result(resolved, doc);
        }

        // The root document's own load/language failures are the caller's
        // problem to react to, unlike a dependency's, which becomes a
        // `could-not-load` warning on the importing document instead. The
        // actual load happens inside `analyze_inner`/`scan_and_store`, behind
        // the `analyzed`/`scanned` caches' pending-slot publication, so two
        // concurrent `analyze` calls for the same uncached URL share one load
        // instead of each racing out to the loader.
        if language_for(&resolved).is_none() {
            return Err(AnalysisError::UnknownFileType(resolved));
        }

        let stopwatch = self.telemetry.start(TelemetryKind::Analyze, Arc::new(resolved.clone()));
        let result = self.analyze_inner(resolved.clone(), None).await;
        stopwatch.finish();

        Self::root_load_result(resolved, result?)
    }

    /// Recovers the root-vs-dependency error split after the fact: a root
    /// document that itself failed to load ends up as a `ScannedDocument`
    /// carrying a `could-not-load` warning on its own `scanned().warnings`
    /// (as opposed to one forwarded from a failed import, which lands on the
    /// importer's resolution-phase warnings instead), so this turns that
    /// case back into the `Err` a root caller should see.
    fn root_load_result(resolved: Url, document: Arc<Document>) -> Result<Arc<Document>, AnalysisError> {
        if let Some(warning) = document.scanned().warnings.iter().find(|w| w.code() == "could-not-load") {
            return Err(AnalysisError::Load(LoadError::new(
                resolved,
                anyhow::anyhow!(warning.message().to_string()),
            )));
        }
        Ok(document)
    }

    /// Forks the cache, dropping `url` and its computed dependants from all
    /// six maps.
    async fn file_changed(self: &Arc<Self>, url: &Url) {
        let dependants = {
            let cache = self.cache.lock().await;
            let documents: Vec<(Url, Arc<ScannedDocument>)> = cache
                .scanned_documents
                .iter()
                .filter_map(|(u, slot)| slot.ready().map(|doc| (u.clone(), doc.clone())))
                .collect();
            get_importers_of(url, documents.iter().map(|(u, d)| (u, d)))
        };

        info!(%url, dependants = dependants.len(), "file changed, forking analysis cache");

        let mut cache = self.cache.lock().await;
        *cache = cache.fork_invalidating(url, &dependants);
    }

    /// Runs `analyze` against explicitly provided contents, which bypasses
    /// the loader for this specific URL.
    async fn analyze_with_contents(self: &Arc<Self>, resolved: Url, contents: String) -> Result<Arc<Document>, AnalysisError> {
        let stopwatch = self.telemetry.start(TelemetryKind::Analyze, Arc::new(resolved.clone()));
        let result = self.analyze_inner(resolved, Some(contents)).await;
        stopwatch.finish();
        result
    }

    /// Gets an already-analyzed document from the current generation, if
    /// one exists.
    fn get_analyzed(self: &Arc<Self>, url: &Url) -> Option<Arc<Document>> {
        DocumentResolver::get_analyzed(self.as_ref(), url)
    }

    /// The core of `analyze`: check the analyzed-document cache, otherwise
    /// publish a pending slot, scan the URL, construct and resolve a
    /// [`Document`], store it, and return it.
    fn analyze_inner<'a>(
        self: &'a Arc<Self>,
        resolved: Url,
        contents: Option<String>,
    ) -> BoxFuture<'a, Result<Arc<Document>, AnalysisError>> {
        async move {
            let existing = {
                let mut cache = self.cache.lock().await;
                cache.analyzed.get(&resolved).cloned().or_else(|| {
                    let me = self.clone();
                    let url = resolved.clone();
                    let contents = contents.clone();
                    let shared = spawn_shared(async move { me.make_document(url, contents).await });
                    let slot = Arc::new(Slot::Pending(shared));
                    insert(&mut cache.analyzed, resolved.clone(), slot.clone());
                    Some(slot)
                })
            };

            // Publish before first suspension, then yield so any concurrent
            // caller entering `analyze` for the same URL observes the slot.
            tokio::task::yield_now().await;

            let document = match existing.unwrap().as_ref() {
                Slot::Ready(doc) => doc.clone(),
                Slot::Pending(fut) => fut.clone().await,
            };

            Ok(document)
        }
        .boxed()
    }

    /// Scans, constructs, and resolves a [`Document`] for `resolved`,
    /// storing it in `analyzed_documents`. Wrapped so its result can be
    /// published as a [`crate::cache::SharedFuture`].
    async fn make_document(self: Arc<Self>, resolved: Url, contents: Option<String>) -> Arc<Document> {
        let visited = Arc::new(Mutex::new(HashSet::new()));
        let scanned = match self.scan_url(resolved.clone(), contents, visited.clone()).await {
            ScanOutcome::Scanned(doc) => doc,
            ScanOutcome::Visited => unreachable!("the root URL cannot already be on its own scan path"),
        };

        let weak: Weak<dyn DocumentResolver> = Arc::downgrade(&self) as Weak<dyn DocumentResolver>;

        // Every document eagerly reachable from the root also needs its own
        // resolved `Document`, not just a `ScannedDocument`, so that an
        // `imported: true` query can follow `DocumentResolver::get_analyzed`
        // across the import edge. Done as a flat pass over what `scan_url`
        // already fully walked, rather than recursing through `analyze_inner`
        // again, since a cyclic import would otherwise await the very
        // in-flight `analyzed` slot this call is itself computing.
        let reachable: Vec<Url> = visited.lock().await.iter().cloned().collect();
        for url in reachable {
            if url == resolved {
                continue;
            }
            self.resolve_scanned_into_document(url, weak.clone()).await;
        }

        let mut document = Document::new(Arc::new(resolved.clone()), scanned, weak);
        document.resolve();
        let document = Arc::new(document);

        let mut cache = self.cache.lock().await;
        insert(&mut cache.analyzed_documents, resolved.clone(), Arc::new(Slot::Ready(document.clone())));
        insert(&mut cache.analyzed, resolved, Arc::new(Slot::Ready(document.clone())));

        document
    }

    /// Builds and resolves a [`Document`] for an already-scanned, eagerly
    /// imported URL, and stores it, unless one is already cached. A no-op if
    /// `url` was never actually scanned (e.g. a `could-not-load` placeholder
    /// is still scanned, so this only skips truly untouched URLs).
    async fn resolve_scanned_into_document(&self, url: Url, resolver: Weak<dyn DocumentResolver>) {
        {
            let cache = self.cache.lock().await;
            if cache.analyzed_documents.get(&url).and_then(|slot| slot.ready()).is_some() {
                return;
            }
        }

        let scanned = {
            let cache = self.cache.lock().await;
            cache.scanned_documents.get(&url).and_then(|slot| slot.ready().cloned())
        };
        let Some(scanned) = scanned else {
            return;
        };

        let mut document = Document::new(Arc::new(url.clone()), scanned, resolver);
        document.resolve();
        let document = Arc::new(document);

        let mut cache = self.cache.lock().await;
        insert(&mut cache.analyzed_documents, url.clone(), Arc::new(Slot::Ready(document.clone())));
        insert(&mut cache.analyzed, url, Arc::new(Slot::Ready(document)));
    }

    /// Scans `url`, deduplicating concurrent entry via `scanned`, then
    /// ensures its dependencies have been scanned in this generation.
    ///
    /// `visited` protects against import cycles: if `url` is already in the
    /// set, the sentinel [`ScanOutcome::Visited`] is returned immediately
    /// and the caller discards it — the document is being handled upstack.
    fn scan_url<'a>(
        self: &'a Arc<Self>,
        url: Url,
        contents: Option<String>,
        visited: Arc<Mutex<HashSet<Url>>>,
    ) -> BoxFuture<'a, ScanOutcome> {
        async move {
            {
                let mut visited = visited.lock().await;
                if visited.contains(&url) {
                    return ScanOutcome::Visited;
                }
                visited.insert(url.clone());
            }

            let slot = {
                let mut cache = self.cache.lock().await;
                match cache.scanned.get(&url).cloned() {
                    Some(slot) => slot,
                    None => {
                        let me = self.clone();
                        let u = url.clone();
                        let c = contents.clone();
                        let shared = spawn_shared(async move { me.scan_and_store(u, c).await });
                        let slot = Arc::new(Slot::Pending(shared));
                        insert(&mut cache.scanned, url.clone(), slot.clone());
                        slot
                    }
                }
            };

            tokio::task::yield_now().await;

            let scanned = match slot.as_ref() {
                Slot::Ready(doc) => doc.clone(),
                Slot::Pending(fut) => fut.clone().await,
            };

            self.scan_dependencies_of_toplevel_doc(url, scanned.clone(), visited).await;

            ScanOutcome::Scanned(scanned)
        }
        .boxed()
    }

    /// Loads, parses, and scans `url`, inserting the resulting
    /// [`ScannedDocument`] into `scanned_documents` (non-inline only,
    /// enforced here since this path is only reached for top-level URLs).
    /// Duplicate insertion is a contract violation per the error taxonomy's
    /// invariant-violation item — it would mean two scans raced past the
    /// pending-slot dedupe, which should be unreachable.
    async fn scan_and_store(self: Arc<Self>, url: Url, contents: Option<String>) -> Arc<ScannedDocument> {
        let loaded = match contents {
            Some(c) => Ok(c),
            None => self.load(&url).await,
        };

        let contents = match loaded {
            Ok(contents) => contents,
            Err(err) => {
                warn!(%url, error = %err, "failed to load document");
                return Arc::new(ScannedDocument::new(
                    crate::ast::ParsedDocument::new(crate::ast::Ast::Json(serde_json::Value::Null), String::new()),
                    Vec::new(),
                    vec![could_not_load_warning(&url, &err)],
                    false,
                ));
            }
        };

        let scanned = self.scan_document(&url, &contents, crate::line_map::LocationOffset::none(), None);

        let mut cache = self.cache.lock().await;
        let scanned = Arc::new(scanned);
        insert(&mut cache.scanned_documents, url, Arc::new(Slot::Ready(scanned.clone())));
        scanned
    }

    /// Parses `contents` for `url`'s inferred language and runs the scanner
    /// registry over the result.
    fn scan_document(
        &self,
        url: &Url,
        contents: &str,
        offset: crate::line_map::LocationOffset,
        attached_comment: Option<String>,
    ) -> ScannedDocument {
        let parse_stopwatch = self.telemetry.start(TelemetryKind::Parse, Arc::new(url.clone()));
        let language = language_for(url);
        let parsed = match language.and_then(|lang| self.parsers.get(lang)) {
            Some(parser) => parser.parse(contents),
            None => crate::ast::ParsedDocument::new(crate::ast::Ast::Json(serde_json::Value::Null), contents.to_string()),
        };
        parse_stopwatch.finish();

        let scan_stopwatch = self.telemetry.start(TelemetryKind::Scan, Arc::new(url.clone()));
        let (features, warnings) = self.scanners.scan(&parsed, offset, attached_comment);
        scan_stopwatch.finish();

        let is_inline = offset != crate::line_map::LocationOffset::none();
        ScannedDocument::new(parsed, features, warnings, is_inline)
    }

    /// For each feature that is an inline document or an import, schedules
    /// the appropriate recursion. Memoizes per URL via `dependencies_scanned`
    /// so repeated visits through import cycles don't re-walk.
    fn scan_dependencies_of_toplevel_doc<'a>(
        self: &'a Arc<Self>,
        url: Url,
        scanned: Arc<ScannedDocument>,
        visited: Arc<Mutex<HashSet<Url>>>,
    ) -> BoxFuture<'a, ()> {
        async move {
            let existing = {
                let mut cache = self.cache.lock().await;
                match cache.dependencies_scanned.get(&url).cloned() {
                    Some(slot) => Some(slot),
                    None => {
                        let me = self.clone();
                        let u = url.clone();
                        let v = visited.clone();
                        let s = scanned.clone();
                        let shared = spawn_shared(async move {
                            me.scan_dependencies(u, s, v).await;
                            Arc::new(())
                        });
                        let slot = Arc::new(Slot::Pending(shared));
                        insert(&mut cache.dependencies_scanned, url.clone(), slot.clone());
                        Some(slot)
                    }
                }
            };

            tokio::task::yield_now().await;

            if let Slot::Pending(fut) = existing.unwrap().as_ref() {
                fut.clone().await;
            }
        }
        .boxed()
    }

    /// Recurses into every inline document and eager import found in
    /// `scanned`'s feature list, in parallel. Bounded to
    /// `config.max_concurrent_scans` in-flight futures at a time via
    /// `buffer_unordered` when set, otherwise unbounded via `join_all` (the
    /// context is single-threaded cooperative, not multi-threaded —
    /// concurrency here means interleaving at await points, not parallel
    /// execution).
    async fn scan_dependencies(self: Arc<Self>, parent_url: Url, scanned: Arc<ScannedDocument>, visited: Arc<Mutex<HashSet<Url>>>) {
        let mut futures_list: Vec<BoxFuture<'_, ()>> = Vec::new();

        for feature in &scanned.features {
            match feature {
                ScannedFeature::InlineDocument(inline) => {
                    let me = self.clone();
                    let parent = parent_url.clone();
                    let contents = inline.contents.clone();
                    let offset = inline.location_offset;
                    let attached = inline.attached_comment.clone();
                    let slot = inline.scanned_document.clone();

                    futures_list.push(
                        async move {
                            let nested = me.scan_document(&parent, &contents, offset, attached);
                            let nested = Arc::new(nested);
                            // Stored before the enclosing future resolves, closing the
                            // race the original fire-and-forget continuation left open.
                            *slot.lock().unwrap() = Some(nested);
                        }
                        .boxed(),
                    );
                }
                ScannedFeature::Import(import) if import.is_eager() => {
                    let me = self.clone();
                    let parent = parent_url.clone();
                    let target = import.url.clone();
                    let slot = import.scanned_document.clone();
                    let load_error = import.load_error.clone();
                    let visited = visited.clone();

                    futures_list.push(
                        async move {
                            let Ok(resolved_target) = parent.join(&target) else {
                                return;
                            };
                            let resolved_target = me.resolver.resolve(&resolved_target);

                            // Assigned before returning from this function, not a
                            // detached continuation.
                            if let ScanOutcome::Scanned(doc) = me.scan_url(resolved_target, None, visited).await {
                                if let Some(warning) = doc.warnings.iter().find(|w| w.code() == "could-not-load") {
                                    *load_error.lock().unwrap() = Some(warning.message().to_string());
                                }
                                *slot.lock().unwrap() = Some(doc);
                            }
                        }
                        .boxed(),
                    );
                }
                _ => {}
            }
        }

        match self.config.max_concurrent_scans {
            Some(limit) if limit > 0 => {
                futures::stream::iter(futures_list)
                    .buffer_unordered(limit)
                    .collect::<Vec<()>>()
                    .await;
            }
            _ => {
                futures::future::join_all(futures_list).await;
            }
        }
    }

    /// Maps a URL to its lazy import targets, per the optional lazy-edge
    /// map supplied at construction.
    pub fn lazy_edges_for(&self, url: &Url) -> &[Url] {
        self.lazy_edges.get(url).map(Vec::as_slice).unwrap_or_default()
    }
}

impl DocumentResolver for Analyzer {
    fn get_analyzed(&self, url: &Url) -> Option<Arc<Document>> {
        let cache = self.cache.try_lock().ok()?;
        cache.analyzed_documents.get(url).and_then(|slot| slot.ready().cloned())
    }

    fn is_external_package(&self, url: &Url) -> bool {
        match &self.config.root {
            Some(root) => !url.as_str().starts_with(root.as_str()),
            None => false,
        }
    }
}

impl fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analyzer").finish_non_exhaustive()
    }
}

/// Infers a URL's language from its path's file extension.
fn language_for(url: &Url) -> Option<Language> {
    let path = url.path();
    let ext = path.rsplit('.').next()?;
    Language::from_extension(ext)
}

/// Builds the `could-not-load` error warning attached to the parent
/// document when an import or the root document fails to load.
fn could_not_load_warning(url: &Url, err: &LoadError) -> Warning {
    Warning::error(
        "could-not-load",
        format!("could not load `{url}`: {err}"),
        SourceRange::new(Arc::new(url.clone()), SourcePosition::new(0, 0), SourcePosition::new(0, 0)),
    )
}

/// Publishes an async computation as a cloneable, awaitable
/// [`crate::cache::SharedFuture`], boxing it so recursive orchestration
/// methods (which would otherwise produce an infinitely-sized future type)
/// can return a uniform, erased future.
fn spawn_shared<T, Fut>(fut: Fut) -> Shared<BoxFuture<'static, Arc<T>>>
where
    Fut: Future<Output = Arc<T>> + Send + 'static,
    T: Send + Sync + 'static,
{
    fut.boxed().shared()
}

/// Inserts `value` under `key`, producing a new map that shares every other
/// entry's `Arc` with the prior one (used instead of mutating the map
/// directly, keeping fork semantics uniform across all cache writes).
fn insert<T>(map: &mut Arc<IndexMap<Url, Arc<Slot<T>>>>, key: Url, value: Arc<Slot<T>>) {
    let mut next = (**map).clone();
    next.insert(key, value);
    *map = Arc::new(next);
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::url_source::FsLoader;

    async fn write(dir: &tempfile::TempDir, name: &str, contents: &str) -> Url {
        let path = dir.path().join(name);
        tokio::fs::write(&path, contents).await.unwrap();
        crate::url_source::path_to_url(&path).unwrap()
    }

    fn analyzer(dir: &tempfile::TempDir) -> Arc<Analyzer> {
        Analyzer::new(AnalyzerOptions {
            loader: Arc::new(FsLoader::new(dir.path())),
            resolver: None,
            parsers: None,
            scanners: None,
            lazy_edges: None,
            config: None,
        })
    }

    #[tokio::test]
    async fn analyze_respects_max_concurrent_scans() {
        let dir = tempfile::tempdir().unwrap();
        let b_url = write(&dir, "b.html", "<b-el></b-el>").await;
        let c_url = write(&dir, "c.html", "<c-el></c-el>").await;
        let a_url = write(
            &dir,
            "a.html",
            r#"<link rel="import" href="b.html"><link rel="import" href="c.html">"#,
        )
        .await;

        let analyzer = Analyzer::new(AnalyzerOptions {
            loader: Arc::new(FsLoader::new(dir.path())),
            resolver: None,
            parsers: None,
            scanners: None,
            lazy_edges: None,
            config: Some(AnalyzerConfig {
                max_concurrent_scans: Some(1),
                ..AnalyzerConfig::default()
            }),
        });

        let document = analyzer.analyze(&a_url, None).await.unwrap();
        assert!(analyzer.get_analyzed(&b_url).is_some());
        assert!(analyzer.get_analyzed(&c_url).is_some());
        assert!(document.get_warnings(crate::document::QueryOptions::new()).is_empty());
    }

    #[tokio::test]
    async fn analyze_resolves_cyclic_imports() {
        let dir = tempfile::tempdir().unwrap();
        let a_url = write(&dir, "a.html", r#"<link rel="import" href="b.html">"#).await;
        write(&dir, "b.html", r#"<link rel="import" href="a.html">"#).await;

        let analyzer = analyzer(&dir);
        let document = analyzer.analyze(&a_url, None).await.unwrap();

        assert!(document.done_resolving());
        let imports = document.get_by_kind("import", crate::document::QueryOptions::new());
        assert_eq!(imports.len(), 1);
    }

    #[tokio::test]
    async fn analyze_extracts_inline_script() {
        let dir = tempfile::tempdir().unwrap();
        let x_url = write(&dir, "x.html", "<script>var y = 1;</script>").await;

        let analyzer = analyzer(&dir);
        let document = analyzer.analyze(&x_url, None).await.unwrap();

        let nested = document.scanned().nested_features();
        assert!(!nested.is_empty());
    }

    #[tokio::test]
    async fn analyze_reports_could_not_load_warning() {
        let dir = tempfile::tempdir().unwrap();
        let p_url = write(&dir, "p.html", r#"<link rel="import" href="missing.html">"#).await;

        let analyzer = analyzer(&dir);
        let document = analyzer.analyze(&p_url, None).await.unwrap();

        let warnings = document.get_warnings(crate::document::QueryOptions::new());
        assert_eq!(
            warnings.iter().filter(|w| w.code() == "could-not-load").count(),
            1
        );
    }

    #[tokio::test]
    async fn analyze_reports_root_load_failure_as_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing_url = crate::url_source::path_to_url(&dir.path().join("missing.html")).unwrap();

        let analyzer = analyzer(&dir);
        let err = analyzer.analyze(&missing_url, None).await.unwrap_err();

        assert!(matches!(err, AnalysisError::Load(_)));
    }

    #[tokio::test]
    async fn analyze_is_idempotent_for_the_same_url() {
        let dir = tempfile::tempdir().unwrap();
        let url = write(&dir, "a.html", "<a-el></a-el>").await;

        let analyzer = analyzer(&dir);
        let first = analyzer.analyze(&url, None).await.unwrap();
        let second = analyzer.analyze(&url, None).await.unwrap();

        assert_eq!(first.id(), second.id());
    }

    #[tokio::test]
    async fn file_changed_invalidates_dependants() {
        let dir = tempfile::tempdir().unwrap();
        let a_url = write(&dir, "a.html", r#"<link rel="import" href="b.html">"#).await;
        write(&dir, "b.html", "<old-el></old-el>").await;

        let analyzer = analyzer(&dir);
        analyzer.analyze(&a_url, None).await.unwrap();

        let b_url = a_url.join("b.html").unwrap();
        let updated = analyzer.analyze(&b_url, Some("<new-el></new-el>".to_string())).await.unwrap();

        assert!(updated.get_by_id("element", "new-el", crate::document::QueryOptions::new()).is_some());
    }
}
