//! The analysis cache: the six URL-keyed maps behind an [`crate::context::Analyzer`].
//!
//! Each map is an `Arc`-wrapped [`IndexMap`]; producing a new generation that
//! drops a set of invalidated URLs is O(map size) in pointer copies (cloning
//! the index, not the cached values) rather than a deep clone, and handles
//! returned from a prior generation remain valid, untouched by later forks.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::future::Shared;
use indexmap::IndexMap;
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use tracing::debug;
use url::Url;

use crate::scan::ScannedDocument;
use crate::scan::ScannedFeature;

/// A future that resolves to a shared, reference-counted value, cloneable
/// so that every caller awaiting an in-flight operation observes the same
/// result (the "publish before first suspension" discipline of §5).
pub type SharedFuture<T> = Shared<BoxFuture<'static, Arc<T>>>;

/// The value behind one cache-map entry: either still being computed, or
/// already completed.
#[derive(Clone)]
pub enum Slot<T> {
    /// Work is in flight; awaiting the shared future yields the result.
    Pending(SharedFuture<T>),
    /// Work has completed.
    Ready(Arc<T>),
}

impl<T> Slot<T> {
    /// Gets the completed value, if this slot is ready.
    pub fn ready(&self) -> Option<&Arc<T>> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Pending(_) => None,
        }
    }
}

/// One of the cache's six URL-keyed maps.
pub type CacheMap<T> = Arc<IndexMap<Url, Arc<Slot<T>>>>;

/// Creates an empty [`CacheMap`].
fn empty_map<T>() -> CacheMap<T> {
    Arc::new(IndexMap::new())
}

/// Removes a set of URLs from a map, producing a new map that shares every
/// other entry's `Arc` with the original.
fn without<T>(map: &CacheMap<T>, remove: &HashSet<Url>) -> CacheMap<T> {
    if remove.is_empty() {
        return map.clone();
    }

    Arc::new(
        map.iter()
            .filter(|(url, _)| !remove.contains(*url))
            .map(|(url, slot)| (url.clone(), slot.clone()))
            .collect(),
    )
}

/// The analysis cache for one generation.
#[derive(Clone)]
pub struct AnalysisCache {
    /// URL → pending-or-resolved parse result.
    pub parsed: CacheMap<crate::ast::ParsedDocument>,
    /// URL → pending-or-resolved scan result.
    pub scanned: CacheMap<ScannedDocument>,
    /// URL → completed scanned document (top-level only).
    pub scanned_documents: CacheMap<ScannedDocument>,
    /// URL → pending-or-resolved dependency-scan completion.
    pub dependencies_scanned: CacheMap<()>,
    /// URL → pending-or-resolved analyzed document.
    pub analyzed: CacheMap<crate::document::Document>,
    /// URL → completed analyzed document.
    pub analyzed_documents: CacheMap<crate::document::Document>,
    /// Monotonically increasing generation counter; bumped on every fork
    /// and on `clear`.
    pub generation: u64,
}

impl AnalysisCache {
    /// Creates a new, empty cache at generation 0.
    pub fn empty() -> Self {
        Self {
            parsed: empty_map(),
            scanned: empty_map(),
            scanned_documents: empty_map(),
            dependencies_scanned: empty_map(),
            analyzed: empty_map(),
            analyzed_documents: empty_map(),
            generation: 0,
        }
    }

    /// Produces a new cache in which the union `{changed_url} ∪ dependants`
    /// has been removed from all six maps; every other entry is carried
    /// over by reference.
    pub fn fork_invalidating(&self, changed_url: &Url, dependants: &HashSet<Url>) -> Self {
        let mut remove = dependants.clone();
        remove.insert(changed_url.clone());

        debug!(
            %changed_url,
            invalidated = remove.len(),
            generation = self.generation + 1,
            "forking analysis cache"
        );

        Self {
            parsed: without(&self.parsed, &remove),
            scanned: without(&self.scanned, &remove),
            scanned_documents: without(&self.scanned_documents, &remove),
            dependencies_scanned: without(&self.dependencies_scanned, &remove),
            analyzed: without(&self.analyzed, &remove),
            analyzed_documents: without(&self.analyzed_documents, &remove),
            generation: self.generation + 1,
        }
    }

    /// Replaces the cache with an empty one at the next generation.
    pub fn clear(&mut self) {
        *self = Self {
            generation: self.generation + 1,
            ..Self::empty()
        };
    }
}

impl Default for AnalysisCache {
    fn default() -> Self {
        Self::empty()
    }
}

/// Computes the set of URLs whose scanned document transitively imports
/// `changed_url`.
///
/// Builds a transient [`DiGraphMap`] of import edges read out of the given
/// documents (each keyed by its own canonical URL, import targets resolved
/// relative to that key), then walks it with a breadth-first search from
/// `changed_url` over reversed edges. `DiGraphMap`'s own visited-set
/// semantics ensure this terminates even in the presence of import cycles.
pub fn get_importers_of<'a>(
    changed_url: &'a Url,
    documents: impl Iterator<Item = (&'a Url, &'a Arc<ScannedDocument>)>,
) -> HashSet<Url> {
    let documents: Vec<_> = documents.collect();

    // Import targets are freshly resolved (not borrowed from `documents`),
    // so they're collected into a Vec that outlives the graph built below,
    // letting the graph hold plain references into it instead of owned
    // `Url`s (which aren't `Copy`, so can't be `DiGraphMap` nodes directly).
    let mut owned_targets: Vec<Url> = Vec::new();
    let mut edges: Vec<(&'a Url, usize)> = Vec::new();

    for (url, document) in &documents {
        for nested in document.nested_features() {
            if let ScannedFeature::Import(import) = nested.feature {
                if let Ok(target) = url.join(&import.url) {
                    owned_targets.push(target);
                    edges.push((url, owned_targets.len() - 1));
                }
            }
        }
    }

    let mut graph: DiGraphMap<&Url, ()> = DiGraphMap::new();
    for (url, _) in &documents {
        graph.add_node(url);
    }
    graph.add_node(changed_url);
    for (source, target_index) in &edges {
        graph.add_edge(*source, &owned_targets[*target_index], ());
    }

    let mut visited: HashSet<Url> = HashSet::new();
    let mut seen: HashSet<Url> = HashSet::new();
    seen.insert(changed_url.clone());

    let mut queue: std::collections::VecDeque<&Url> = std::collections::VecDeque::new();
    queue.push_back(changed_url);

    while let Some(current) = queue.pop_front() {
        for importer in graph.neighbors_directed(current, Direction::Incoming) {
            if seen.insert(importer.clone()) {
                visited.insert(importer.clone());
                queue.push_back(importer);
            }
        }
    }

    visited
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::Ast;
    use crate::ast::ParsedDocument;
    use crate::parse::HtmlParser;
    use crate::parse::Parser as _;
    use crate::scan::ScannerRegistry;
    use crate::line_map::LocationOffset;

    fn scanned_document_with_import(target: &str) -> Arc<ScannedDocument> {
        let html = HtmlParser::new().parse(&format!(r#"<link rel="import" href="{target}">"#));
        let (features, warnings) = ScannerRegistry::with_defaults().scan(&html, LocationOffset::none(), None);
        Arc::new(ScannedDocument::new(html, features, warnings, false))
    }

    fn empty_scanned_document() -> Arc<ScannedDocument> {
        let html = ParsedDocument::new(Ast::Html(Vec::new()), String::new());
        Arc::new(ScannedDocument::new(html, Vec::new(), Vec::new(), false))
    }

    #[test]
    fn fork_invalidating_drops_changed_and_dependant_urls() {
        let mut cache = AnalysisCache::empty();
        let a = Url::parse("file:///a.html").unwrap();
        let b = Url::parse("file:///b.html").unwrap();
        let c = Url::parse("file:///c.html").unwrap();

        let doc = Arc::new(Slot::Ready(empty_scanned_document()));
        cache.scanned_documents = Arc::new(IndexMap::from_iter([
            (a.clone(), doc.clone()),
            (b.clone(), doc.clone()),
            (c.clone(), doc.clone()),
        ]));

        let mut dependants = HashSet::new();
        dependants.insert(b.clone());

        let forked = cache.fork_invalidating(&a, &dependants);
        assert!(!forked.scanned_documents.contains_key(&a));
        assert!(!forked.scanned_documents.contains_key(&b));
        assert!(forked.scanned_documents.contains_key(&c));
        assert_eq!(forked.generation, 1);

        cache.clear();
        assert_eq!(cache.generation, 1);
        assert!(cache.scanned_documents.is_empty());
    }

    #[test]
    fn get_importers_of_finds_transitive_importers() {
        let a = Url::parse("file:///a.html").unwrap();
        let b = Url::parse("file:///b.html").unwrap();
        let c = Url::parse("file:///c.html").unwrap();

        // a imports b, b imports c. Changing c should report a and b as importers.
        let doc_a = scanned_document_with_import("b.html");
        let doc_b = scanned_document_with_import("c.html");
        let doc_c = empty_scanned_document();

        let documents = vec![(&a, &doc_a), (&b, &doc_b), (&c, &doc_c)];
        let importers = get_importers_of(&c, documents.into_iter());

        assert!(importers.contains(&a));
        assert!(importers.contains(&b));
        assert!(!importers.contains(&c));
    }

    #[test]
    fn get_importers_of_terminates_on_cycles() {
        let a = Url::parse("file:///a.html").unwrap();
        let b = Url::parse("file:///b.html").unwrap();

        let doc_a = scanned_document_with_import("b.html");
        let doc_b = scanned_document_with_import("a.html");

        let documents = vec![(&a, &doc_a), (&b, &doc_b)];
        let importers = get_importers_of(&a, documents.into_iter());

        assert!(importers.contains(&b));
    }
}
