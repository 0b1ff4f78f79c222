//! End-to-end tests against the public `Analyzer` API, covering import-graph
//! traversal scenarios that a single module's unit tests can't exercise on
//! their own.

use std::sync::Arc;

use canopy_analysis::context::Analyzer;
use canopy_analysis::context::AnalyzerOptions;
use canopy_analysis::document::QueryOptions;
use canopy_analysis::url_source::path_to_url;
use canopy_analysis::url_source::FsLoader;
use url::Url;

async fn write(dir: &tempfile::TempDir, name: &str, contents: &str) -> Url {
    let path = dir.path().join(name);
    tokio::fs::write(&path, contents).await.unwrap();
    path_to_url(&path).unwrap()
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
async fn polymer_element_is_found_by_id_through_an_eager_import() {
    let dir = tempfile::tempdir().unwrap();
    write(
        &dir,
        "behaviors.html",
        r#"<script>
            Polymer({
                is: 'my-el',
                behaviors: []
            });
        </script>"#,
    )
    .await;
    let root_url = write(&dir, "index.html", r#"<link rel="import" href="behaviors.html">"#).await;

    let analyzer = analyzer(&dir);
    let root = analyzer.analyze(&root_url, None).await.unwrap();

    // Not present locally: it lives in the imported document.
    assert!(root.get_only_at_id("polymer-element", "my-el", QueryOptions::new()).is_none());

    let found = root.get_only_at_id("polymer-element", "my-el", QueryOptions::new().imported(true));
    assert!(found.is_some(), "expected the imported document's Polymer element to be found transitively");
}

#[tokio::test]
async fn lazy_imports_are_excluded_unless_asked_for() {
    let dir = tempfile::tempdir().unwrap();
    let lazy_url = write(&dir, "lazy.html", "<lazy-el></lazy-el>").await;
    let root_url = write(&dir, "index.html", r#"<link rel="lazy-import" href="lazy.html">"#).await;

    let analyzer = analyzer(&dir);

    // The lazily-imported document must be analyzed on its own, since a
    // lazy import is never followed by the eager dependency-scan walk.
    analyzer.analyze(&lazy_url, None).await.unwrap();
    let root = analyzer.analyze(&root_url, None).await.unwrap();

    let default_opts = QueryOptions::new().imported(true);
    assert!(root.get_by_id("element", "lazy-el", default_opts).is_empty());

    let lazy_opts = QueryOptions::new().imported(true).lazy_imports(true);
    assert_eq!(root.get_by_id("element", "lazy-el", lazy_opts).len(), 1);
}
