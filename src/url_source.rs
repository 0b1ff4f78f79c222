//! URL resolution and loading.
//!
//! Fetches a document's source either from the filesystem (for `file://`
//! URIs) or over HTTP (for `http`/`https` URIs, via a shared
//! `reqwest::Client`).

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reqwest::Client;
use tracing::debug;
use tracing::info;
use url::Url;

/// An error loading the contents of a URL.
#[derive(Debug)]
pub struct LoadError {
    /// The URL that failed to load.
    url: Url,
    /// The underlying cause.
    source: anyhow::Error,
}

impl LoadError {
    /// Creates a new load error.
    pub fn new(url: Url, source: anyhow::Error) -> Self {
        Self { url, source }
    }

    /// Gets the URL that failed to load.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to load `{url}`: {source}", url = self.url, source = self.source)
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.source()
    }
}

/// Resolves logical URLs (as written in source, e.g. a relative import path)
/// to the canonical form the cache keys on.
///
/// Absent a configured resolver, the [`IdentityResolver`] is used and URLs
/// pass through unchanged.
pub trait UrlResolver: Send + Sync {
    /// Determines if this resolver has an opinion about the given URL.
    fn can_resolve(&self, url: &Url) -> bool;

    /// Resolves the given URL to its canonical form.
    fn resolve(&self, url: &Url) -> Url;
}

/// The default resolver: every URL passes through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityResolver;

impl UrlResolver for IdentityResolver {
    fn can_resolve(&self, _url: &Url) -> bool {
        true
    }

    fn resolve(&self, url: &Url) -> Url {
        url.clone()
    }
}

/// A resolver that rewrites URLs under a package prefix to a different
/// on-disk or remote root, and passes everything else through unchanged.
///
/// This is the common "bare module specifier" shape: `components/foo/bar.html`
/// gets rewritten to sit under a package root before it is loaded.
#[derive(Debug, Clone)]
pub struct PackageRootResolver {
    /// The package roots, keyed by the path prefix that selects them.
    roots: HashMap<String, Url>,
}

impl PackageRootResolver {
    /// Creates a new, empty package root resolver.
    pub fn new() -> Self {
        Self { roots: HashMap::new() }
    }

    /// Registers a root for URLs beginning with the given path prefix.
    pub fn with_root(mut self, prefix: impl Into<String>, root: Url) -> Self {
        self.roots.insert(prefix.into(), root);
        self
    }
}

impl Default for PackageRootResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlResolver for PackageRootResolver {
    fn can_resolve(&self, url: &Url) -> bool {
        self.roots
            .keys()
            .any(|prefix| url.path().trim_start_matches('/').starts_with(prefix.as_str()))
    }

    fn resolve(&self, url: &Url) -> Url {
        let path = url.path().trim_start_matches('/');
        for (prefix, root) in &self.roots {
            if let Some(rest) = path.strip_prefix(prefix.as_str()) {
                if let Ok(resolved) = root.join(rest.trim_start_matches('/')) {
                    return resolved;
                }
            }
        }
        url.clone()
    }
}

/// Loads the textual contents of a URL.
///
/// Implementations MUST produce byte-identical results for identical URLs
/// within one cache generation — the analyzer caches on that assumption.
#[async_trait::async_trait]
pub trait UrlLoader: Send + Sync {
    /// Determines if this loader can load the given URL.
    fn can_load(&self, url: &Url) -> bool;

    /// Loads the contents of the given URL.
    async fn load(&self, url: &Url) -> Result<String, LoadError>;
}

/// Loads `file://` URLs from the local filesystem, relative to a package
/// root directory.
#[derive(Debug, Clone)]
pub struct FsLoader {
    /// The root directory new relative paths are resolved against; unused
    /// once a URL is already `file://`-absolute, which is the common case.
    root: PathBuf,
}

impl FsLoader {
    /// Creates a new filesystem loader rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Converts a `file://` URL to a local path, falling back to joining
    /// the path component onto the configured root for schemeless URLs.
    fn path_for(&self, url: &Url) -> PathBuf {
        url.to_file_path()
            .unwrap_or_else(|_| self.root.join(url.path().trim_start_matches('/')))
    }
}

#[async_trait::async_trait]
impl UrlLoader for FsLoader {
    fn can_load(&self, url: &Url) -> bool {
        url.scheme() == "file"
    }

    async fn load(&self, url: &Url) -> Result<String, LoadError> {
        let path = self.path_for(url);
        debug!(path = %path.display(), "reading document from disk");
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read `{path}`", path = path.display()))
            .map_err(|e| LoadError::new(url.clone(), e))
    }
}

/// Loads `http`/`https` URLs over the network.
#[derive(Debug, Clone)]
pub struct HttpLoader {
    /// The shared HTTP client.
    client: Client,
    /// The request timeout.
    timeout: Duration,
}

impl HttpLoader {
    /// The default request timeout, in seconds.
    const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Creates a new HTTP loader with the default timeout.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Creates a new HTTP loader with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            timeout,
        }
    }
}

impl Default for HttpLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl UrlLoader for HttpLoader {
    fn can_load(&self, url: &Url) -> bool {
        matches!(url.scheme(), "http" | "https")
    }

    async fn load(&self, url: &Url) -> Result<String, LoadError> {
        info!(%url, "downloading document");

        let send = async {
            let response = self
                .client
                .get(url.as_str())
                .timeout(self.timeout)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                anyhow::bail!("server returned HTTP status {status}");
            }

            response
                .text()
                .await
                .context("failed to read response body")
        };

        send.await.map_err(|e| LoadError::new(url.clone(), e))
    }
}

/// Composes multiple loaders, trying each in order and using the first whose
/// `can_load` returns true.
pub struct ChainLoader {
    /// The loaders to try, in order.
    loaders: Vec<Arc<dyn UrlLoader>>,
}

impl ChainLoader {
    /// Creates a new chain loader over the given loaders, in priority order.
    pub fn new(loaders: Vec<Arc<dyn UrlLoader>>) -> Self {
        Self { loaders }
    }
}

#[async_trait::async_trait]
impl UrlLoader for ChainLoader {
    fn can_load(&self, url: &Url) -> bool {
        self.loaders.iter().any(|loader| loader.can_load(url))
    }

    async fn load(&self, url: &Url) -> Result<String, LoadError> {
        for loader in &self.loaders {
            if loader.can_load(url) {
                return loader.load(url).await;
            }
        }

        Err(LoadError::new(
            url.clone(),
            anyhow::anyhow!("no configured loader can load this URL"),
        ))
    }
}

/// Joins a base URL and a relative reference the way scanners encounter them
/// (an `href`, `src`, or `@import` path), normalizing `.`/`..` segments.
pub fn join(base: &Url, reference: &str) -> Result<Url, url::ParseError> {
    let joined = base.join(reference)?;
    Ok(joined)
}

/// Converts a local filesystem path to a `file://` URL, cleaning `.`/`..`
/// segments first with `path-clean`: relative segments in a path would
/// otherwise confuse URL-keyed caches.
pub fn path_to_url(path: &Path) -> Option<Url> {
    let cleaned = path_clean::clean(path);
    Url::from_file_path(cleaned).ok()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn identity_resolver_passes_through() {
        let resolver = IdentityResolver;
        let url = Url::parse("file:///a/b.html").unwrap();
        assert_eq!(resolver.resolve(&url), url);
    }

    #[test]
    fn package_root_resolver_rewrites_prefixed_paths() {
        let root = Url::parse("file:///packages/foo/").unwrap();
        let resolver = PackageRootResolver::new().with_root("components/foo/", root);

        let url = Url::parse("file:///src/components/foo/foo.html").unwrap();
        assert!(resolver.can_resolve(&url));
        let resolved = resolver.resolve(&url);
        assert_eq!(resolved.as_str(), "file:///packages/foo/foo.html");
    }

    #[tokio::test]
    async fn fs_loader_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.html");
        tokio::fs::write(&path, "<p>hi</p>").await.unwrap();

        let loader = FsLoader::new(dir.path());
        let url = path_to_url(&path).unwrap();
        let contents = loader.load(&url).await.unwrap();
        assert_eq!(contents, "<p>hi</p>");
    }

    #[tokio::test]
    async fn fs_loader_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FsLoader::new(dir.path());
        let url = path_to_url(&dir.path().join("missing.html")).unwrap();
        let err = loader.load(&url).await.unwrap_err();
        assert_eq!(err.url(), &url);
    }

    #[tokio::test]
    async fn chain_loader_dispatches_by_scheme() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.html");
        tokio::fs::write(&path, "ok").await.unwrap();

        let chain = ChainLoader::new(vec![
            Arc::new(FsLoader::new(dir.path())),
            Arc::new(HttpLoader::new()),
        ]);

        let url = path_to_url(&path).unwrap();
        assert!(chain.can_load(&url));
        assert_eq!(chain.load(&url).await.unwrap(), "ok");
    }
}
