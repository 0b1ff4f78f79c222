//! Static analysis of web front-end document trees: HTML, JavaScript, CSS,
//! and JSON, cross-linked by imports, inline scripts/styles, and element
//! references.
//!
//! An [`context::Analyzer`] loads a document tree through a pluggable
//! [`url_source::UrlLoader`], parses and scans each document into the
//! feature graph described by [`scan`] and [`document`], and resolves that
//! graph into a queryable [`document::Document`], caching every stage so
//! that a single file change only re-does the work it invalidates.

pub mod ast;
pub mod cache;
pub mod config;
pub mod context;
pub mod diagnostic;
pub mod document;
pub mod feature;
pub mod line_map;
pub mod parse;
pub mod scan;
pub mod telemetry;
pub mod url_source;

pub use context::AnalysisError;
pub use context::Analyzer;
pub use context::AnalyzerOptions;
pub use diagnostic::Severity;
pub use diagnostic::Warning;
pub use document::Document;
pub use document::DocumentResolver;
pub use document::QueryOptions;
