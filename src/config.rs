//! Ambient analyzer configuration: `serde`-derived, kebab-case on the wire,
//! loadable from a TOML file or string.

use anyhow::Context;
use serde::Deserialize;
use serde::Serialize;
use url::Url;

/// Configuration for an [`crate::context::Analyzer`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AnalyzerConfig {
    /// The project root URL, used by the `external_packages` query filter
    /// (see [`crate::document::QueryOptions`]).
    #[serde(default)]
    pub root: Option<Url>,
    /// Bounds how many dependency scans run concurrently (via
    /// `buffer_unordered`). `None` means unbounded (`join_all`), which is
    /// the default.
    #[serde(default)]
    pub max_concurrent_scans: Option<usize>,
    /// Whether telemetry measurements are recorded.
    #[serde(default = "default_telemetry_enabled")]
    pub telemetry_enabled: bool,
}

/// The default for `telemetry-enabled`.
fn default_telemetry_enabled() -> bool {
    true
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            root: None,
            max_concurrent_scans: None,
            telemetry_enabled: true,
        }
    }
}

impl AnalyzerConfig {
    /// Parses a configuration from a TOML string.
    pub fn from_toml_str(toml: &str) -> anyhow::Result<Self> {
        toml::from_str(toml).context("failed to parse analyzer configuration")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_has_telemetry_enabled_and_no_root() {
        let config = AnalyzerConfig::default();
        assert!(config.telemetry_enabled);
        assert!(config.root.is_none());
        assert!(config.max_concurrent_scans.is_none());
    }

    #[test]
    fn parses_kebab_case_toml() {
        let config = AnalyzerConfig::from_toml_str(
            r#"
            root = "file:///project/"
            max-concurrent-scans = 4
            telemetry-enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.root.unwrap().as_str(), "file:///project/");
        assert_eq!(config.max_concurrent_scans, Some(4));
        assert!(!config.telemetry_enabled);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = AnalyzerConfig::from_toml_str("").unwrap();
        assert!(config.telemetry_enabled);
    }

    #[test]
    fn malformed_toml_surfaces_an_error() {
        let result = AnalyzerConfig::from_toml_str("not valid [[[ toml");
        assert!(result.is_err());
    }
}
