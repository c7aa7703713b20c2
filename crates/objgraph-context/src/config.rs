//! Context configuration.

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for an `ObjectContext`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Deepest nesting a single merge may reach (`None` = unbounded)
    pub max_merge_depth: Option<usize>,
    /// Initial capacity of the context's object store
    pub registry_capacity: usize,
    /// Reject invalid descriptors when the context is created
    pub validate_descriptors: bool,
    /// Record local edits in the graph diff log
    pub record_graph_diffs: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_merge_depth: None,
            registry_capacity: 256,
            validate_descriptors: true,
            record_graph_diffs: true,
        }
    }
}

impl ContextConfig {
    /// Parse a JSON document. Missing fields take their default values.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("invalid context configuration")
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read context config {}", path.display()))?;
        Self::from_json_str(&text)
            .with_context(|| format!("failed to load context config {}", path.display()))
    }

    pub fn to_json_string(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize context configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ContextConfig::from_json_str(r#"{ "max_merge_depth": 64 }"#).unwrap();
        assert_eq!(config.max_merge_depth, Some(64));
        assert_eq!(config.registry_capacity, 256);
        assert!(config.validate_descriptors);
        assert!(config.record_graph_diffs);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        let written = ContextConfig {
            max_merge_depth: Some(8),
            registry_capacity: 16,
            validate_descriptors: false,
            record_graph_diffs: false,
        };
        file.write_all(written.to_json_string().unwrap().as_bytes())
            .expect("write config");

        let loaded = ContextConfig::load(file.path()).expect("load config");
        assert_eq!(loaded, written);
    }

    #[test]
    fn test_load_reports_path_and_cause() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("context.json");
        std::fs::write(&path, "{ not json").expect("write config");

        let err = ContextConfig::load(&path).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("context.json"));
        assert!(message.contains("invalid context configuration"));

        let missing = ContextConfig::load(dir.path().join("absent.json")).unwrap_err();
        assert!(missing.to_string().contains("failed to read"));
    }
}
