//! Bridge configuration: defaults the distilled spec calls out, loaded
//! from an optional per-project TOML file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::bridge::index::PruneStrategy;
use crate::bridge::insight::Category;
use crate::bridge::topic::TopicMapping;
use crate::paths;

/// How insights move from the in-memory buffer onto disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    OnWrite,
    #[default]
    OnSessionEnd,
    Periodic,
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub sync_mode: SyncMode,
    pub sync_interval: Duration,
    pub max_index_lines: usize,
    pub max_topic_file_lines: usize,
    pub prune_strategy: PruneStrategy,
    pub min_confidence: f64,
    pub topic_mapping: TopicMapping,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            sync_mode: SyncMode::default(),
            sync_interval: Duration::from_secs(300),
            max_index_lines: 180,
            max_topic_file_lines: 500,
            prune_strategy: PruneStrategy::default(),
            min_confidence: 0.0,
            topic_mapping: TopicMapping::default(),
        }
    }
}

/// Raw, on-disk shape of `.memory-bridge/config.toml`; every field is
/// optional so a partially-specified file only overrides what it names.
#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    sync_mode: Option<SyncMode>,
    sync_interval_secs: Option<u64>,
    max_index_lines: Option<usize>,
    max_topic_file_lines: Option<usize>,
    prune_strategy: Option<PruneStrategy>,
    min_confidence: Option<f64>,
    #[serde(default)]
    topic_mapping: HashMap<String, String>,
}

impl BridgeConfig {
    /// Load `.memory-bridge/config.toml` under `project_root`. A missing
    /// file yields the defaults; a malformed one is a Configuration error
    /// that fails construction outright.
    pub fn load(project_root: &Path) -> Result<Self> {
        let path = paths::project::config_path(project_root);
        if !path.exists() {
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let raw: RawConfig = toml::from_str(&text)
            .with_context(|| format!("malformed config file {}", path.display()))?;

        let mut config = Self::default();
        if let Some(mode) = raw.sync_mode {
            config.sync_mode = mode;
        }
        if let Some(secs) = raw.sync_interval_secs {
            config.sync_interval = Duration::from_secs(secs);
        }
        if let Some(n) = raw.max_index_lines {
            config.max_index_lines = n;
        }
        if let Some(n) = raw.max_topic_file_lines {
            config.max_topic_file_lines = n;
        }
        if let Some(strategy) = raw.prune_strategy {
            config.prune_strategy = strategy;
        }
        if let Some(min_confidence) = raw.min_confidence {
            config.min_confidence = min_confidence;
        }
        if !raw.topic_mapping.is_empty() {
            let mut overrides = HashMap::new();
            for (category_str, filename) in raw.topic_mapping {
                let category = Category::from_str_loose(&category_str).with_context(|| {
                    format!("unknown category '{category_str}' in topic_mapping")
                })?;
                overrides.insert(category, filename);
            }
            config.topic_mapping = TopicMapping::with_overrides(overrides);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_config_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = BridgeConfig::load(tmp.path()).unwrap();
        assert_eq!(config.max_index_lines, 180);
        assert_eq!(config.sync_mode, SyncMode::OnSessionEnd);
    }

    #[test]
    fn config_file_overrides_only_named_fields() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join(".memory-bridge")).unwrap();
        std::fs::write(
            tmp.path().join(".memory-bridge/config.toml"),
            "max_index_lines = 42\nsync_mode = \"on-write\"\n",
        )
        .unwrap();

        let config = BridgeConfig::load(tmp.path()).unwrap();
        assert_eq!(config.max_index_lines, 42);
        assert_eq!(config.sync_mode, SyncMode::OnWrite);
        assert_eq!(config.max_topic_file_lines, 500, "unset fields keep defaults");
    }

    #[test]
    fn malformed_config_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join(".memory-bridge")).unwrap();
        std::fs::write(tmp.path().join(".memory-bridge/config.toml"), "not valid toml {{{").unwrap();

        assert!(BridgeConfig::load(tmp.path()).is_err());
    }

    #[test]
    fn topic_mapping_override_applies_to_named_category() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join(".memory-bridge")).unwrap();
        std::fs::write(
            tmp.path().join(".memory-bridge/config.toml"),
            "[topic_mapping]\ndebugging = \"bugs.md\"\n",
        )
        .unwrap();

        let config = BridgeConfig::load(tmp.path()).unwrap();
        assert_eq!(config.topic_mapping.filename(Category::Debugging), "bugs.md");
        assert_eq!(
            config.topic_mapping.filename(Category::Security),
            "security.md",
            "unmapped categories keep their default filename"
        );
    }
}
