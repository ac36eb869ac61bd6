//! Configuration types for taskmesh
//!
//! Read from a TOML file with kebab-case keys:
//!
//! ```toml
//! [graph]
//! tie-break = "first-seen"
//! lock-timeout-ms = 2000
//!
//! [store]
//! snapshot = "data/taskmesh.json"
//! ```
//!
//! Every key is optional; missing keys fall back to their defaults.

use crate::tasks::EngineOptions;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use taskmesh_task_graph::TieBreak;

/// Snapshot file used when neither the config nor the CLI names one.
pub const DEFAULT_SNAPSHOT: &str = "taskmesh.json";

/// Main configuration structure for taskmesh
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Dependency graph settings
    #[serde(default)]
    pub graph: GraphConfig,

    /// Storage settings
    #[serde(default)]
    pub store: StoreConfig,
}

/// Dependency graph settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct GraphConfig {
    /// Ordering of tasks that become ready together during order resolution
    #[serde(default)]
    pub tie_break: TieBreakPolicy,

    /// Milliseconds to wait for the graph lock; 0 waits forever
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            tie_break: TieBreakPolicy::default(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

const fn default_lock_timeout_ms() -> u64 {
    5_000
}

/// Tie-break policy as written in configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreakPolicy {
    /// Ascending task identifier
    #[default]
    Ascending,
    /// Order in which tasks first appear in the stored edge list
    FirstSeen,
}

impl From<TieBreakPolicy> for TieBreak {
    fn from(policy: TieBreakPolicy) -> Self {
        match policy {
            TieBreakPolicy::Ascending => Self::Ascending,
            TieBreakPolicy::FirstSeen => Self::FirstSeen,
        }
    }
}

/// Storage settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct StoreConfig {
    /// Path of the JSON snapshot file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<PathBuf>,
}

impl Config {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::configuration(e.to_string()))
    }

    /// Load configuration from a file that must exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(e, path, "read"))?;
        Self::from_toml_str(&text).map_err(|e| match e {
            Error::Configuration { message } => {
                Error::configuration(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    /// Load configuration from a file, or use defaults if it does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Engine options derived from the `[graph]` section.
    #[must_use]
    pub fn engine_options(&self) -> EngineOptions {
        let lock_timeout = match self.graph.lock_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };
        EngineOptions {
            tie_break: self.graph.tie_break.into(),
            lock_timeout,
        }
    }

    /// Snapshot path from the `[store]` section, or [`DEFAULT_SNAPSHOT`].
    #[must_use]
    pub fn snapshot_path(&self) -> PathBuf {
        self.store
            .snapshot
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.engine_options(), EngineOptions::default());
        assert_eq!(config.snapshot_path(), PathBuf::from(DEFAULT_SNAPSHOT));
    }

    #[test]
    fn parses_kebab_case_keys() {
        let config = Config::from_toml_str(
            r#"
            [graph]
            tie-break = "first-seen"
            lock-timeout-ms = 250

            [store]
            snapshot = "data/tasks.json"
            "#,
        )
        .unwrap();

        let options = config.engine_options();
        assert_eq!(options.tie_break, TieBreak::FirstSeen);
        assert_eq!(options.lock_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.snapshot_path(), PathBuf::from("data/tasks.json"));
    }

    #[test]
    fn zero_timeout_waits_forever() {
        let config = Config::from_toml_str("[graph]\nlock-timeout-ms = 0\n").unwrap();
        assert_eq!(config.engine_options().lock_timeout, None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::from_toml_str("[graph]\ntiebreak = \"ascending\"\n").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));

        let err = Config::from_toml_str("[graph]\ntie-break = \"random\"\n").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn load_reports_path_in_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("taskmesh.toml");
        std::fs::write(&path, "[graph\n").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("taskmesh.toml"));
    }

    #[test]
    fn load_or_default_tolerates_missing_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert!(Config::load(dir.path().join("absent.toml")).is_err());
    }
}
