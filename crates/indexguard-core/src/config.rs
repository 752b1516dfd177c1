//! Runtime configuration, read from the environment.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::errors::IndexGuardError;
use crate::oracle::documents::InMemoryDocumentManager;
use crate::query::check_level::IndexCheckLevel;

pub const CHECK_LEVEL_ENV: &str = "INDEXGUARD_CHECK_LEVEL";
pub const BUSY_TIMEOUT_ENV: &str = "INDEXGUARD_BUSY_TIMEOUT_MS";
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// A check level named in configuration, before a document manager is bound.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CheckLevelSetting {
    #[default]
    Deleted,
    Modified,
    InMemory,
}

impl CheckLevelSetting {
    /// `InMemory` needs a document manager; without one it degrades to
    /// [`IndexCheckLevel::ModifiedFiles`].
    pub fn into_check_level(self, documents: Option<Arc<dyn InMemoryDocumentManager>>) -> IndexCheckLevel {
        match (self, documents) {
            (CheckLevelSetting::Deleted, _) => IndexCheckLevel::DeletedFiles,
            (CheckLevelSetting::Modified, _) => IndexCheckLevel::ModifiedFiles,
            (CheckLevelSetting::InMemory, Some(documents)) => IndexCheckLevel::InMemoryModifiedFiles(documents),
            (CheckLevelSetting::InMemory, None) => {
                warn!("in-memory check level requested without a document manager; using modified");
                IndexCheckLevel::ModifiedFiles
            }
        }
    }
}

impl FromStr for CheckLevelSetting {
    type Err = IndexGuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "deleted" | "deleted-files" => Ok(CheckLevelSetting::Deleted),
            "modified" | "modified-files" => Ok(CheckLevelSetting::Modified),
            "in-memory" | "in-memory-modified-files" => Ok(CheckLevelSetting::InMemory),
            other => Err(IndexGuardError::Config(format!("unknown check level '{other}'"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexGuardConfig {
    /// Level used by `UncheckedIndex::checked_with_config`.
    pub default_check_level: CheckLevelSetting,
    /// How long the SQLite store waits on a locked database.
    pub busy_timeout_ms: u64,
}

impl Default for IndexGuardConfig {
    fn default() -> Self {
        Self {
            default_check_level: CheckLevelSetting::default(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl IndexGuardConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Invalid values fall back to the
    /// defaults with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(raw) = lookup(CHECK_LEVEL_ENV) {
            match raw.parse() {
                Ok(level) => config.default_check_level = level,
                Err(e) => warn!("{CHECK_LEVEL_ENV}: {e}; using {:?}", config.default_check_level),
            }
        }
        if let Some(raw) = lookup(BUSY_TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.busy_timeout_ms = ms,
                Err(e) => warn!("{BUSY_TIMEOUT_ENV}={raw:?} is not a number of milliseconds: {e}"),
            }
        }
        config
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::models::DocumentUri;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = IndexGuardConfig::from_lookup(lookup(&[]));
        assert_eq!(config, IndexGuardConfig::default());
        assert_eq!(config.default_check_level, CheckLevelSetting::Deleted);
        assert_eq!(config.busy_timeout(), Duration::from_millis(5000));
    }

    #[test]
    fn reads_levels_and_timeout() {
        let config = IndexGuardConfig::from_lookup(lookup(&[
            (CHECK_LEVEL_ENV, " Modified "),
            (BUSY_TIMEOUT_ENV, "250"),
        ]));
        assert_eq!(config.default_check_level, CheckLevelSetting::Modified);
        assert_eq!(config.busy_timeout_ms, 250);
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = IndexGuardConfig::from_lookup(lookup(&[
            (CHECK_LEVEL_ENV, "paranoid"),
            (BUSY_TIMEOUT_ENV, "soon"),
        ]));
        assert_eq!(config, IndexGuardConfig::default());
        assert!("paranoid".parse::<CheckLevelSetting>().is_err());
    }

    #[test]
    fn in_memory_needs_documents() {
        struct Clean;
        impl InMemoryDocumentManager for Clean {
            fn file_has_in_memory_modifications(&self, _uri: &DocumentUri) -> bool {
                false
            }
        }

        let degraded = CheckLevelSetting::InMemory.into_check_level(None);
        assert!(matches!(degraded, IndexCheckLevel::ModifiedFiles));

        let bound = CheckLevelSetting::InMemory.into_check_level(Some(Arc::new(Clean)));
        assert!(matches!(bound, IndexCheckLevel::InMemoryModifiedFiles(_)));
    }
}
