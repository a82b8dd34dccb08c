//! Runtime configuration and storage key layout.
//!
//! # Invariants
//! - Every entity kind owns exactly one storage key, derived from the
//!   namespace as `<ns>-tasks`, `<ns>-categories`, `<ns>-templates`.
//! - The current-template pointer key is fixed and not namespaced.
//! - Blank environment values are treated as unset.

use crate::logging::default_log_level;
use std::path::PathBuf;

pub const DEFAULT_STORAGE_NAMESPACE: &str = "todo-x-factr";
pub const TEMPLATE_POINTER_KEY: &str = "themeTemplate";
const DEFAULT_DB_FILE_NAME: &str = "taskboard.sqlite3";

pub const ENV_STORAGE_NAMESPACE: &str = "TASKBOARD_STORAGE_NAMESPACE";
pub const ENV_DB_PATH: &str = "TASKBOARD_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "TASKBOARD_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "TASKBOARD_LOG_DIR";

/// Storage keys used by the three stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub tasks: String,
    pub categories: String,
    pub templates: String,
    pub template_pointer: String,
}

impl StorageKeys {
    pub fn for_namespace(namespace: &str) -> Self {
        Self {
            tasks: format!("{namespace}-tasks"),
            categories: format!("{namespace}-categories"),
            templates: format!("{namespace}-templates"),
            template_pointer: TEMPLATE_POINTER_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardConfig {
    pub storage_namespace: String,
    pub db_path: PathBuf,
    pub log_level: String,
    /// `None` leaves logging uninitialized.
    pub log_dir: Option<PathBuf>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            storage_namespace: DEFAULT_STORAGE_NAMESPACE.to_string(),
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl BoardConfig {
    /// Reads `TASKBOARD_*` variables over the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as `from_env` with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |name: &str| {
            lookup(name)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };
        let defaults = Self::default();
        Self {
            storage_namespace: value(ENV_STORAGE_NAMESPACE).unwrap_or(defaults.storage_namespace),
            db_path: value(ENV_DB_PATH)
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            log_level: value(ENV_LOG_LEVEL).unwrap_or(defaults.log_level),
            log_dir: value(ENV_LOG_DIR).map(PathBuf::from),
        }
    }

    pub fn storage_keys(&self) -> StorageKeys {
        StorageKeys::for_namespace(&self.storage_namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::{BoardConfig, StorageKeys, ENV_DB_PATH, ENV_LOG_DIR, ENV_STORAGE_NAMESPACE};
    use std::collections::HashMap;
    use std::path::PathBuf;

    #[test]
    fn default_keys_use_legacy_namespace() {
        let keys = BoardConfig::default().storage_keys();
        assert_eq!(
            keys,
            StorageKeys {
                tasks: "todo-x-factr-tasks".to_string(),
                categories: "todo-x-factr-categories".to_string(),
                templates: "todo-x-factr-templates".to_string(),
                template_pointer: "themeTemplate".to_string(),
            }
        );
    }

    #[test]
    fn lookup_overrides_defaults_and_ignores_blank_values() {
        let vars = HashMap::from([
            (ENV_STORAGE_NAMESPACE, "board".to_string()),
            (ENV_DB_PATH, "/var/lib/board.db".to_string()),
            (ENV_LOG_DIR, "   ".to_string()),
        ]);
        let config = BoardConfig::from_lookup(|name| vars.get(name).cloned());

        assert_eq!(config.storage_namespace, "board");
        assert_eq!(config.db_path, PathBuf::from("/var/lib/board.db"));
        assert_eq!(config.log_dir, None);
        assert_eq!(config.log_level, BoardConfig::default().log_level);
        assert_eq!(config.storage_keys().tasks, "board-tasks");
    }
}
