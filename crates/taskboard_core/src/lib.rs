//! Core of the task board: persisted, observable task/category/template
//! collections and the layer that keeps them consistent.

pub mod config;
pub mod db;
pub mod events;
pub mod logging;
pub mod model;
pub mod service;
pub mod storage;
pub mod store;

pub use config::{BoardConfig, StorageKeys};
pub use events::{ChangeAction, ChangeBus, ChangeEvent, EntityKind, EventBus, SubscriptionId};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::category::{Category, CategoryId, CategoryProgress, DEFAULT_CATEGORY_ID};
pub use model::task::{Task, TaskId, TaskState};
pub use model::template::{ColorScheme, Template, TemplateId};
pub use model::validation::ValidationError;
pub use service::board::TaskBoard;
pub use service::orchestrator::{
    Orchestrator, OrchestratorError, OrchestratorResult, ReconcileReport,
};
pub use storage::{KeyValueStorage, MemoryStorage, SqliteStorage, StorageError, StorageResult};
pub use store::template_store::TemplatePresenter;
pub use store::{InvariantViolation, StoreError, StoreResult};

/// Minimal health-check API.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
