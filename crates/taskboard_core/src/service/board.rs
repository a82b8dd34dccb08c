//! Explicitly wired board: one storage backend, one change channel, three
//! stores and the orchestrator.
//!
//! # Invariants
//! - All stores share the same `ChangeBus` and storage backend.
//! - `open` always reconciles loaded state before returning.

use crate::config::BoardConfig;
use crate::events::ChangeBus;
use crate::service::orchestrator::{Orchestrator, ReconcileReport};
use crate::storage::{KeyValueStorage, MemoryStorage, SqliteStorage, StorageResult};
use crate::store::category_store::CategoryStore;
use crate::store::task_store::TaskStore;
use crate::store::template_store::{TemplatePresenter, TemplateStore};
use crate::store::StoreContext;
use log::info;
use std::path::Path;
use std::rc::Rc;
use std::time::Instant;

pub struct TaskBoard {
    config: BoardConfig,
    events: Rc<ChangeBus>,
    tasks: Rc<TaskStore>,
    categories: Rc<CategoryStore>,
    templates: TemplateStore,
    orchestrator: Orchestrator,
    startup_report: ReconcileReport,
}

impl TaskBoard {
    /// Loads every store from `storage` and reconciles the result.
    pub fn open(
        storage: Rc<dyn KeyValueStorage>,
        config: BoardConfig,
        presenter: Option<Rc<dyn TemplatePresenter>>,
    ) -> Self {
        let started_at = Instant::now();
        let keys = config.storage_keys();
        let events = Rc::new(ChangeBus::new());
        let ctx = StoreContext::new(storage, Rc::clone(&events));

        let categories = Rc::new(CategoryStore::load(ctx.clone(), keys.categories));
        let tasks = Rc::new(TaskStore::load(ctx.clone(), keys.tasks));
        let templates = TemplateStore::load(ctx, keys.templates, keys.template_pointer, presenter);
        let orchestrator = Orchestrator::new(Rc::clone(&tasks), Rc::clone(&categories));
        let startup_report = orchestrator.reconcile();

        info!(
            "event=board_open module=service status=ok namespace={} tasks={} categories={} templates={} duration_ms={}",
            config.storage_namespace,
            tasks.len(),
            categories.len(),
            templates.len(),
            started_at.elapsed().as_millis()
        );

        Self {
            config,
            events,
            tasks,
            categories,
            templates,
            orchestrator,
            startup_report,
        }
    }

    /// Opens a board persisted in the SQLite file at `path`.
    pub fn open_sqlite(
        path: impl AsRef<Path>,
        config: BoardConfig,
        presenter: Option<Rc<dyn TemplatePresenter>>,
    ) -> StorageResult<Self> {
        let storage = SqliteStorage::open(path)?;
        Ok(Self::open(Rc::new(storage), config, presenter))
    }

    /// Opens a board over fresh in-process storage.
    pub fn in_memory() -> Self {
        Self::open(Rc::new(MemoryStorage::new()), BoardConfig::default(), None)
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn events(&self) -> &Rc<ChangeBus> {
        &self.events
    }

    pub fn tasks(&self) -> &TaskStore {
        &self.tasks
    }

    pub fn categories(&self) -> &CategoryStore {
        &self.categories
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Repairs made while opening.
    pub fn startup_report(&self) -> &ReconcileReport {
        &self.startup_report
    }
}
