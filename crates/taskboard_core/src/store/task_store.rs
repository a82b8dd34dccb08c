//! Task collection.
//!
//! # Invariants
//! - Add/update reject blank titles with `ValidationError::EmptyTitle`.
//! - Category membership is not touched here; multi-entity task operations
//!   go through `Orchestrator`.

use crate::events::{EntityKind, EntitySnapshot};
use crate::model::category::DEFAULT_CATEGORY_ID;
use crate::model::task::Task;
use crate::store::codec::{FieldAlias, FieldRecord};
use crate::store::entity_store::{Entity, EntityHooks, EntityStore, Mutation};
use crate::store::{StoreContext, StoreResult};
use log::debug;

const TASK_FIELDS: &[FieldAlias] = &[
    FieldAlias::new("id", "_id"),
    FieldAlias::new("title", "_title"),
    FieldAlias::new("checked", "_checked"),
    FieldAlias::new("categoryId", "_categoryId"),
];

impl Entity for Task {
    const KIND: EntityKind = EntityKind::Task;
    const FIELD_ALIASES: &'static [FieldAlias] = TASK_FIELDS;

    fn id(&self) -> &str {
        &self.id
    }

    fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot::Task(self.clone())
    }

    fn from_record(record: &FieldRecord<'_>) -> Option<Self> {
        Some(Self {
            id: record.string("id")?,
            title: record.string("title")?,
            checked: record.bool("checked").unwrap_or(false),
            category_id: record
                .string("categoryId")
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CATEGORY_ID.to_string()),
        })
    }

    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Title validation and mutation tracing for tasks.
#[derive(Debug, Default, Clone, Copy)]
pub struct TaskHooks;

impl EntityHooks<Task> for TaskHooks {
    fn validate(&self, task: &Task, mutation: Mutation) -> StoreResult<()> {
        match mutation {
            Mutation::Add | Mutation::Update => task.validate().map_err(Into::into),
            Mutation::Remove => Ok(()),
        }
    }

    fn on_after_add(&self, task: &Task) {
        debug!("event=task_add module=store status=ok id={}", task.id);
    }

    fn on_after_update(&self, task: &Task) {
        debug!(
            "event=task_update module=store status=ok id={} checked={}",
            task.id, task.checked
        );
    }

    fn on_after_remove(&self, task: &Task) {
        debug!("event=task_remove module=store status=ok id={}", task.id);
    }
}

pub struct TaskStore {
    inner: EntityStore<Task, TaskHooks>,
}

impl TaskStore {
    pub fn load(ctx: StoreContext, storage_key: impl Into<String>) -> Self {
        Self {
            inner: EntityStore::load(ctx, storage_key, TaskHooks),
        }
    }

    pub fn reload(&self) {
        self.inner.reload();
    }

    pub fn list(&self) -> Vec<Task> {
        self.inner.list()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn find_by_id(&self, id: &str) -> Option<Task> {
        self.inner.find_by_id(id)
    }

    pub fn add(&self, task: Task) -> StoreResult<()> {
        self.inner.add(task)
    }

    pub fn update(&self, task: Task) -> StoreResult<bool> {
        self.inner.update(task)
    }

    pub fn remove(&self, id: &str) -> StoreResult<Option<Task>> {
        self.inner.remove(id)
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    /// Flips `checked`, persists and publishes `taskUpdated`.
    ///
    /// Returns the toggled task, or `None` for an unknown id.
    pub fn toggle_check_status(&self, id: &str) -> StoreResult<Option<Task>> {
        let Some(mut task) = self.inner.find_by_id(id) else {
            return Ok(None);
        };
        task.checked = !task.checked;
        self.inner.update(task.clone())?;
        Ok(Some(task))
    }

    /// Removes every checked task in one write and returns them.
    pub fn clear_completed(&self) -> Vec<Task> {
        self.inner.remove_where(|task| task.checked)
    }

    pub fn get_completed_tasks(&self) -> Vec<Task> {
        self.inner.filter(|task| task.checked)
    }

    pub fn get_pending_tasks(&self) -> Vec<Task> {
        self.inner.filter(|task| !task.checked)
    }

    pub fn get_tasks_by_category(&self, category_id: &str) -> Vec<Task> {
        self.inner
            .filter(|task| task.effective_category_id() == category_id)
    }

    /// Number of checked tasks whose category is `category_id`.
    pub fn count_completed_in_category(&self, category_id: &str) -> usize {
        self.inner
            .count(|task| task.checked && task.effective_category_id() == category_id)
    }
}
