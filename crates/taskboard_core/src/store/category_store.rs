//! Category collection, membership lists and completion counters.
//!
//! # Responsibility
//! - Own each category's ordered task-id list and completed counter.
//! - Guarantee the permanent `"default"` category exists.
//! - Push per-category progress to observers that only care about counts.
//!
//! # Invariants
//! - The `"default"` category is present after `load`/`reload` and can never
//!   be removed.
//! - `0 <= completed_tasks <= tasks.len()` for every stored category.
//! - Removal of any other category is crate-private; collaborators delete
//!   through `Orchestrator::delete_category`, which reassigns tasks first.

use crate::events::{EntityKind, EntitySnapshot, EventBus, SubscriptionId};
use crate::model::category::{
    Category, CategoryProgress, DEFAULT_CATEGORY_COLOR, DEFAULT_CATEGORY_ID,
};
use crate::model::task::{Task, TaskId};
use crate::store::codec::{FieldAlias, FieldRecord};
use crate::store::entity_store::{Entity, EntityHooks, EntityStore, Mutation};
use crate::store::{InvariantViolation, StoreContext, StoreResult};
use log::{error, info};
use std::collections::HashSet;

const CATEGORY_FIELDS: &[FieldAlias] = &[
    FieldAlias::new("id", "_id"),
    FieldAlias::new("name", "_name"),
    FieldAlias::new("color", "_color"),
    FieldAlias::new("tasks", "_tasks"),
    FieldAlias::new("completedTasks", "_completedTasks"),
];

impl Entity for Category {
    const KIND: EntityKind = EntityKind::Category;
    const FIELD_ALIASES: &'static [FieldAlias] = CATEGORY_FIELDS;

    fn id(&self) -> &str {
        &self.id
    }

    fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot::Category(self.clone())
    }

    fn from_record(record: &FieldRecord<'_>) -> Option<Self> {
        Some(Category::from_parts(
            record.string("id")?,
            record.string("name")?,
            record
                .string("color")
                .unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_string()),
            record.string_list("tasks").unwrap_or_default(),
            record.count("completedTasks").unwrap_or(0),
        ))
    }

    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    fn repaired(self) -> Self {
        let tasks = self.tasks().to_vec();
        let completed = self.completed_tasks();
        Category::from_parts(self.id, self.name, self.color, tasks, completed)
    }
}

/// Name validation and default-category protection.
#[derive(Debug, Default, Clone, Copy)]
pub struct CategoryHooks;

impl EntityHooks<Category> for CategoryHooks {
    fn validate(&self, category: &Category, mutation: Mutation) -> StoreResult<()> {
        match mutation {
            Mutation::Add | Mutation::Update => category.validate().map_err(Into::into),
            Mutation::Remove if category.is_default() => {
                Err(InvariantViolation::DefaultCategoryProtected.into())
            }
            Mutation::Remove => Ok(()),
        }
    }
}

pub struct CategoryStore {
    inner: EntityStore<Category, CategoryHooks>,
    progress: EventBus<CategoryProgress>,
}

impl CategoryStore {
    /// Loads categories and seeds the default category when missing.
    pub fn load(ctx: StoreContext, storage_key: impl Into<String>) -> Self {
        let store = Self {
            inner: EntityStore::load(ctx, storage_key, CategoryHooks),
            progress: EventBus::new(),
        };
        store.ensure_default_category();
        store
    }

    pub fn reload(&self) {
        self.inner.reload();
        self.ensure_default_category();
    }

    pub fn list(&self) -> Vec<Category> {
        self.inner.list()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.contains(id)
    }

    pub fn find_by_id(&self, id: &str) -> Option<Category> {
        self.inner.find_by_id(id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<Category> {
        self.inner.find(|category| category.name == name)
    }

    /// The permanent fallback category.
    pub fn default_category(&self) -> Category {
        self.inner
            .find_by_id(DEFAULT_CATEGORY_ID)
            .unwrap_or_else(Category::default_category)
    }

    pub fn add(&self, category: Category) -> StoreResult<()> {
        let progress = category.progress();
        self.inner.add(category)?;
        self.progress.emit(&progress);
        Ok(())
    }

    pub fn update(&self, category: Category) -> StoreResult<bool> {
        let progress = category.progress();
        let updated = self.inner.update(category)?;
        if updated {
            self.progress.emit(&progress);
        }
        Ok(updated)
    }

    /// Removes a non-default category without touching its tasks.
    ///
    /// Observers of the removed category receive a final zeroed progress.
    pub(crate) fn remove(&self, id: &str) -> StoreResult<Option<Category>> {
        let removed = self.inner.remove(id)?;
        if let Some(category) = &removed {
            self.progress.emit(&CategoryProgress {
                category_id: category.id.clone(),
                total: 0,
                completed: 0,
                percentage: 0,
            });
        }
        Ok(removed)
    }

    /// Appends `task_id` to the category unless already present.
    ///
    /// Returns `false` for an unknown category or an existing member.
    pub fn add_task_to_category(&self, category_id: &str, task_id: &str) -> StoreResult<bool> {
        self.apply_change(category_id, |category| category.add_task(task_id))
    }

    /// Removes `task_id` and clamps the completed counter.
    pub fn remove_task_from_category(
        &self,
        category_id: &str,
        task_id: &str,
    ) -> StoreResult<bool> {
        self.apply_change(category_id, |category| category.remove_task(task_id))
    }

    /// Stores `count` clamped to `[0, tasks.len()]`.
    ///
    /// Returns `false` when the category is unknown or the stored value
    /// already matches.
    pub fn set_completed_count(&self, category_id: &str, count: usize) -> StoreResult<bool> {
        self.apply_change(category_id, |category| {
            let before = category.completed_tasks();
            category.set_completed_tasks(count) != before
        })
    }

    /// Empties every membership list and resets every counter.
    pub fn clear_all_tasks(&self) -> StoreResult<()> {
        for category in self.inner.list() {
            self.apply_change(&category.id, |category| {
                let changed = !category.tasks().is_empty() || category.completed_tasks() > 0;
                category.clear_tasks();
                changed
            })?;
        }
        Ok(())
    }

    /// Recomputes every completed counter as the number of checked tasks
    /// among each category's members.
    pub fn sync_with_tasks(&self, tasks: &[Task]) -> StoreResult<()> {
        let checked: HashSet<&str> = tasks
            .iter()
            .filter(|task| task.checked)
            .map(|task| task.id.as_str())
            .collect();
        for category in self.inner.list() {
            let completed = category
                .tasks()
                .iter()
                .filter(|id| checked.contains(id.as_str()))
                .count();
            self.set_completed_count(&category.id, completed)?;
        }
        Ok(())
    }

    /// Derived completion percentage, `None` for an unknown category.
    pub fn completion_percentage(&self, category_id: &str) -> Option<u8> {
        self.inner
            .find_by_id(category_id)
            .map(|category| category.completion_percentage())
    }

    /// Subscribes to counter changes of one category, or of all categories
    /// when `category_id` is `None`.
    pub fn observe_progress(
        &self,
        category_id: Option<&str>,
        observer: impl Fn(&CategoryProgress) + 'static,
    ) -> SubscriptionId {
        match category_id {
            Some(id) => self.progress.subscribe(id, observer),
            None => self.progress.subscribe_all(observer),
        }
    }

    pub fn unobserve_progress(&self, id: SubscriptionId) -> bool {
        self.progress.unsubscribe(id)
    }

    /// Replaces a membership list wholesale. Used by reconciliation.
    pub(crate) fn set_task_ids(
        &self,
        category_id: &str,
        task_ids: Vec<TaskId>,
    ) -> StoreResult<bool> {
        self.apply_change(category_id, |category| {
            let before = category.tasks().to_vec();
            category.set_tasks(task_ids);
            category.tasks() != before.as_slice()
        })
    }

    fn apply_change(
        &self,
        category_id: &str,
        edit: impl FnOnce(&mut Category) -> bool,
    ) -> StoreResult<bool> {
        let Some(mut category) = self.inner.find_by_id(category_id) else {
            return Ok(false);
        };
        if !edit(&mut category) {
            return Ok(false);
        }
        self.update(category)
    }

    fn ensure_default_category(&self) {
        if self.inner.contains(DEFAULT_CATEGORY_ID) {
            return;
        }
        let first_run = self.inner.is_empty();
        match self.inner.add(Category::default_category()) {
            Ok(()) => info!(
                "event=category_seed module=store status=ok id={DEFAULT_CATEGORY_ID} first_run={first_run}"
            ),
            Err(err) => error!(
                "event=category_seed module=store status=error id={DEFAULT_CATEGORY_ID} error={err}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CategoryStore;
    use crate::events::ChangeBus;
    use crate::model::category::{Category, DEFAULT_CATEGORY_ID};
    use crate::storage::{KeyValueStorage, MemoryStorage};
    use crate::store::{InvariantViolation, StoreContext, StoreError};
    use std::rc::Rc;

    fn store_with(storage: Rc<MemoryStorage>) -> CategoryStore {
        let ctx = StoreContext::new(storage, Rc::new(ChangeBus::new()));
        CategoryStore::load(ctx, "categories")
    }

    #[test]
    fn removing_default_category_is_refused() {
        let store = store_with(Rc::new(MemoryStorage::new()));
        let err = store
            .remove(DEFAULT_CATEGORY_ID)
            .expect_err("default category is permanent");
        assert_eq!(
            err,
            StoreError::InvariantViolation(InvariantViolation::DefaultCategoryProtected)
        );
        assert!(store.contains(DEFAULT_CATEGORY_ID));
    }

    #[test]
    fn removing_other_category_persists() {
        let storage = Rc::new(MemoryStorage::new());
        let store = store_with(Rc::clone(&storage));
        store
            .add(Category::new("c1", "Work", "#fff"))
            .expect("add category");

        let removed = store.remove("c1").expect("remove");
        assert_eq!(removed.map(|category| category.id), Some("c1".to_string()));
        let raw = storage
            .get("categories")
            .expect("read")
            .expect("collection stored");
        assert!(!raw.contains("\"c1\""));
    }

    #[test]
    fn set_task_ids_reports_change_only_when_list_differs() {
        let store = store_with(Rc::new(MemoryStorage::new()));
        let ids = vec!["t1".to_string(), "t2".to_string()];
        assert!(store
            .set_task_ids(DEFAULT_CATEGORY_ID, ids.clone())
            .expect("set ids"));
        assert!(!store.set_task_ids(DEFAULT_CATEGORY_ID, ids).expect("set ids"));
    }
}
