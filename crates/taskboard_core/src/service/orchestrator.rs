//! Multi-store task/category use cases.
//!
//! # Responsibility
//! - Be the only writer that touches both the task and the category store
//!   for one logical operation.
//! - Repair loaded state so referential integrity holds (`reconcile`).
//!
//! # Invariants
//! - Every task's `category_id` names an existing category.
//! - A category's `tasks` list holds exactly the ids of tasks assigned to it.
//! - Completed counters are always recomputed from task state, never
//!   incremented or decremented.
//! - Change events fire inside the store calls, so a listener reacting to
//!   `taskUpdated` runs before the owning category is recounted.

use crate::model::category::{Category, CategoryId, DEFAULT_CATEGORY_ID};
use crate::model::task::{Task, TaskId};
use crate::store::category_store::CategoryStore;
use crate::store::task_store::TaskStore;
use crate::store::{InvariantViolation, StoreError};
use log::{error, info, warn};
use std::collections::{BTreeSet, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;
use uuid::Uuid;

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

/// Error for multi-store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    /// A store refused the mutation.
    Store(StoreError),
    /// Referenced category does not exist.
    CategoryNotFound(CategoryId),
    /// Referenced task does not exist.
    TaskNotFound(TaskId),
}

impl Display for OrchestratorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::CategoryNotFound(id) => write!(f, "category not found: {id}"),
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
        }
    }
}

impl Error for OrchestratorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for OrchestratorError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Repairs applied by `Orchestrator::reconcile`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Tasks moved to the default category (blank or unknown category).
    pub reassigned_tasks: Vec<TaskId>,
    /// Categories whose membership list was rebuilt.
    pub rebuilt_categories: Vec<CategoryId>,
    /// Categories whose completed counter was corrected.
    pub recounted_categories: Vec<CategoryId>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.reassigned_tasks.is_empty()
            && self.rebuilt_categories.is_empty()
            && self.recounted_categories.is_empty()
    }
}

/// Coordinator over the task and category stores.
pub struct Orchestrator {
    tasks: Rc<TaskStore>,
    categories: Rc<CategoryStore>,
}

impl Orchestrator {
    pub fn new(tasks: Rc<TaskStore>, categories: Rc<CategoryStore>) -> Self {
        Self { tasks, categories }
    }

    pub fn tasks(&self) -> &TaskStore {
        &self.tasks
    }

    pub fn categories(&self) -> &CategoryStore {
        &self.categories
    }

    /// Adds a task and registers it with its category.
    ///
    /// A blank `category_id` means the default category. Unknown categories
    /// are rejected before anything is written.
    pub fn add_task(&self, mut task: Task) -> OrchestratorResult<Task> {
        task.category_id = task.effective_category_id().to_string();
        self.require_category(&task.category_id)?;

        self.tasks.add(task.clone())?;
        self.categories
            .add_task_to_category(&task.category_id, &task.id)?;
        self.recompute_completed(&task.category_id)?;
        info!(
            "event=task_create module=service status=ok id={} category={}",
            task.id, task.category_id
        );
        Ok(task)
    }

    /// Creates an unchecked task with a generated id inside `category_id`.
    pub fn create_task_in_category(
        &self,
        title: impl Into<String>,
        category_id: &str,
    ) -> OrchestratorResult<Task> {
        self.add_task(Task::new(title, category_id))
    }

    /// Creates a category, then a task inside it.
    pub fn create_task_with_new_category(
        &self,
        title: impl Into<String>,
        category_name: impl Into<String>,
        color: Option<&str>,
    ) -> OrchestratorResult<(Category, Task)> {
        let category = self.create_category(category_name, color)?;
        let task = self.create_task_in_category(title, &category.id)?;
        Ok((category, task))
    }

    /// Creates a category with a generated id. Without an explicit color
    /// one is derived from a fresh UUID.
    pub fn create_category(
        &self,
        name: impl Into<String>,
        color: Option<&str>,
    ) -> OrchestratorResult<Category> {
        let color = color.map(str::to_string).unwrap_or_else(random_color);
        let category = Category::new(Uuid::new_v4().to_string(), name, color);
        self.add_category(category.clone())?;
        Ok(category)
    }

    pub fn add_category(&self, category: Category) -> OrchestratorResult<()> {
        self.categories.add(category)?;
        Ok(())
    }

    /// Replaces a task and moves its id between categories when the category
    /// changed. Returns `false` for an unknown task.
    pub fn update_task(&self, mut task: Task) -> OrchestratorResult<bool> {
        let Some(previous) = self.tasks.find_by_id(&task.id) else {
            return Ok(false);
        };
        task.category_id = task.effective_category_id().to_string();
        self.require_category(&task.category_id)?;

        self.tasks.update(task.clone())?;
        let old_category = previous.effective_category_id();
        if old_category != task.category_id {
            // Leave the old category before joining the new one.
            self.categories
                .remove_task_from_category(old_category, &task.id)?;
            self.recompute_completed(old_category)?;
            self.categories
                .add_task_to_category(&task.category_id, &task.id)?;
            info!(
                "event=task_move module=service status=ok id={} from={old_category} to={}",
                task.id, task.category_id
            );
        }
        self.recompute_completed(&task.category_id)?;
        Ok(true)
    }

    /// Moves an existing task into an existing category.
    pub fn move_task_to_category(
        &self,
        task_id: &str,
        category_id: &str,
    ) -> OrchestratorResult<Task> {
        let mut task = self
            .tasks
            .find_by_id(task_id)
            .ok_or_else(|| OrchestratorError::TaskNotFound(task_id.to_string()))?;
        self.require_category(category_id)?;
        task.category_id = category_id.to_string();
        self.update_task(task.clone())?;
        Ok(task)
    }

    /// Flips a task's `checked` flag and recounts its category.
    pub fn toggle_task_check_status(&self, task_id: &str) -> OrchestratorResult<Option<Task>> {
        let Some(task) = self.tasks.toggle_check_status(task_id)? else {
            return Ok(None);
        };
        self.recompute_completed(task.effective_category_id())?;
        Ok(Some(task))
    }

    /// Deletes a task and drops its id from the owning category.
    pub fn delete_task(&self, task_id: &str) -> OrchestratorResult<Option<Task>> {
        let Some(task) = self.tasks.remove(task_id)? else {
            return Ok(None);
        };
        let category_id = task.effective_category_id();
        self.recompute_completed(category_id)?;
        self.categories
            .remove_task_from_category(category_id, &task.id)?;
        Ok(Some(task))
    }

    /// Deletes a category after moving its tasks to the default category.
    ///
    /// The default category is refused. An unknown id returns `None`.
    pub fn delete_category(&self, category_id: &str) -> OrchestratorResult<Option<Category>> {
        if category_id == DEFAULT_CATEGORY_ID {
            warn!(
                "event=category_delete module=service status=refused id={category_id} reason=default_category"
            );
            return Err(StoreError::from(InvariantViolation::DefaultCategoryProtected).into());
        }
        if !self.categories.contains(category_id) {
            return Ok(None);
        }

        let mut moved = Vec::new();
        for mut task in self.tasks.get_tasks_by_category(category_id) {
            task.category_id = DEFAULT_CATEGORY_ID.to_string();
            self.tasks.update(task.clone())?;
            moved.push(task.id);
        }
        for task_id in &moved {
            self.categories
                .add_task_to_category(DEFAULT_CATEGORY_ID, task_id)?;
        }
        self.recompute_completed(DEFAULT_CATEGORY_ID)?;

        let removed = self.categories.remove(category_id)?;
        info!(
            "event=category_delete module=service status=ok id={category_id} reassigned={}",
            moved.len()
        );
        Ok(removed)
    }

    /// Deletes every task and empties every category.
    pub fn clear_all_tasks(&self) -> OrchestratorResult<()> {
        self.tasks.clear();
        self.categories.clear_all_tasks()?;
        info!("event=tasks_clear module=service status=ok scope=all");
        Ok(())
    }

    /// Deletes every checked task and drops the ids from their categories.
    pub fn clear_completed_tasks(&self) -> OrchestratorResult<Vec<Task>> {
        let removed = self.tasks.clear_completed();
        let mut touched = BTreeSet::new();
        for task in &removed {
            let category_id = task.effective_category_id();
            self.categories
                .remove_task_from_category(category_id, &task.id)?;
            touched.insert(category_id.to_string());
        }
        for category_id in &touched {
            self.recompute_completed(category_id)?;
        }
        info!(
            "event=tasks_clear module=service status=ok scope=completed removed={}",
            removed.len()
        );
        Ok(removed)
    }

    /// Makes the loaded state satisfy the referential-integrity and counter
    /// invariants. Individual failures are logged and skipped.
    pub fn reconcile(&self) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for mut task in self.tasks.list() {
            let category_id = task.category_id.trim();
            if !category_id.is_empty() && self.categories.contains(category_id) {
                continue;
            }
            task.category_id = DEFAULT_CATEGORY_ID.to_string();
            match self.tasks.update(task.clone()) {
                Ok(_) => report.reassigned_tasks.push(task.id),
                Err(err) => error!(
                    "event=reconcile module=service status=error step=reassign id={} error={err}",
                    task.id
                ),
            }
        }

        let tasks = self.tasks.list();
        let mut members: HashMap<&str, Vec<&str>> = HashMap::new();
        for task in &tasks {
            members
                .entry(task.effective_category_id())
                .or_default()
                .push(task.id.as_str());
        }
        for category in self.categories.list() {
            let expected = members.get(category.id.as_str()).cloned().unwrap_or_default();
            let mut rebuilt: Vec<TaskId> = category
                .tasks()
                .iter()
                .filter(|id| expected.contains(&id.as_str()))
                .cloned()
                .collect();
            for id in expected {
                if !rebuilt.iter().any(|existing| existing == id) {
                    rebuilt.push(id.to_string());
                }
            }
            match self.categories.set_task_ids(&category.id, rebuilt) {
                Ok(true) => report.rebuilt_categories.push(category.id),
                Ok(false) => {}
                Err(err) => error!(
                    "event=reconcile module=service status=error step=rebuild id={} error={err}",
                    category.id
                ),
            }
        }

        let before: HashMap<CategoryId, usize> = self
            .categories
            .list()
            .into_iter()
            .map(|category| (category.id.clone(), category.completed_tasks()))
            .collect();
        if let Err(err) = self.categories.sync_with_tasks(&tasks) {
            error!("event=reconcile module=service status=error step=recount error={err}");
        }
        for category in self.categories.list() {
            if before.get(&category.id) != Some(&category.completed_tasks()) {
                report.recounted_categories.push(category.id);
            }
        }

        if report.is_clean() {
            info!("event=reconcile module=service status=ok repairs=0");
        } else {
            warn!(
                "event=reconcile module=service status=repaired reassigned={} rebuilt={} recounted={}",
                report.reassigned_tasks.len(),
                report.rebuilt_categories.len(),
                report.recounted_categories.len()
            );
        }
        report
    }

    fn require_category(&self, category_id: &str) -> OrchestratorResult<()> {
        if self.categories.contains(category_id) {
            return Ok(());
        }
        warn!(
            "event=category_lookup module=service status=error id={category_id} reason=not_found"
        );
        Err(OrchestratorError::CategoryNotFound(category_id.to_string()))
    }

    fn recompute_completed(&self, category_id: &str) -> OrchestratorResult<()> {
        let completed = self.tasks.count_completed_in_category(category_id);
        self.categories.set_completed_count(category_id, completed)?;
        Ok(())
    }
}

fn random_color() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("#{}", &hex[..6])
}

#[cfg(test)]
mod tests {
    use super::{random_color, ReconcileReport};
    use crate::model::template::is_hex_color;

    #[test]
    fn random_color_is_six_digit_hex() {
        let color = random_color();
        assert_eq!(color.len(), 7);
        assert!(is_hex_color(&color));
    }

    #[test]
    fn empty_report_is_clean() {
        assert!(ReconcileReport::default().is_clean());
        let report = ReconcileReport {
            reassigned_tasks: vec!["t1".to_string()],
            ..ReconcileReport::default()
        };
        assert!(!report.is_clean());
    }
}
