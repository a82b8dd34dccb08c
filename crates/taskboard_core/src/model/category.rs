//! Category record and its derived completion metrics.
//!
//! # Invariants
//! - `tasks` holds unique ids in insertion order.
//! - `0 <= completed_tasks <= tasks.len()` after every mutator.
//! - Completion percentage is derived, never stored.

use crate::model::task::TaskId;
use crate::model::validation::{require_id, ValidationError};
use serde::{Deserialize, Serialize};

/// Opaque category identifier.
pub type CategoryId = String;

/// Fixed id of the permanent fallback category.
pub const DEFAULT_CATEGORY_ID: &str = "default";
/// Display name of the permanent fallback category.
pub const DEFAULT_CATEGORY_NAME: &str = "Un-Categorized";
/// Display color token of the permanent fallback category.
pub const DEFAULT_CATEGORY_COLOR: &str = "var(--primary)";

/// Task grouping with membership list and completion counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    /// Display token, opaque to core.
    pub color: String,
    tasks: Vec<TaskId>,
    completed_tasks: usize,
}

/// Snapshot of one category's counters, pushed to progress observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryProgress {
    pub category_id: CategoryId,
    pub total: usize,
    pub completed: usize,
    pub percentage: u8,
}

impl Category {
    pub fn new(
        id: impl Into<CategoryId>,
        name: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: color.into(),
            tasks: Vec::new(),
            completed_tasks: 0,
        }
    }

    /// Rebuilds a category from persisted parts, repairing duplicates and
    /// an out-of-range counter.
    pub fn from_parts(
        id: impl Into<CategoryId>,
        name: impl Into<String>,
        color: impl Into<String>,
        tasks: Vec<TaskId>,
        completed_tasks: usize,
    ) -> Self {
        let mut category = Self::new(id, name, color);
        for task_id in tasks {
            category.add_task(task_id);
        }
        category.set_completed_tasks(completed_tasks);
        category
    }

    /// The permanent `"default"` category.
    pub fn default_category() -> Self {
        Self::new(
            DEFAULT_CATEGORY_ID,
            DEFAULT_CATEGORY_NAME,
            DEFAULT_CATEGORY_COLOR,
        )
    }

    pub fn is_default(&self) -> bool {
        self.id == DEFAULT_CATEGORY_ID
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_id(&self.id)?;
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(())
    }

    pub fn tasks(&self) -> &[TaskId] {
        &self.tasks
    }

    pub fn completed_tasks(&self) -> usize {
        self.completed_tasks
    }

    pub fn contains_task(&self, task_id: &str) -> bool {
        self.tasks.iter().any(|id| id == task_id)
    }

    /// Appends `task_id` unless already present. Returns whether it was added.
    pub fn add_task(&mut self, task_id: impl Into<TaskId>) -> bool {
        let task_id = task_id.into();
        if self.contains_task(&task_id) {
            return false;
        }
        self.tasks.push(task_id);
        true
    }

    /// Removes `task_id` and clamps the completed counter to the new length.
    pub fn remove_task(&mut self, task_id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|id| id != task_id);
        let removed = self.tasks.len() != before;
        self.completed_tasks = self.completed_tasks.min(self.tasks.len());
        removed
    }

    /// Replaces the membership list wholesale, dropping duplicates.
    pub fn set_tasks(&mut self, tasks: Vec<TaskId>) {
        self.tasks.clear();
        for task_id in tasks {
            self.add_task(task_id);
        }
        self.completed_tasks = self.completed_tasks.min(self.tasks.len());
    }

    pub fn clear_tasks(&mut self) {
        self.tasks.clear();
        self.completed_tasks = 0;
    }

    /// Sets the completed counter clamped to `[0, tasks.len()]` and returns
    /// the applied value.
    pub fn set_completed_tasks(&mut self, count: usize) -> usize {
        self.completed_tasks = count.min(self.tasks.len());
        self.completed_tasks
    }

    /// `round(completed / total * 100)`, or 0 for an empty category.
    pub fn completion_percentage(&self) -> u8 {
        if self.tasks.is_empty() {
            return 0;
        }
        let ratio = self.completed_tasks as f64 / self.tasks.len() as f64;
        (ratio * 100.0).round() as u8
    }

    pub fn progress(&self) -> CategoryProgress {
        CategoryProgress {
            category_id: self.id.clone(),
            total: self.tasks.len(),
            completed: self.completed_tasks,
            percentage: self.completion_percentage(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Category;

    #[test]
    fn add_task_is_idempotent_and_keeps_order() {
        let mut category = Category::new("c1", "Work", "#fff");
        assert!(category.add_task("t1"));
        assert!(category.add_task("t2"));
        assert!(!category.add_task("t1"));
        assert_eq!(category.tasks(), ["t1", "t2"]);
    }

    #[test]
    fn completed_counter_is_clamped() {
        let mut category = Category::new("c1", "Work", "#fff");
        category.add_task("t1");
        assert_eq!(category.set_completed_tasks(5), 1);
        category.remove_task("t1");
        assert_eq!(category.completed_tasks(), 0);
    }

    #[test]
    fn percentage_is_zero_for_empty_category() {
        let category = Category::new("c1", "Work", "#fff");
        assert_eq!(category.completion_percentage(), 0);
    }

    #[test]
    fn percentage_rounds_to_nearest_integer() {
        let mut category = Category::new("c1", "Work", "#fff");
        for id in ["t1", "t2", "t3"] {
            category.add_task(id);
        }
        category.set_completed_tasks(1);
        assert_eq!(category.completion_percentage(), 33);
        category.set_completed_tasks(2);
        assert_eq!(category.completion_percentage(), 67);
    }

    #[test]
    fn from_parts_repairs_duplicates_and_counter() {
        let category = Category::from_parts(
            "c1",
            "Work",
            "#fff",
            vec!["t1".to_string(), "t1".to_string()],
            4,
        );
        assert_eq!(category.tasks(), ["t1"]);
        assert_eq!(category.completed_tasks(), 1);
    }

    #[test]
    fn serializes_counter_as_completed_tasks() {
        let mut category = Category::new("c1", "Work", "#fff");
        category.add_task("t1");
        let value = serde_json::to_value(&category).expect("category should serialize");
        assert_eq!(value["completedTasks"], 0);
        assert_eq!(value["tasks"][0], "t1");
    }
}
