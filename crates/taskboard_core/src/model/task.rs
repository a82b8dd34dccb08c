//! Task record.
//!
//! # Invariants
//! - `title` is non-blank for every persisted task.
//! - `category_id` names an existing category once the orchestrator has
//!   accepted the task; blank means "default".

use crate::model::category::{CategoryId, DEFAULT_CATEGORY_ID};
use crate::model::validation::{require_id, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque task identifier.
pub type TaskId = String;

/// Completion state derived from the `checked` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Completed,
}

/// One to-do entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub checked: bool,
    pub category_id: CategoryId,
}

impl Task {
    /// Creates an unchecked task with a generated id.
    pub fn new(title: impl Into<String>, category_id: impl Into<CategoryId>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), title, category_id)
    }

    /// Creates an unchecked task with a caller-provided id.
    pub fn with_id(
        id: impl Into<TaskId>,
        title: impl Into<String>,
        category_id: impl Into<CategoryId>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            checked: false,
            category_id: category_id.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_id(&self.id)?;
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        Ok(())
    }

    pub fn state(&self) -> TaskState {
        if self.checked {
            TaskState::Completed
        } else {
            TaskState::Pending
        }
    }

    /// Category id with blank values resolved to the default category.
    pub fn effective_category_id(&self) -> &str {
        if self.category_id.trim().is_empty() {
            DEFAULT_CATEGORY_ID
        } else {
            self.category_id.as_str()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Task, TaskState};
    use crate::model::validation::ValidationError;

    #[test]
    fn new_task_is_pending_with_generated_id() {
        let task = Task::new("Ship", "c1");
        assert!(!task.id.is_empty());
        assert_eq!(task.state(), TaskState::Pending);
        assert_eq!(task.category_id, "c1");
    }

    #[test]
    fn blank_title_is_rejected() {
        let task = Task::with_id("t1", "   ", "default");
        assert_eq!(task.validate(), Err(ValidationError::EmptyTitle));
    }

    #[test]
    fn blank_category_resolves_to_default() {
        let task = Task::with_id("t1", "Ship", "");
        assert_eq!(task.effective_category_id(), "default");
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let task = Task::with_id("t1", "Ship", "c1");
        let value = serde_json::to_value(&task).expect("task should serialize");
        assert_eq!(value["categoryId"], "c1");
        assert_eq!(value["checked"], false);
    }
}
