//! Change notification channel.
//!
//! # Responsibility
//! - Describe store mutations as typed `ChangeEvent`s.
//! - Route them to collaborators through an explicitly constructed bus.
//!
//! # Invariants
//! - Event name is `<entityKind><Action>`, e.g. `taskAdded`,
//!   `templateActiveChanged`.
//! - Stores publish only after the mutation has been written to storage.
//! - All events of one orchestrator call are delivered before it returns;
//!   ordering across entity kinds within that call is not guaranteed.

mod bus;

pub use bus::{BusEvent, EventBus, SubscriptionId};

use crate::model::category::{Category, CategoryProgress};
use crate::model::task::Task;
use crate::model::template::Template;
use std::borrow::Cow;

/// Entity collection that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Task,
    Category,
    Template,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Category => "category",
            Self::Template => "template",
        }
    }
}

/// Mutation that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeAction {
    Added,
    Removed,
    Updated,
    Cleared,
    ActiveChanged,
}

impl ChangeAction {
    /// Payload `action` value (`added`, `activeChanged`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Updated => "updated",
            Self::Cleared => "cleared",
            Self::ActiveChanged => "activeChanged",
        }
    }

    fn name_suffix(self) -> &'static str {
        match self {
            Self::Added => "Added",
            Self::Removed => "Removed",
            Self::Updated => "Updated",
            Self::Cleared => "Cleared",
            Self::ActiveChanged => "ActiveChanged",
        }
    }
}

/// Entity state carried by an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntitySnapshot {
    Task(Task),
    Category(Category),
    Template(Template),
}

/// `{action, data, entityKind}` notification payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub action: ChangeAction,
    /// `None` for `Cleared`.
    pub data: Option<EntitySnapshot>,
    pub entity_kind: EntityKind,
}

impl ChangeEvent {
    pub fn name(&self) -> String {
        event_name(self.entity_kind, self.action)
    }

    pub fn task(&self) -> Option<&Task> {
        match &self.data {
            Some(EntitySnapshot::Task(task)) => Some(task),
            _ => None,
        }
    }

    pub fn category(&self) -> Option<&Category> {
        match &self.data {
            Some(EntitySnapshot::Category(category)) => Some(category),
            _ => None,
        }
    }

    pub fn template(&self) -> Option<&Template> {
        match &self.data {
            Some(EntitySnapshot::Template(template)) => Some(template),
            _ => None,
        }
    }
}

impl BusEvent for ChangeEvent {
    fn topic(&self) -> Cow<'_, str> {
        Cow::Owned(self.name())
    }
}

/// Progress observers subscribe by category id.
impl BusEvent for CategoryProgress {
    fn topic(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.category_id.as_str())
    }
}

/// Process-wide change channel type shared by all stores.
pub type ChangeBus = EventBus<ChangeEvent>;

pub fn event_name(kind: EntityKind, action: ChangeAction) -> String {
    format!("{}{}", kind.as_str(), action.name_suffix())
}
