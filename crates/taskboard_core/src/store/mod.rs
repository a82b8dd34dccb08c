//! Persisted, observable entity collections.
//!
//! # Responsibility
//! - Provide one generic write-through collection (`EntityStore`) plus the
//!   task, category and template specializations.
//! - Keep each store the sole writer of its storage key.
//!
//! # Invariants
//! - Mutation order is: hooks validate, memory write, storage write, after
//!   hook, event publish.
//! - A rejected mutation writes nothing and publishes nothing.
//! - Storage write failures are logged; memory stays authoritative.
//! - Cross-entity invariants are not enforced here; see
//!   `service::orchestrator`.

use crate::events::{ChangeBus, EntityKind};
use crate::model::validation::ValidationError;
use crate::storage::KeyValueStorage;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

pub mod category_store;
pub mod codec;
pub mod entity_store;
pub mod task_store;
pub mod template_store;

pub type StoreResult<T> = Result<T, StoreError>;

/// Refused mutation that would break a permanent-record guarantee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// The `"default"` category can never be removed.
    DefaultCategoryProtected,
    /// Built-in templates can never be removed.
    DefaultTemplateProtected(String),
    /// The last remaining template cannot be removed.
    LastTemplateProtected(String),
}

impl Display for InvariantViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DefaultCategoryProtected => write!(f, "cannot delete the default category"),
            Self::DefaultTemplateProtected(id) => {
                write!(f, "cannot delete built-in template: {id}")
            }
            Self::LastTemplateProtected(id) => {
                write!(f, "cannot delete the only remaining template: {id}")
            }
        }
    }
}

/// Store-level mutation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    Validation(ValidationError),
    InvariantViolation(InvariantViolation),
    /// Operation requires an existing record (e.g. activating a template).
    UnknownEntity { kind: EntityKind, id: String },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "validation failed: {err}"),
            Self::InvariantViolation(err) => write!(f, "invariant violation: {err}"),
            Self::UnknownEntity { kind, id } => write!(f, "{} not found: {id}", kind.as_str()),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<InvariantViolation> for StoreError {
    fn from(value: InvariantViolation) -> Self {
        Self::InvariantViolation(value)
    }
}

/// Shared collaborators injected into every store.
#[derive(Clone)]
pub struct StoreContext {
    pub storage: Rc<dyn KeyValueStorage>,
    pub events: Rc<ChangeBus>,
}

impl StoreContext {
    pub fn new(storage: Rc<dyn KeyValueStorage>, events: Rc<ChangeBus>) -> Self {
        Self { storage, events }
    }
}
