//! Board domain model: tasks, categories and visual templates.
//!
//! # Responsibility
//! - Define the persisted record shapes shared by stores and collaborators.
//! - Own per-record validation rules.
//!
//! # Invariants
//! - Every record is identified by a non-empty opaque string id.
//! - Categories reference tasks by id only; the orchestrator keeps both
//!   sides consistent.
//! - Exactly one category has id `"default"` and it is never removed.

pub mod category;
pub mod task;
pub mod template;
pub mod validation;
