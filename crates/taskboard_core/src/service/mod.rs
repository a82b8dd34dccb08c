//! Cross-store use-case layer.
//!
//! # Responsibility
//! - Keep task and category stores mutually consistent (`orchestrator`).
//! - Construct and wire every store around one storage backend and one
//!   change channel (`board`).

pub mod board;
pub mod orchestrator;
