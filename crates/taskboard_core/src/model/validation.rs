//! Record-level validation errors.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Rejection raised before a store mutation is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Record id is blank.
    EmptyId,
    /// Task title is blank after trim.
    EmptyTitle,
    /// Category or template name is blank after trim.
    EmptyName,
    /// Color token is not a `#rgb`, `#rrggbb` or `#rrggbbaa` hex value.
    InvalidColor(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "id must not be empty"),
            Self::EmptyTitle => write!(f, "task title cannot be empty"),
            Self::EmptyName => write!(f, "name cannot be empty"),
            Self::InvalidColor(value) => write!(f, "invalid hex color `{value}`"),
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require_id(id: &str) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        return Err(ValidationError::EmptyId);
    }
    Ok(())
}
