//! Tolerant decoding of persisted collections.
//!
//! Two field-naming conventions exist in stored data: the public camelCase
//! names (`categoryId`) and an underscore-prefixed legacy form
//! (`_categoryId`). Each entity declares a `FieldAlias` table; records that
//! fail strict deserialization are rebuilt field by field through it.
//!
//! # Invariants
//! - Public names win over legacy names when both are present.
//! - `null` counts as absent.
//! - Records that cannot be rebuilt, or that fail validation, are dropped
//!   and counted rather than failing the whole collection.

use crate::store::entity_store::Entity;
use serde_json::{Map, Value};

/// One public field name and its legacy spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldAlias {
    pub field: &'static str,
    pub legacy: &'static str,
}

impl FieldAlias {
    pub const fn new(field: &'static str, legacy: &'static str) -> Self {
        Self { field, legacy }
    }
}

/// Read-only view of one stored JSON object resolved through an alias table.
#[derive(Debug, Clone, Copy)]
pub struct FieldRecord<'a> {
    object: &'a Map<String, Value>,
    aliases: &'static [FieldAlias],
}

impl<'a> FieldRecord<'a> {
    /// Returns `None` when `value` is not a JSON object.
    pub fn new(value: &'a Value, aliases: &'static [FieldAlias]) -> Option<Self> {
        value.as_object().map(|object| Self { object, aliases })
    }

    pub fn value(&self, field: &str) -> Option<&'a Value> {
        let present = |key: &str| self.object.get(key).filter(|value| !value.is_null());
        present(field).or_else(|| {
            self.aliases
                .iter()
                .find(|alias| alias.field == field)
                .and_then(|alias| present(alias.legacy))
        })
    }

    pub fn string(&self, field: &str) -> Option<String> {
        self.value(field)?.as_str().map(str::to_string)
    }

    pub fn bool(&self, field: &str) -> Option<bool> {
        self.value(field)?.as_bool()
    }

    /// Non-negative integer; fractional numbers are truncated.
    pub fn count(&self, field: &str) -> Option<usize> {
        let value = self.value(field)?;
        if let Some(count) = value.as_u64() {
            return usize::try_from(count).ok();
        }
        value
            .as_f64()
            .filter(|number| number.is_finite() && *number >= 0.0)
            .map(|number| number as usize)
    }

    /// String array with non-string entries skipped.
    pub fn string_list(&self, field: &str) -> Option<Vec<String>> {
        let items = self.value(field)?.as_array()?;
        Some(
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
        )
    }
}

/// Result of decoding one stored collection.
#[derive(Debug, Clone)]
pub struct DecodedCollection<E> {
    pub items: Vec<E>,
    /// Records rebuilt through the alias table.
    pub legacy: usize,
    /// Records skipped as unreadable or invalid.
    pub dropped: usize,
}

impl<E> Default for DecodedCollection<E> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            legacy: 0,
            dropped: 0,
        }
    }
}

/// Decodes a stored JSON array of `E`.
///
/// # Errors
/// - Returns the parse error when `raw` is not a JSON array.
pub fn decode_collection<E: Entity>(
    raw: &str,
) -> Result<DecodedCollection<E>, serde_json::Error> {
    let entries: Vec<Value> = serde_json::from_str(raw)?;
    let mut decoded = DecodedCollection::default();

    for entry in &entries {
        let (item, legacy) = match serde_json::from_value::<E>(entry.clone()) {
            Ok(item) => (Some(item), false),
            Err(_) => (
                FieldRecord::new(entry, E::FIELD_ALIASES)
                    .and_then(|record| E::from_record(&record)),
                true,
            ),
        };

        match item.map(E::repaired) {
            Some(item) if item.is_valid() => {
                if legacy {
                    decoded.legacy += 1;
                }
                decoded.items.push(item);
            }
            _ => decoded.dropped += 1,
        }
    }

    Ok(decoded)
}
