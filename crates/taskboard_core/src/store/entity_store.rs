//! Generic write-through entity collection.
//!
//! # Responsibility
//! - Hold one entity kind in memory, in insertion order.
//! - Mirror every successful mutation to storage before announcing it.
//! - Run per-kind hooks around mutations.
//!
//! # Invariants
//! - No `RefCell` borrow is held while hooks or listeners run, so a listener
//!   may call back into this (or any) store.
//! - Loading never fails: missing, empty or corrupt storage yields an empty
//!   collection.
//! - `remove`/`update` on an unknown id is a silent no-op.

use crate::events::{ChangeAction, ChangeBus, ChangeEvent, EntityKind, EntitySnapshot};
use crate::storage::StorageError;
use crate::store::codec::{decode_collection, FieldAlias, FieldRecord};
use crate::store::{StoreContext, StoreError, StoreResult};
use log::{debug, error, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;

/// Record kind that can live in an `EntityStore`.
pub trait Entity: Clone + Serialize + DeserializeOwned {
    const KIND: EntityKind;
    /// Public/legacy field-name table used when strict decoding fails.
    const FIELD_ALIASES: &'static [FieldAlias];

    fn id(&self) -> &str;
    fn snapshot(&self) -> EntitySnapshot;
    /// Rebuilds a record from tolerant field lookups, defaulting what is
    /// missing. Returns `None` when required fields are absent.
    fn from_record(record: &FieldRecord<'_>) -> Option<Self>;
    fn is_valid(&self) -> bool;

    /// Repairs derived fields of a freshly decoded record.
    fn repaired(self) -> Self {
        self
    }
}

/// Mutation a hook is asked to approve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Add,
    Update,
    Remove,
}

impl Mutation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Update => "update",
            Self::Remove => "remove",
        }
    }
}

/// Per-kind capability set plugged into `EntityStore`.
///
/// `validate` runs before anything is written; an error aborts the
/// mutation. The `on_after_*` hooks run after persistence and before the
/// change event is published.
pub trait EntityHooks<E> {
    fn validate(&self, _item: &E, _mutation: Mutation) -> StoreResult<()> {
        Ok(())
    }

    fn on_after_add(&self, _item: &E) {}

    fn on_after_update(&self, _item: &E) {}

    fn on_after_remove(&self, _item: &E) {}
}

/// Hook set that accepts everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl<E> EntityHooks<E> for NoHooks {}

pub struct EntityStore<E: Entity, H: EntityHooks<E> = NoHooks> {
    storage_key: String,
    items: RefCell<Vec<E>>,
    hooks: H,
    ctx: StoreContext,
}

impl<E: Entity, H: EntityHooks<E>> EntityStore<E, H> {
    /// Loads the collection stored under `storage_key`.
    pub fn load(ctx: StoreContext, storage_key: impl Into<String>, hooks: H) -> Self {
        let storage_key = storage_key.into();
        let items = read_collection::<E>(&ctx, &storage_key);
        Self {
            storage_key,
            items: RefCell::new(items),
            hooks,
            ctx,
        }
    }

    /// Replaces memory with whatever storage currently holds.
    pub fn reload(&self) {
        let items = read_collection::<E>(&self.ctx, &self.storage_key);
        *self.items.borrow_mut() = items;
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    pub fn events(&self) -> &Rc<ChangeBus> {
        &self.ctx.events
    }

    /// Snapshot of all records in insertion order.
    pub fn list(&self) -> Vec<E> {
        self.items.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.borrow().iter().any(|item| item.id() == id)
    }

    /// Linear lookup by id.
    pub fn find_by_id(&self, id: &str) -> Option<E> {
        self.find(|item| item.id() == id)
    }

    pub fn find(&self, predicate: impl Fn(&E) -> bool) -> Option<E> {
        self.items
            .borrow()
            .iter()
            .find(|item| predicate(item))
            .cloned()
    }

    pub fn filter(&self, predicate: impl Fn(&E) -> bool) -> Vec<E> {
        self.items
            .borrow()
            .iter()
            .filter(|item| predicate(item))
            .cloned()
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&E) -> bool) -> usize {
        self.items
            .borrow()
            .iter()
            .filter(|item| predicate(item))
            .count()
    }

    /// Appends `item`, persists, publishes `<kind>Added`.
    ///
    /// Id uniqueness is the caller's responsibility.
    pub fn add(&self, item: E) -> StoreResult<()> {
        self.check(&item, Mutation::Add)?;
        self.items.borrow_mut().push(item.clone());
        self.persist();
        self.hooks.on_after_add(&item);
        self.publish(ChangeAction::Added, Some(&item));
        Ok(())
    }

    /// Replaces the record with the same id. Returns `false` (no write, no
    /// event) when the id is unknown.
    pub fn update(&self, item: E) -> StoreResult<bool> {
        if !self.contains(item.id()) {
            debug!(
                "event=store_update module=store status=skipped kind={} id={} reason=not_found",
                E::KIND.as_str(),
                item.id()
            );
            return Ok(false);
        }
        self.check(&item, Mutation::Update)?;
        {
            let mut items = self.items.borrow_mut();
            if let Some(slot) = items.iter_mut().find(|existing| existing.id() == item.id()) {
                *slot = item.clone();
            }
        }
        self.persist();
        self.hooks.on_after_update(&item);
        self.publish(ChangeAction::Updated, Some(&item));
        Ok(true)
    }

    /// Removes the first record with `id`. Returns `None` (no write, no
    /// event) when the id is unknown.
    pub fn remove(&self, id: &str) -> StoreResult<Option<E>> {
        let Some(existing) = self.find_by_id(id) else {
            debug!(
                "event=store_remove module=store status=skipped kind={} id={id} reason=not_found",
                E::KIND.as_str()
            );
            return Ok(None);
        };
        self.check(&existing, Mutation::Remove)?;
        let removed = {
            let mut items = self.items.borrow_mut();
            let index = items.iter().position(|item| item.id() == id);
            index.map(|index| items.remove(index))
        };
        let Some(removed) = removed else {
            return Ok(None);
        };
        self.persist();
        self.hooks.on_after_remove(&removed);
        self.publish(ChangeAction::Removed, Some(&removed));
        Ok(Some(removed))
    }

    /// Removes every record matching `predicate` with a single storage
    /// write, then publishes one `<kind>Removed` per record.
    ///
    /// Records refused by the remove hook are kept.
    pub fn remove_where(&self, predicate: impl Fn(&E) -> bool) -> Vec<E> {
        let removable: Vec<E> = self
            .filter(predicate)
            .into_iter()
            .filter(|item| self.check(item, Mutation::Remove).is_ok())
            .collect();
        if removable.is_empty() {
            return removable;
        }

        self.items
            .borrow_mut()
            .retain(|item| !removable.iter().any(|gone| gone.id() == item.id()));
        self.persist();
        for item in &removable {
            self.hooks.on_after_remove(item);
            self.publish(ChangeAction::Removed, Some(item));
        }
        removable
    }

    /// Empties the collection, persists, publishes `<kind>Cleared`.
    pub fn clear(&self) {
        self.items.borrow_mut().clear();
        self.persist();
        self.publish(ChangeAction::Cleared, None);
    }

    /// Applies `edit` to the raw collection and persists when it reports a
    /// change. Publishes nothing; callers announce the change themselves.
    pub(crate) fn rewrite(&self, edit: impl FnOnce(&mut Vec<E>) -> bool) -> bool {
        let changed = edit(&mut *self.items.borrow_mut());
        if changed {
            self.persist();
        }
        changed
    }

    pub(crate) fn context(&self) -> &StoreContext {
        &self.ctx
    }

    pub(crate) fn publish(&self, action: ChangeAction, item: Option<&E>) -> usize {
        let event = ChangeEvent {
            action,
            data: item.map(E::snapshot),
            entity_kind: E::KIND,
        };
        self.ctx.events.emit(&event)
    }

    fn check(&self, item: &E, mutation: Mutation) -> StoreResult<()> {
        let Err(err) = self.hooks.validate(item, mutation) else {
            return Ok(());
        };
        let status = match err {
            StoreError::InvariantViolation(_) => "refused",
            _ => "error",
        };
        warn!(
            "event=store_{} module=store status={status} kind={} id={} error={err}",
            mutation.as_str(),
            E::KIND.as_str(),
            item.id()
        );
        Err(err)
    }

    /// Serializes the whole collection to storage. Failures are logged and
    /// leave memory untouched.
    fn persist(&self) -> bool {
        let written = serde_json::to_string(&*self.items.borrow())
            .map_err(StorageError::from)
            .and_then(|json| self.ctx.storage.set(&self.storage_key, &json));
        match written {
            Ok(()) => true,
            Err(err) => {
                error!(
                    "event=store_persist module=store status=error kind={} key={} error={err}",
                    E::KIND.as_str(),
                    self.storage_key
                );
                false
            }
        }
    }
}

fn read_collection<E: Entity>(ctx: &StoreContext, key: &str) -> Vec<E> {
    let kind = E::KIND.as_str();
    let raw = match ctx.storage.get(key) {
        Ok(Some(raw)) if !raw.trim().is_empty() => raw,
        Ok(_) => {
            debug!("event=store_load module=store status=empty kind={kind} key={key}");
            return Vec::new();
        }
        Err(err) => {
            error!(
                "event=store_load module=store status=error kind={kind} key={key} error_code=storage_read_failed error={err}"
            );
            return Vec::new();
        }
    };

    match decode_collection::<E>(&raw) {
        Ok(decoded) => {
            if decoded.dropped > 0 {
                warn!(
                    "event=store_load module=store status=degraded kind={kind} key={key} dropped={}",
                    decoded.dropped
                );
            }
            info!(
                "event=store_load module=store status=ok kind={kind} key={key} count={} legacy={}",
                decoded.items.len(),
                decoded.legacy
            );
            decoded.items
        }
        Err(err) => {
            error!(
                "event=store_load module=store status=error kind={kind} key={key} error_code=corrupt_collection error={err}"
            );
            Vec::new()
        }
    }
}
