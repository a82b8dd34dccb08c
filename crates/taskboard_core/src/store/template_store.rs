//! Template collection with a single active template.
//!
//! # Responsibility
//! - Seed built-in templates on first run.
//! - Keep exactly one template active and hand it to the presentation
//!   collaborator.
//! - Mirror the active id into the legacy current-template pointer key.
//!
//! # Invariants
//! - After `load` and after every public mutation, exactly one template has
//!   `active = true` (given a non-empty collection).
//! - Protected templates (`is_default`) are never removed.
//! - `active` changes only through `activate` or the fallback performed when
//!   the active template is removed.

use crate::events::{ChangeAction, EntityKind, EntitySnapshot};
use crate::model::template::{builtin_templates, ColorScheme, Template, DARK_TEMPLATE_ID};
use crate::store::codec::{FieldAlias, FieldRecord};
use crate::store::entity_store::{Entity, EntityHooks, EntityStore, Mutation};
use crate::store::{InvariantViolation, StoreContext, StoreError, StoreResult};
use log::{error, info, warn};
use serde_json::Value;
use std::rc::Rc;

const TEMPLATE_FIELDS: &[FieldAlias] = &[
    FieldAlias::new("id", "_id"),
    FieldAlias::new("active", "_active"),
    FieldAlias::new("name", "_name"),
    FieldAlias::new("colors", "_colors"),
    FieldAlias::new("description", "_description"),
    FieldAlias::new("default", "_default"),
];

/// Presentation-side consumer of the active palette.
pub trait TemplatePresenter {
    fn apply(&self, template: &Template);
}

impl Entity for Template {
    const KIND: EntityKind = EntityKind::Template;
    const FIELD_ALIASES: &'static [FieldAlias] = TEMPLATE_FIELDS;

    fn id(&self) -> &str {
        &self.id
    }

    fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot::Template(self.clone())
    }

    fn from_record(record: &FieldRecord<'_>) -> Option<Self> {
        Some(Self {
            id: record.string("id")?,
            active: record.bool("active").unwrap_or(false),
            name: record.string("name")?,
            colors: decode_colors(record.value("colors")?)?,
            description: record.string("description"),
            is_default: record.bool("default").unwrap_or(false),
        })
    }

    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Reads a palette object, filling missing slots from the dark built-in.
fn decode_colors(value: &Value) -> Option<ColorScheme> {
    let object = value.as_object()?;
    let mut colors = builtin_templates()
        .into_iter()
        .find(|template| template.id == DARK_TEMPLATE_ID)?
        .colors;
    let slots: [(&str, &mut String); 9] = [
        ("primary", &mut colors.primary),
        ("variant", &mut colors.variant),
        ("text-100", &mut colors.text_100),
        ("text-200", &mut colors.text_200),
        ("text-300", &mut colors.text_300),
        ("text-400", &mut colors.text_400),
        ("bg-100", &mut colors.bg_100),
        ("bg-200", &mut colors.bg_200),
        ("bg-300", &mut colors.bg_300),
    ];
    for (name, slot) in slots {
        if let Some(color) = object.get(name).and_then(Value::as_str) {
            *slot = color.to_string();
        }
    }
    Some(colors)
}

/// Name validation and built-in protection.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateHooks;

impl EntityHooks<Template> for TemplateHooks {
    fn validate(&self, template: &Template, mutation: Mutation) -> StoreResult<()> {
        match mutation {
            Mutation::Add | Mutation::Update => template.validate().map_err(Into::into),
            Mutation::Remove if template.is_default => {
                Err(InvariantViolation::DefaultTemplateProtected(template.id.clone()).into())
            }
            Mutation::Remove => Ok(()),
        }
    }
}

pub struct TemplateStore {
    inner: EntityStore<Template, TemplateHooks>,
    pointer_key: String,
    presenter: Option<Rc<dyn TemplatePresenter>>,
}

impl TemplateStore {
    /// Loads templates, seeds built-ins into an empty collection, repairs the
    /// active flag and applies the active template.
    pub fn load(
        ctx: StoreContext,
        storage_key: impl Into<String>,
        pointer_key: impl Into<String>,
        presenter: Option<Rc<dyn TemplatePresenter>>,
    ) -> Self {
        let store = Self {
            inner: EntityStore::load(ctx, storage_key, TemplateHooks),
            pointer_key: pointer_key.into(),
            presenter,
        };
        if store.inner.is_empty() {
            store.seed_builtins();
        }
        store.normalize_active();
        if let Some(active) = store.active_template() {
            store.present(&active);
        }
        store
    }

    pub fn list(&self) -> Vec<Template> {
        self.inner.list()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn find_by_id(&self, id: &str) -> Option<Template> {
        self.inner.find_by_id(id)
    }

    /// The single active template; `None` only for an empty collection.
    pub fn active_template(&self) -> Option<Template> {
        self.inner.find(|template| template.active)
    }

    /// Id stored under the legacy current-template pointer key.
    pub fn current_template_pointer(&self) -> Option<String> {
        match self.inner.context().storage.get(&self.pointer_key) {
            Ok(value) => value,
            Err(err) => {
                error!(
                    "event=template_pointer_read module=store status=error key={} error={err}",
                    self.pointer_key
                );
                None
            }
        }
    }

    /// Adds a template as inactive.
    pub fn add(&self, mut template: Template) -> StoreResult<()> {
        template.active = false;
        self.inner.add(template)
    }

    /// Replaces name, palette and description, keeping the stored `active`
    /// and `default` flags.
    pub fn update(&self, mut template: Template) -> StoreResult<bool> {
        let Some(existing) = self.inner.find_by_id(&template.id) else {
            return Ok(false);
        };
        template.active = existing.active;
        template.is_default = existing.is_default;
        let updated = self.inner.update(template.clone())?;
        if updated && template.active {
            self.present(&template);
        }
        Ok(updated)
    }

    /// Removes a custom template. Removing the active one first activates a
    /// fallback (first protected template, else first remaining one).
    pub fn remove(&self, id: &str) -> StoreResult<Option<Template>> {
        let Some(target) = self.inner.find_by_id(id) else {
            return Ok(None);
        };
        if target.is_default {
            // Let the hook produce and log the refusal.
            return self.inner.remove(id);
        }
        if target.active {
            let fallback = self
                .inner
                .find(|template| template.id != id && template.is_default)
                .or_else(|| self.inner.find(|template| template.id != id));
            let Some(fallback) = fallback else {
                warn!(
                    "event=template_remove module=store status=refused id={id} reason=last_template"
                );
                return Err(InvariantViolation::LastTemplateProtected(id.to_string()).into());
            };
            self.activate(&fallback.id)?;
        }
        self.inner.remove(id)
    }

    /// Makes `id` the only active template, persists the collection and the
    /// pointer, applies it and publishes `templateActiveChanged`.
    pub fn activate(&self, id: &str) -> StoreResult<Template> {
        let Some(mut target) = self.inner.find_by_id(id) else {
            return Err(StoreError::UnknownEntity {
                kind: EntityKind::Template,
                id: id.to_string(),
            });
        };
        target.active = true;

        self.inner.rewrite(|templates| {
            let mut changed = false;
            for template in templates.iter_mut() {
                let active = template.id == id;
                changed |= template.active != active;
                template.active = active;
            }
            changed
        });
        self.write_pointer(id);
        info!("event=template_activate module=store status=ok id={id}");
        self.present(&target);
        self.inner
            .publish(ChangeAction::ActiveChanged, Some(&target));
        Ok(target)
    }

    fn seed_builtins(&self) {
        for template in builtin_templates() {
            let id = template.id.clone();
            // Seeds bypass `add` so the built-in active flag survives.
            if let Err(err) = self.inner.add(template) {
                error!("event=template_seed module=store status=error id={id} error={err}");
            }
        }
        info!(
            "event=template_seed module=store status=ok count={}",
            self.inner.len()
        );
    }

    /// Repairs zero or multiple active flags left by older data.
    fn normalize_active(&self) {
        let pointer = self.current_template_pointer();
        let repaired = self.inner.rewrite(|templates| {
            let active_count = templates.iter().filter(|template| template.active).count();
            if active_count == 1 || templates.is_empty() {
                return false;
            }
            let keep = if active_count > 1 {
                templates.iter().position(|template| template.active)
            } else {
                pointer
                    .as_deref()
                    .and_then(|id| templates.iter().position(|template| template.id == id))
                    .or_else(|| templates.iter().position(|template| template.is_default))
                    .or(Some(0))
            };
            for (index, template) in templates.iter_mut().enumerate() {
                template.active = Some(index) == keep;
            }
            true
        });
        if repaired {
            warn!("event=template_normalize module=store status=repaired");
        }
        if let Some(active) = self.active_template() {
            if pointer.as_deref() != Some(active.id.as_str()) {
                self.write_pointer(&active.id);
            }
        }
    }

    fn write_pointer(&self, id: &str) {
        if let Err(err) = self.inner.context().storage.set(&self.pointer_key, id) {
            error!(
                "event=template_pointer_write module=store status=error key={} error={err}",
                self.pointer_key
            );
        }
    }

    fn present(&self, template: &Template) {
        if let Some(presenter) = &self.presenter {
            presenter.apply(template);
        }
    }
}
