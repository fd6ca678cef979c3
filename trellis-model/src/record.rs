//! Record values and their lifecycle cascades.
//!
//! A record is a projection over a canonical cell owned by its store:
//! reads fall through a local overlay to the cell, writes stay in the
//! overlay until a save publishes them. Cloning a record copies the
//! overlay, so clones are mutually isolated while sharing live
//! read-through of saved state.

use crate::error::{ModelError, ModelResult};
use crate::event::StoreEvent;
use crate::form::FormField;
use crate::store::{Canonical, Store};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::mem;
use std::sync::{Arc, Mutex};
use tracing::warn;
use trellis_bus::{bound, Binding, Flow, Observable};
use trellis_types::{channel, Attributes, ChangeKind, ClientId, RecordId};

/// Options for the save family of operations.
#[derive(Debug, Clone, Copy)]
pub struct SaveOptions {
    /// Run validation hooks ahead of the write. On by default.
    pub validate: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self { validate: true }
    }
}

impl SaveOptions {
    /// Skips the validation hooks for this save.
    #[must_use]
    pub const fn unvalidated() -> Self {
        Self { validate: false }
    }
}

/// Snapshot of a record's identity, used to filter a store's events down
/// to one record. Payloads arrive on the record's own store bus, so the
/// comparison is ids only.
#[derive(Clone)]
struct Identity {
    cid: ClientId,
    id: Option<RecordId>,
}

impl Identity {
    fn matches(&self, record: &Record) -> bool {
        self.cid == record.cid
            || match (&self.id, &record.id) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            }
    }
}

/// A value-typed view of one record.
///
/// New records live entirely in their overlay until the first save;
/// saved records read through to the canonical cell, so a projection
/// observes later saves without refetching. A destroyed record keeps its
/// last canonical cell readable even though the store no longer knows
/// the id.
#[derive(Clone)]
pub struct Record {
    store: Store,
    cid: ClientId,
    id: Option<RecordId>,
    canonical: Option<Arc<Canonical>>,
    overlay: Attributes,
    destroyed: bool,
}

impl Record {
    pub(crate) fn unsaved(store: Store, cid: ClientId) -> Self {
        Self {
            store,
            cid,
            id: None,
            canonical: None,
            overlay: Attributes::new(),
            destroyed: false,
        }
    }

    pub(crate) fn projection_of(store: Store, canonical: Arc<Canonical>) -> Self {
        Self {
            store,
            cid: canonical.cid.clone(),
            id: Some(canonical.id.clone()),
            canonical: Some(canonical),
            overlay: Attributes::new(),
            destroyed: false,
        }
    }

    // ── identity & state ──────────────────────────────────────────

    /// The store-minted client id, stable for the record's lifetime.
    #[must_use]
    pub fn cid(&self) -> &ClientId {
        &self.cid
    }

    /// The persisted id, once assigned.
    #[must_use]
    pub fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    /// The store this record belongs to.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// True until the first successful save.
    #[must_use]
    pub fn is_new(&self) -> bool {
        !self.destroyed && !self.is_persisted()
    }

    /// True while the store knows this record's id.
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        !self.destroyed
            && self
                .id
                .as_ref()
                .is_some_and(|id| self.store.contains_id(id))
    }

    /// True once the record went through a destroy. Terminal.
    #[must_use]
    pub fn destroyed(&self) -> bool {
        self.destroyed
    }

    /// Identity comparison: same store, and either the same client id or
    /// both persisted ids assigned and equal.
    #[must_use]
    pub fn equals(&self, other: &Record) -> bool {
        self.store.same_store(other.store())
            && (self.cid == other.cid
                || match (&self.id, &other.id) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                })
    }

    // ── attribute access ──────────────────────────────────────────

    /// Reads `name` from the overlay, falling through to the canonical
    /// cell. This is the raw view; hook overrides apply through
    /// [`Record::attributes`].
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.overlay.get(name) {
            return Some(value.clone());
        }
        self.canonical
            .as_ref()
            .and_then(|cell| cell.attrs.lock().unwrap().get(name).cloned())
    }

    /// Reads a string attribute.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<String> {
        self.get(name).and_then(|v| v.as_str().map(str::to_string))
    }

    /// Reads a boolean attribute.
    #[must_use]
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(|v| v.as_bool())
    }

    /// Reads a numeric attribute.
    #[must_use]
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(|v| v.as_f64())
    }

    /// Writes `name` into the overlay. The store sees nothing until a
    /// save publishes it.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.overlay.insert(name.into(), value.into());
    }

    /// Bulk-writes `attrs` into the overlay. An `id` key is not an
    /// attribute: it is adopted as the persisted id when the record has
    /// none and ignored otherwise.
    pub fn load(&mut self, attrs: Attributes) {
        for (name, value) in attrs {
            if name == "id" {
                self.adopt_id(&value);
            } else {
                self.overlay.insert(name, value);
            }
        }
    }

    /// Loads an ordered form field sequence; a later field overrides an
    /// earlier one of the same name. `id` fields follow the
    /// [`Record::load`] rule.
    pub fn load_form(&mut self, fields: Vec<FormField>) {
        for field in fields {
            if field.name == "id" {
                self.adopt_id(&field.value);
            } else {
                self.overlay.insert(field.name, field.value);
            }
        }
    }

    /// The declared attributes (hook overrides first, then overlay, then
    /// the canonical cell) plus `id` once assigned. This map is what
    /// serialization emits.
    #[must_use]
    pub fn attributes(&self) -> Attributes {
        let mut attrs = self.declared_attributes();
        if let Some(id) = &self.id {
            attrs.insert("id".to_string(), Value::String(id.as_str().to_string()));
        }
        attrs
    }

    /// Hook-applied read of a single attribute, the per-name view of
    /// [`Record::attributes`].
    pub(crate) fn read(&self, name: &str) -> Option<Value> {
        self.store
            .hooks()
            .iter()
            .rev()
            .find_map(|hooks| hooks.read_attribute(self, name))
            .or_else(|| self.get(name))
    }

    fn declared_attributes(&self) -> Attributes {
        let names = self.store.attribute_names();
        let hooks = self.store.hooks();
        let mut attrs = Attributes::new();
        for name in &names {
            let value = hooks
                .iter()
                .rev()
                .find_map(|hooks| hooks.read_attribute(self, name))
                .or_else(|| self.get(name));
            if let Some(value) = value {
                attrs.insert(name.clone(), value);
            }
        }
        attrs
    }

    /// The declared attributes as stored, without hook overrides. A save
    /// writes this view to the canonical cell; hooks shape reads only.
    fn raw_declared_attributes(&self) -> Attributes {
        let names = self.store.attribute_names();
        let mut attrs = Attributes::new();
        for name in &names {
            if let Some(value) = self.get(name) {
                attrs.insert(name.clone(), value);
            }
        }
        attrs
    }

    fn adopt_id(&mut self, value: &Value) {
        if self.id.is_none() {
            self.id = record_id_value(value);
        }
    }

    // ── lifecycle ─────────────────────────────────────────────────

    /// Publishes this record's state to the store.
    ///
    /// Validation hooks run first unless disabled; a rejection fires
    /// `error` and answers `Ok(None)` with the store untouched. A valid
    /// save fires `before_save`, creates or updates, then fires `save`,
    /// answering the fresh projection.
    pub fn save(&mut self, options: SaveOptions) -> ModelResult<Option<Record>> {
        if self.destroyed {
            return Err(ModelError::UnknownRecord(self.error_id()));
        }
        if options.validate {
            if let Err(message) = self.store.run_validators(self) {
                warn!(
                    "validation failed for {} record {}: {}",
                    self.store.name(),
                    self.cid,
                    message
                );
                let event = StoreEvent::Invalid {
                    record: self.clone(),
                    message,
                };
                self.store.trigger(channel::ERROR, &event);
                return Ok(None);
            }
        }
        self.store
            .trigger(channel::BEFORE_SAVE, &StoreEvent::Record(self.clone()));
        let saved = if self.is_new() {
            self.run_create()
        } else {
            self.run_update()?
        };
        self.store
            .trigger(channel::SAVE, &StoreEvent::Record(saved.clone()));
        Ok(Some(saved))
    }

    /// Writes one attribute and saves.
    pub fn update_attribute(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
        options: SaveOptions,
    ) -> ModelResult<Option<Record>> {
        self.set(name, value);
        self.save(options)
    }

    /// Bulk-writes attributes and saves.
    pub fn update_attributes(
        &mut self,
        attrs: Attributes,
        options: SaveOptions,
    ) -> ModelResult<Option<Record>> {
        self.load(attrs);
        self.save(options)
    }

    /// Removes this record from the store.
    ///
    /// Fires `before_destroy`, removes the canonical entry from both
    /// indexes, then fires `destroy`, `change`, and finally `unbind`,
    /// which dissolves record-scoped subscriptions. Destroying a record
    /// the store does not hold fails with
    /// [`ModelError::UnknownRecord`].
    pub fn destroy(&mut self) -> ModelResult<Record> {
        if self.destroyed {
            return Err(ModelError::UnknownRecord(self.error_id()));
        }
        self.store
            .trigger(channel::BEFORE_DESTROY, &StoreEvent::Record(self.clone()));
        let canonical = self.store.remove_canonical(&self.cid)?;
        // keep the final state readable on this value and its clones
        self.canonical = Some(canonical);
        self.destroyed = true;

        let gone = self.clone();
        self.store
            .trigger(channel::DESTROY, &StoreEvent::Record(gone.clone()));
        self.store.trigger(
            channel::CHANGE,
            &StoreEvent::Change {
                record: gone.clone(),
                kind: ChangeKind::Destroy,
            },
        );
        self.store
            .trigger(channel::UNBIND, &StoreEvent::Record(gone.clone()));
        Ok(gone)
    }

    /// Discards local writes and re-projects from the store.
    ///
    /// Records with no assigned id have nothing to reload and answer a
    /// clone of themselves; an assigned id the store no longer holds
    /// fails with [`ModelError::UnknownRecord`].
    pub fn reload(&mut self) -> ModelResult<Record> {
        let Some(id) = self.id.clone() else {
            return Ok(self.clone());
        };
        let fresh = self.store.find(&id)?;
        self.canonical = fresh.canonical.clone();
        self.overlay.clear();
        Ok(self.projection())
    }

    /// A new unsaved record carrying this record's attributes under a
    /// fresh identity.
    #[must_use]
    pub fn duplicate(&self) -> Record {
        let mut attrs = self.attributes();
        attrs.remove("id");
        self.store.build(attrs)
    }

    /// Like [`Record::duplicate`], but keeping this record's client id,
    /// so saving the copy continues the same identity.
    #[must_use]
    pub fn duplicate_preserving_identity(&self) -> Record {
        let mut copy = Record::unsaved(self.store.clone(), self.cid.clone());
        copy.load(self.attributes());
        copy
    }

    fn run_create(&mut self) -> Record {
        self.store
            .trigger(channel::BEFORE_CREATE, &StoreEvent::Record(self.clone()));
        let id = match &self.id {
            Some(id) => id.clone(),
            None => {
                // no backend id yet: the client id stands in
                let id = self.cid.to_record_id();
                self.id = Some(id.clone());
                id
            }
        };
        let attrs = self.raw_declared_attributes();
        let canonical = self.store.insert_canonical(&self.cid, &id, attrs);
        self.attach(canonical);

        let saved = self.projection();
        self.store
            .trigger(channel::CREATE, &StoreEvent::Record(saved.clone()));
        self.store.trigger(
            channel::CHANGE,
            &StoreEvent::Change {
                record: saved.clone(),
                kind: ChangeKind::Create,
            },
        );
        saved
    }

    fn run_update(&mut self) -> ModelResult<Record> {
        self.store
            .trigger(channel::BEFORE_UPDATE, &StoreEvent::Record(self.clone()));
        let id = self.id.clone().ok_or(ModelError::MissingArgument("id"))?;
        let attrs = self.raw_declared_attributes();
        let canonical = self.store.load_canonical(&id, attrs)?;
        self.attach(canonical);

        let saved = self.projection();
        self.store
            .trigger(channel::UPDATE, &StoreEvent::Record(saved.clone()));
        self.store.trigger(
            channel::CHANGE,
            &StoreEvent::Change {
                record: saved.clone(),
                kind: ChangeKind::Update,
            },
        );
        Ok(saved)
    }

    /// Points this value at `canonical` and drops the overlay entries it
    /// now covers. Undeclared overlay keys stay local.
    fn attach(&mut self, canonical: Arc<Canonical>) {
        let declared = self.store.attribute_names();
        self.overlay
            .retain(|name, _| !declared.iter().any(|d| d == name));
        self.canonical = Some(canonical);
    }

    fn projection(&self) -> Record {
        Record {
            store: self.store.clone(),
            cid: self.cid.clone(),
            id: self.id.clone(),
            canonical: self.canonical.clone(),
            overlay: Attributes::new(),
            destroyed: self.destroyed,
        }
    }

    fn error_id(&self) -> RecordId {
        self.id.clone().unwrap_or_else(|| self.cid.to_record_id())
    }

    // ── record-scoped subscriptions ───────────────────────────────

    /// Subscribes to the named channels of this record's store, filtered
    /// to events about this record. The subscription dissolves itself
    /// when the record's destroy is announced on `unbind`.
    pub fn bind(
        &self,
        names: &str,
        callback: impl Fn(&StoreEvent) -> Flow + Send + Sync + 'static,
    ) -> Binding {
        let identity = self.identity();
        let filter = bound(
            identity.clone(),
            move |me: &Identity, event: &StoreEvent| match event.record() {
                Some(record) if me.matches(record) => callback(event),
                _ => Flow::Continue,
            },
        );
        let binding = self.store.events().bind(names, filter);
        self.watch_unbind(identity, binding);
        binding
    }

    /// Like [`Record::bind`], but the subscription removes itself after
    /// the first event about this record. Events about other records
    /// pass through without consuming it.
    pub fn one(
        &self,
        names: &str,
        callback: impl Fn(&StoreEvent) -> Flow + Send + Sync + 'static,
    ) -> Binding {
        let identity = self.identity();
        let weak = self.store.events().downgrade();
        let cleanup: Arc<Mutex<Vec<Binding>>> = Arc::new(Mutex::new(Vec::new()));
        let slot = Arc::clone(&cleanup);
        let filter = identity.clone();
        let binding = self.store.events().bind(names, move |event: &StoreEvent| {
            if !event.record().is_some_and(|record| filter.matches(record)) {
                return Flow::Continue;
            }
            let tokens = mem::take(&mut *slot.lock().unwrap());
            if tokens.is_empty() {
                // an overlapping dispatch already consumed this registration
                return Flow::Continue;
            }
            if let Some(bus) = weak.upgrade() {
                for token in tokens {
                    bus.unbind_binding(token);
                }
            }
            callback(event)
        });
        let watcher = self.watch_unbind(identity, binding);
        cleanup.lock().unwrap().extend([binding, watcher]);
        binding
    }

    fn identity(&self) -> Identity {
        Identity {
            cid: self.cid.clone(),
            id: self.id.clone(),
        }
    }

    /// Companion subscription on the `unbind` channel: once this
    /// record's destroy is announced, it removes `protected` and then
    /// itself.
    fn watch_unbind(&self, identity: Identity, protected: Binding) -> Binding {
        let bus = self.store.events();
        let weak = bus.downgrade();
        let own: Arc<Mutex<Option<Binding>>> = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&own);
        let watcher = bus.bind(channel::UNBIND, move |event: &StoreEvent| {
            if event.record().is_some_and(|record| identity.matches(record)) {
                if let Some(bus) = weak.upgrade() {
                    bus.unbind_binding(protected);
                    if let Some(own) = slot.lock().unwrap().take() {
                        bus.unbind_binding(own);
                    }
                }
            }
            Flow::Continue
        });
        *own.lock().unwrap() = Some(watcher);
        watcher
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("cid", &self.cid)
            .field("id", &self.id)
            .field("overlay", &self.overlay)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

impl Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.attributes().serialize(serializer)
    }
}

/// Interprets a JSON value as a persisted id: non-empty strings and
/// numbers qualify, everything else reads as absent.
pub(crate) fn record_id_value(value: &Value) -> Option<RecordId> {
    match value {
        Value::String(s) if !s.is_empty() => Some(RecordId::new(s.clone())),
        Value::Number(n) => Some(RecordId::new(n.to_string())),
        _ => None,
    }
}
