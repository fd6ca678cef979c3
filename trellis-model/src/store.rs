//! Type-level stores: canonical record cells, dual indexes, finders, and
//! bulk operations.
//!
//! A `Store` is a cheap handle; clones share one canonical map, one id
//! index, and one event bus. Internal locks are short and never held
//! while hooks, predicates, or event callbacks run, so callbacks may
//! re-enter any store operation.

use crate::error::{ModelError, ModelResult};
use crate::event::StoreEvent;
use crate::hooks::{HooksCapability, RecordHooks};
use crate::record::{record_id_value, Record, SaveOptions};
use crate::schema::Schema;
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};
use trellis_bus::{Capability, EventBus, Observable};
use trellis_types::{channel, Attributes, ClientId, RecordId};

/// Options for [`Store::refresh`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RefreshOptions {
    /// Drop existing records first, silently. Off by default.
    pub clear: bool,
}

impl RefreshOptions {
    /// Replaces the store contents instead of appending.
    #[must_use]
    pub const fn clearing() -> Self {
        Self { clear: true }
    }
}

/// The store-owned cell behind every saved record. Never handed out
/// mutably; records project it.
pub(crate) struct Canonical {
    pub(crate) cid: ClientId,
    pub(crate) id: RecordId,
    pub(crate) attrs: Mutex<Attributes>,
}

struct StoreState {
    schema: Schema,
    /// Persisted id to client id. Insertion order is record age.
    records: IndexMap<RecordId, ClientId>,
    /// Client id to canonical cell; the owning map.
    crecords: IndexMap<ClientId, Arc<Canonical>>,
    counter: u64,
    hooks: Vec<Arc<dyn RecordHooks>>,
}

impl StoreState {
    fn mint(&mut self) -> ClientId {
        loop {
            let candidate = ClientId::new(self.counter);
            self.counter += 1;
            let taken = self.crecords.contains_key(&candidate)
                || self.records.contains_key(&candidate.to_record_id());
            if !taken {
                return candidate;
            }
        }
    }

    fn lookup(&self, id: &RecordId) -> Option<Arc<Canonical>> {
        if let Some(cid) = self.records.get(id) {
            return self.crecords.get(cid).cloned();
        }
        // ids in the client format may only be known by their cid
        ClientId::parse(id.as_str())
            .ok()
            .and_then(|cid| self.crecords.get(&cid).cloned())
    }

    /// Admits one wholesale attribute object: mints a client id, takes
    /// the `id` key as the persisted id (client id when absent), and
    /// keeps the remaining keys verbatim, declared or not.
    fn insert_value(&mut self, mut attrs: Attributes) -> Arc<Canonical> {
        let cid = self.mint();
        let id = attrs
            .remove("id")
            .as_ref()
            .and_then(record_id_value)
            .unwrap_or_else(|| cid.to_record_id());
        let canonical = Arc::new(Canonical {
            cid: cid.clone(),
            id: id.clone(),
            attrs: Mutex::new(attrs),
        });
        self.crecords.insert(cid.clone(), Arc::clone(&canonical));
        self.records.insert(id, cid);
        canonical
    }
}

struct StoreInner {
    bus: EventBus<StoreEvent>,
    state: Mutex<StoreState>,
}

/// Handle to one entity type's records.
///
/// Stores are explicit instances, never global: construct one per entity
/// type and pass the handle around. Clones share the same contents and
/// bus. Records come out in insertion order, oldest first.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Observable for Store {
    type Payload = StoreEvent;

    fn events(&self) -> &EventBus<StoreEvent> {
        &self.inner.bus
    }
}

impl Store {
    /// Creates an empty store for `schema`. The type name must be
    /// non-empty.
    pub fn new(schema: Schema) -> ModelResult<Self> {
        if schema.name.is_empty() {
            return Err(ModelError::MissingArgument("name"));
        }
        Ok(Self {
            inner: Arc::new(StoreInner {
                bus: EventBus::new(),
                state: Mutex::new(StoreState {
                    schema,
                    records: IndexMap::new(),
                    crecords: IndexMap::new(),
                    counter: 0,
                    hooks: Vec::new(),
                }),
            }),
        })
    }

    /// Re-initializes the store for `schema`: contents, installed hooks,
    /// and every subscription are dropped. The client id counter carries
    /// over, so ids stay unique for the process lifetime.
    pub fn configure(&self, schema: Schema) -> ModelResult<()> {
        if schema.name.is_empty() {
            return Err(ModelError::MissingArgument("name"));
        }
        let name = {
            let mut state = self.state();
            state.schema = schema;
            state.records.clear();
            state.crecords.clear();
            state.hooks.clear();
            state.schema.name.clone()
        };
        self.inner.bus.unbind_all();
        debug!("configured store {}", name);
        Ok(())
    }

    /// The entity type name.
    #[must_use]
    pub fn name(&self) -> String {
        self.state().schema.name.clone()
    }

    /// A copy of the schema this store was configured with.
    #[must_use]
    pub fn schema(&self) -> Schema {
        self.state().schema.clone()
    }

    /// Mints the next client id, skipping any value the store already
    /// holds under either index.
    #[must_use]
    pub fn mint_client_id(&self) -> ClientId {
        self.state().mint()
    }

    // ── construction & writes ─────────────────────────────────────

    /// Constructs an unsaved record of this type with a fresh client id.
    /// An `id` key in `attrs` becomes the persisted id.
    #[must_use]
    pub fn build(&self, attrs: Attributes) -> Record {
        let mut record = Record::unsaved(self.clone(), self.mint_client_id());
        record.load(attrs);
        record
    }

    /// Builds and saves in one step. Answers `Ok(None)` when validation
    /// rejected the record.
    pub fn create(&self, attrs: Attributes, options: SaveOptions) -> ModelResult<Option<Record>> {
        let mut record = self.build(attrs);
        record.save(options)
    }

    /// Loads `attrs` onto the record known by `id` and saves it.
    pub fn update(
        &self,
        id: &RecordId,
        attrs: Attributes,
        options: SaveOptions,
    ) -> ModelResult<Option<Record>> {
        let mut record = self.find(id)?;
        record.load(attrs);
        record.save(options)
    }

    /// Destroys the record known by `id`, with the full cascade.
    pub fn destroy(&self, id: &RecordId) -> ModelResult<Record> {
        let mut record = self.find(id)?;
        record.destroy()
    }

    // ── finders ───────────────────────────────────────────────────

    /// The record known by `id`.
    ///
    /// Ids in the client format fall back to the canonical map, so a
    /// record saved without a backend id is found under its client id.
    pub fn find(&self, id: &RecordId) -> ModelResult<Record> {
        let canonical = self.state().lookup(id);
        match canonical {
            Some(canonical) => Ok(Record::projection_of(self.clone(), canonical)),
            None => Err(ModelError::UnknownRecord(id.clone())),
        }
    }

    /// Probe form of [`Store::find`].
    #[must_use]
    pub fn exists(&self, id: &RecordId) -> bool {
        self.state().lookup(id).is_some()
    }

    /// Projections of every record, oldest first.
    #[must_use]
    pub fn all(&self) -> Vec<Record> {
        let state = self.state();
        state
            .crecords
            .values()
            .map(|canonical| Record::projection_of(self.clone(), Arc::clone(canonical)))
            .collect()
    }

    /// The oldest record still in the store.
    #[must_use]
    pub fn first(&self) -> Option<Record> {
        let state = self.state();
        state
            .crecords
            .values()
            .next()
            .map(|canonical| Record::projection_of(self.clone(), Arc::clone(canonical)))
    }

    /// The newest record in the store.
    #[must_use]
    pub fn last(&self) -> Option<Record> {
        let state = self.state();
        state
            .crecords
            .values()
            .next_back()
            .map(|canonical| Record::projection_of(self.clone(), Arc::clone(canonical)))
    }

    /// Number of records.
    #[must_use]
    pub fn count(&self) -> usize {
        self.state().crecords.len()
    }

    /// True when the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state().crecords.is_empty()
    }

    /// Runs `action` over a projection of every record. The iteration
    /// walks a snapshot, so the action may mutate the store freely.
    pub fn each(&self, mut action: impl FnMut(&Record)) {
        for record in self.all() {
            action(&record);
        }
    }

    /// Projections of the records matching `predicate`.
    pub fn select(&self, predicate: impl Fn(&Record) -> bool) -> Vec<Record> {
        self.all()
            .into_iter()
            .filter(|record| predicate(record))
            .collect()
    }

    /// The oldest record whose `name` attribute equals `value`.
    #[must_use]
    pub fn find_by_attribute(&self, name: &str, value: &Value) -> Option<Record> {
        self.all()
            .into_iter()
            .find(|record| record.read(name).as_ref() == Some(value))
    }

    /// Every record whose `name` attribute equals `value`, oldest first.
    #[must_use]
    pub fn find_all_by_attribute(&self, name: &str, value: &Value) -> Vec<Record> {
        self.all()
            .into_iter()
            .filter(|record| record.read(name).as_ref() == Some(value))
            .collect()
    }

    // ── bulk loading & serialization ──────────────────────────────

    /// Admits attribute objects wholesale, minting fresh client ids, and
    /// announces the batch once on the `refresh` channel. No per-record
    /// events fire, and clearing first is silent too.
    ///
    /// Values without an `id` key get their client id as persisted id.
    pub fn refresh(&self, values: Vec<Attributes>, options: RefreshOptions) -> Vec<Record> {
        let (records, name) = {
            let mut state = self.state();
            if options.clear {
                state.records.clear();
                state.crecords.clear();
            }
            let records: Vec<Record> = values
                .into_iter()
                .map(|attrs| {
                    let canonical = state.insert_value(attrs);
                    Record::projection_of(self.clone(), canonical)
                })
                .collect();
            (records, state.schema.name.clone())
        };
        debug!("refreshed {} with {} records", name, records.len());
        self.trigger(channel::REFRESH, &StoreEvent::Batch(records.clone()));
        records
    }

    /// [`Store::refresh`] from a JSON blob holding one attribute object
    /// or an array of them.
    pub fn refresh_json(&self, json: &str, options: RefreshOptions) -> ModelResult<Vec<Record>> {
        let parsed: Value = serde_json::from_str(json)?;
        let values = match parsed {
            Value::Object(map) => vec![map],
            Value::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Object(map) => values.push(map),
                        other => {
                            return Err(ModelError::InvalidData(format!(
                                "expected attribute objects, got {}",
                                value_kind(&other)
                            )));
                        }
                    }
                }
                values
            }
            other => {
                return Err(ModelError::InvalidData(format!(
                    "expected an object or an array of objects, got {}",
                    value_kind(&other)
                )));
            }
        };
        Ok(self.refresh(values, options))
    }

    /// Serializes every record as an array of attribute objects. The
    /// output round-trips through [`Store::refresh_json`].
    pub fn to_json(&self) -> ModelResult<String> {
        Ok(serde_json::to_string(&self.all())?)
    }

    // ── bulk removal ──────────────────────────────────────────────

    /// Drops every record silently: no per-record cascades, no
    /// `refresh`.
    pub fn delete_all(&self) {
        let name = {
            let mut state = self.state();
            state.records.clear();
            state.crecords.clear();
            state.schema.name.clone()
        };
        debug!("deleted all {} records", name);
    }

    /// Destroys every record individually, with the full per-record
    /// cascade. Records a callback already removed mid-pass are skipped.
    pub fn destroy_all(&self) {
        for mut record in self.all() {
            if let Err(error) = record.destroy() {
                warn!("skipping record during destroy_all: {}", error);
            }
        }
    }

    // ── composition ───────────────────────────────────────────────

    /// Installs hook bundles consulted by every record of this type,
    /// running each bundle's `included` hook after installation.
    pub fn include(&self, hooks: Vec<Arc<dyn RecordHooks>>) -> ModelResult<()> {
        let capabilities: Vec<Arc<dyn Capability<Store>>> = hooks
            .into_iter()
            .map(|bundle| Arc::new(HooksCapability(bundle)) as Arc<dyn Capability<Store>>)
            .collect();
        trellis_bus::include(self, capabilities)?;
        Ok(())
    }

    /// Installs type-surface capability bundles (persistence adapters,
    /// sync collaborators), running each bundle's `extended` hook after
    /// installation.
    pub fn extend(&self, capabilities: Vec<Arc<dyn Capability<Store>>>) -> ModelResult<()> {
        trellis_bus::extend(self, capabilities)?;
        Ok(())
    }

    // ── record plumbing ───────────────────────────────────────────

    pub(crate) fn register_hooks(&self, hooks: Arc<dyn RecordHooks>) {
        self.state().hooks.push(hooks);
    }

    pub(crate) fn hooks(&self) -> Vec<Arc<dyn RecordHooks>> {
        self.state().hooks.clone()
    }

    pub(crate) fn attribute_names(&self) -> Vec<String> {
        self.state().schema.attributes.clone()
    }

    /// Runs validators in installation order; the first rejection wins.
    pub(crate) fn run_validators(&self, record: &Record) -> Result<(), String> {
        for hooks in self.hooks() {
            hooks.validate(record)?;
        }
        Ok(())
    }

    pub(crate) fn contains_id(&self, id: &RecordId) -> bool {
        self.state().records.contains_key(id)
    }

    pub(crate) fn same_store(&self, other: &Store) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn insert_canonical(
        &self,
        cid: &ClientId,
        id: &RecordId,
        attrs: Attributes,
    ) -> Arc<Canonical> {
        let (canonical, name) = {
            let mut state = self.state();
            let canonical = Arc::new(Canonical {
                cid: cid.clone(),
                id: id.clone(),
                attrs: Mutex::new(attrs),
            });
            state.crecords.insert(cid.clone(), Arc::clone(&canonical));
            state.records.insert(id.clone(), cid.clone());
            (canonical, state.schema.name.clone())
        };
        debug!("created {} record {} ({})", name, id, cid);
        canonical
    }

    pub(crate) fn load_canonical(
        &self,
        id: &RecordId,
        attrs: Attributes,
    ) -> ModelResult<Arc<Canonical>> {
        let (canonical, name) = {
            let state = self.state();
            let Some(canonical) = state.lookup(id) else {
                return Err(ModelError::UnknownRecord(id.clone()));
            };
            {
                let mut cell = canonical.attrs.lock().unwrap();
                for (key, value) in attrs {
                    cell.insert(key, value);
                }
            }
            (canonical, state.schema.name.clone())
        };
        debug!("updated {} record {}", name, id);
        Ok(canonical)
    }

    pub(crate) fn remove_canonical(&self, cid: &ClientId) -> ModelResult<Arc<Canonical>> {
        let (canonical, name) = {
            let mut state = self.state();
            let Some(canonical) = state.crecords.shift_remove(cid) else {
                return Err(ModelError::UnknownRecord(cid.to_record_id()));
            };
            state.records.shift_remove(&canonical.id);
            (canonical, state.schema.name.clone())
        };
        debug!("destroyed {} record {} ({})", name, canonical.id, cid);
        Ok(canonical)
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.inner.state.lock().unwrap()
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.state.try_lock() {
            Ok(state) => f
                .debug_struct("Store")
                .field("name", &state.schema.name)
                .field("records", &state.crecords.len())
                .finish(),
            Err(_) => f.debug_struct("Store").finish_non_exhaustive(),
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
