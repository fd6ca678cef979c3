use crate::record::Record;
use crate::store::Store;
use serde_json::Value;
use std::sync::Arc;
use trellis_bus::Capability;

/// Shared behavior consulted by every record of a type.
///
/// Bundles install through [`Store::include`]. Most types need none of
/// this; implement it for input validation or computed attribute reads.
///
/// Validators run in installation order and the first failure rejects the
/// save. Attribute reads consult the newest installation first, so a later
/// include overrides an earlier one.
pub trait RecordHooks: Send + Sync {
    /// Validates a record ahead of a save. Return `Err(message)` to
    /// reject the write; the store reports it on the `error` channel and
    /// the save answers `Ok(None)`.
    fn validate(&self, record: &Record) -> Result<(), String> {
        let _ = record;
        Ok(())
    }

    /// Overrides the value [`Record::attributes`] reports for `name`.
    /// Return `None` to fall through to the record's own data.
    fn read_attribute(&self, record: &Record, name: &str) -> Option<Value> {
        let _ = (record, name);
        None
    }

    /// Runs once when the bundle is installed on a store.
    fn included(&self, store: &Store) {
        let _ = store;
    }
}

/// Routes a [`RecordHooks`] bundle through the capability seam.
pub(crate) struct HooksCapability(pub(crate) Arc<dyn RecordHooks>);

impl Capability<Store> for HooksCapability {
    fn install(self: Arc<Self>, host: &Store) {
        host.register_hooks(Arc::clone(&self.0));
    }

    fn included(&self, host: &Store) {
        self.0.included(host);
    }
}
