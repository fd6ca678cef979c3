//! Observable in-memory entity store for Trellis.
//!
//! The model layer ties the event and composition seams to typed record
//! storage:
//! - [`Schema`] declares an entity type's name and attributes
//! - [`Store`] holds the type's canonical records behind dual indexes
//!   and announces every lifecycle transition on its own bus
//! - [`Record`] is the value-typed projection application code holds
//! - [`RecordHooks`] composes validation and computed reads into a type
//! - [`StoreEvent`] is the payload every channel carries
//!
//! Persistence and network sit outside this crate: adapters subscribe
//! through [`Store::extend`] and the `Observable` seam, and the core
//! never calls out.

mod error;
mod event;
mod form;
mod hooks;
mod record;
mod schema;
mod store;

pub use error::{ModelError, ModelResult};
pub use event::StoreEvent;
pub use form::FormField;
pub use hooks::RecordHooks;
pub use record::{Record, SaveOptions};
pub use schema::Schema;
pub use store::{RefreshOptions, Store};
