//! Core type definitions for Trellis.
//!
//! This crate defines the fundamental, store-agnostic types used throughout
//! the data layer:
//! - Client and record identifiers
//! - The lifecycle event vocabulary (channel names, change kinds)
//! - The `Attributes` map records serialize to and from
//!
//! Everything domain-specific (which entity types exist, what their
//! attributes mean) belongs to the application, not here.

mod event;
mod ids;

pub use event::{channel, ChangeKind};
pub use ids::{ClientId, RecordId};

/// Attribute map a record's declared state serializes to and from.
///
/// Keys are declared attribute names plus `"id"` once assigned; values are
/// arbitrary JSON.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid client id: {0}")]
    InvalidClientId(String),

    #[error("record id cannot be empty")]
    EmptyRecordId,
}
