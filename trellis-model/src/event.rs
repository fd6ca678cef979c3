//! Payloads delivered on a store's bus.
//!
//! Every channel of a store carries the same payload type, so one
//! subscriber can watch several channels with a single callback. Records
//! inside a payload are projections; mutating them never touches the
//! store.

use crate::record::Record;
use serde::Serialize;
use std::slice;
use trellis_types::ChangeKind;

/// What a store announces on its channels.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum StoreEvent {
    /// A single record crossing a lifecycle channel.
    Record(Record),

    /// A record mutation on the `change` channel, tagged with what
    /// happened.
    Change { record: Record, kind: ChangeKind },

    /// The projection set published by a refresh.
    Batch(Vec<Record>),

    /// A record that failed validation, with the rejection message.
    Invalid { record: Record, message: String },
}

impl StoreEvent {
    /// The single record this event is about, if it is about one.
    ///
    /// Batch payloads answer `None`, which is what keeps them out of
    /// record-scoped subscriptions.
    #[must_use]
    pub fn record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) | Self::Change { record, .. } | Self::Invalid { record, .. } => {
                Some(record)
            }
            Self::Batch(_) => None,
        }
    }

    /// Every record the event carries.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        match self {
            Self::Record(record) | Self::Change { record, .. } | Self::Invalid { record, .. } => {
                slice::from_ref(record)
            }
            Self::Batch(records) => records,
        }
    }

    /// The change kind, when this is a `change` payload.
    #[must_use]
    pub fn kind(&self) -> Option<ChangeKind> {
        match self {
            Self::Change { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// The validation message, when this is an `error` payload.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Invalid { message, .. } => Some(message),
            _ => None,
        }
    }
}
