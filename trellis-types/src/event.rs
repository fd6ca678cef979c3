//! Event vocabulary shared by stores and their observers.
//!
//! Stores announce every lifecycle transition on named channels. The names
//! here are the contract between the core and whatever persistence, sync, or
//! rendering collaborator subscribes to them; the core never interprets them
//! beyond dispatch.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Channel names a store triggers over its lifetime.
///
/// `before_*` channels fire ahead of the mutation they announce; `change`
/// fires after every create, update, or destroy, tagged with a
/// [`ChangeKind`] so a collaborator can subscribe once. `unbind` is the
/// broadcast that dissolves record-scoped subscriptions when a record is
/// destroyed.
pub mod channel {
    /// Store contents were replaced or extended wholesale.
    pub const REFRESH: &str = "refresh";
    /// A record failed validation; payload carries the message.
    pub const ERROR: &str = "error";
    pub const BEFORE_SAVE: &str = "before_save";
    pub const SAVE: &str = "save";
    pub const BEFORE_CREATE: &str = "before_create";
    pub const CREATE: &str = "create";
    pub const BEFORE_UPDATE: &str = "before_update";
    pub const UPDATE: &str = "update";
    pub const BEFORE_DESTROY: &str = "before_destroy";
    pub const DESTROY: &str = "destroy";
    /// Fires after create, update, and destroy alike.
    pub const CHANGE: &str = "change";
    /// Dissolves record-scoped subscriptions for the destroyed record.
    pub const UNBIND: &str = "unbind";
}

/// Which mutation a `change` event announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Create,
    Update,
    Destroy,
}

impl ChangeKind {
    /// Returns the kind as its wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Destroy => "destroy",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
