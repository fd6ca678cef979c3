//! Identifier types used throughout the Trellis core.
//!
//! Records carry two identities: a store-minted client id (`"c-"` plus a
//! decimal counter, unique within the process) and an optional persisted id
//! assigned by whatever backend the application syncs with. Until a backend
//! id arrives, the client id stands in for it.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Client-side identifier minted by a store when a record is built.
///
/// Format is `"c-"` followed by one or more ASCII digits. The id stays
/// stable for the lifetime of the record, across saves and backend id
/// assignment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Prefix that distinguishes client ids from backend-assigned ids.
    pub const PREFIX: &'static str = "c-";

    /// Creates a client id from a mint counter value.
    #[must_use]
    pub fn new(counter: u64) -> Self {
        Self(format!("{}{counter}", Self::PREFIX))
    }

    /// Parses a client id from a string, validating the full pattern.
    pub fn parse(s: &str) -> Result<Self, Error> {
        if Self::matches(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(Error::InvalidClientId(s.to_string()))
        }
    }

    /// Returns true when the string has the client id shape:
    /// the `"c-"` prefix followed by nothing but digits.
    #[must_use]
    pub fn matches(s: &str) -> bool {
        match s.strip_prefix(Self::PREFIX) {
            Some(digits) => !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()),
            None => false,
        }
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Converts this client id into a record id, for records that have
    /// never been assigned a backend id.
    #[must_use]
    pub fn to_record_id(&self) -> RecordId {
        RecordId(self.0.clone())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ClientId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Identifier a record is known by once saved: either a backend-assigned id
/// or the record's own client id carried over at creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Creates a record id from any string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parses a record id, rejecting the empty string.
    pub fn parse(s: &str) -> Result<Self, Error> {
        if s.is_empty() {
            Err(Error::EmptyRecordId)
        } else {
            Ok(Self(s.to_string()))
        }
    }

    /// Returns true when this id has the client id shape, meaning it was
    /// minted locally and never replaced by a backend id.
    #[must_use]
    pub fn is_client_format(&self) -> bool {
        ClientId::matches(&self.0)
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<ClientId> for RecordId {
    fn from(cid: ClientId) -> Self {
        Self(cid.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
