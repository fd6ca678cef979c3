use serde::{Deserialize, Serialize};

/// Declares an entity type: its name and the attribute names its records
/// carry.
///
/// Declared attributes are the persistence contract. Records may hold
/// extra keys locally, but only declared attributes (plus `id`) appear in
/// [`Record::attributes`](crate::Record::attributes) and survive a save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    pub attributes: Vec<String>,
}

impl Schema {
    /// Creates a schema for `name` with the given declared attributes.
    #[must_use]
    pub fn new(name: impl Into<String>, attributes: &[&str]) -> Self {
        Self {
            name: name.into(),
            attributes: attributes.iter().map(|a| (*a).to_string()).collect(),
        }
    }

    /// True when `name` is a declared attribute of this type.
    #[must_use]
    pub fn declares(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a == name)
    }
}
