use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One named field from a submitted form.
///
/// Forms cross into the data layer as an ordered field sequence; a later
/// field overrides an earlier one of the same name. The shape is the whole
/// contract, there is no widget toolkit on this side of the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub value: Value,
}

impl FormField {
    /// Creates a field.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}
