use trellis_types::RecordId;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur in store and record operations.
///
/// Validation failures are not errors: a rejected save is reported on the
/// store's `error` channel and surfaces as `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// An asserting lookup found no record known by this id.
    #[error("unknown record: {0}")]
    UnknownRecord(RecordId),

    /// A required argument was missing or empty.
    #[error("missing required argument: {0}")]
    MissingArgument(&'static str),

    /// Capability composition failed.
    #[error(transparent)]
    Compose(#[from] trellis_bus::ComposeError),

    /// JSON serialization or parsing failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A refresh blob parsed but had the wrong structure.
    #[error("invalid data: {0}")]
    InvalidData(String),
}
