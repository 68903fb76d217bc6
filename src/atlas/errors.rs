use thiserror::Error;

/// Errors that can arise while interacting with the atlas storage layer,
/// model, or wizard.
#[derive(Debug, Error)]
pub enum AtlasError {
    /// Wrapper around sled's error type. Persistence of the attempted
    /// mutation is treated as failed; in-memory state is rolled back.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Wrapper around IO errors (directory creation, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Corrupt stored blob or unparsable/unclassifiable import document.
    #[error("format error: {0}")]
    Format(String),

    /// Returned when addressing a pin, floor, or record that is not present.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rejected user input (empty wizard fields, duplicate pin ids, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The user declined the confirmation prompt for a destructive operation.
    #[error("operation cancelled")]
    Cancelled,
}

impl From<serde_json::Error> for AtlasError {
    fn from(err: serde_json::Error) -> Self {
        AtlasError::Format(err.to_string())
    }
}
