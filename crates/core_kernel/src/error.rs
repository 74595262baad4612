//! Kernel error type

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Text that is neither `PREFIX-<uuid>` nor a bare UUID
    #[error("Invalid identifier {value:?}: {source}")]
    InvalidIdentifier {
        value: String,
        #[source]
        source: uuid::Error,
    },
}

impl CoreError {
    pub fn invalid_identifier(value: impl Into<String>, source: uuid::Error) -> Self {
        CoreError::InvalidIdentifier {
            value: value.into(),
            source,
        }
    }
}
