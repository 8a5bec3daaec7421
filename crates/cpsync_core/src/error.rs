//! Error types for cpsync core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur when building or parsing entity model values.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Object key is not of the form `name` or `namespace/name`.
    #[error("invalid object key: {input:?}")]
    InvalidKey {
        /// The rejected input.
        input: String,
    },

    /// Entity kind name is not one of the supported kinds.
    #[error("unknown entity kind: {name}")]
    UnknownKind {
        /// The rejected kind name.
        name: String,
    },
}
