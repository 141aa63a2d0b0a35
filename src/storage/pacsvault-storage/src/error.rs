//! Storage error types.

use thiserror::Error;

/// Errors that can occur during object-store operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Object not found.
    #[error("object not found: {0}")]
    NotFound(String),

    /// Object identifier is not acceptable to the backend.
    #[error("invalid object id: {0}")]
    InvalidObjectId(String),

    /// Range reads are not available for this store.
    #[error("range read not supported for object '{0}'")]
    RangeNotSupported(String),

    /// Encryption or decryption of an object failed.
    #[error("encryption error for object '{object}': {reason}")]
    Encryption {
        /// Identifier of the object being processed.
        object: String,
        /// What went wrong.
        reason: String,
    },

    /// Generic I/O error.
    #[error("io error: {0}")]
    Io(String),
}
