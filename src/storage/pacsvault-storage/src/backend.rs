//! Object-store trait definition.

use async_trait::async_trait;

use crate::error::StorageError;

/// Byte-level contract implemented by every storage backend.
///
/// Objects are immutable blobs addressed by an opaque identifier; a second
/// `write` to the same identifier replaces the previous content.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores the full content of an object.
    async fn write(&self, id: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Reads the full content of an object.
    async fn read(&self, id: &str) -> Result<Vec<u8>, StorageError>;

    /// Reads `length` bytes of an object starting at `offset`.
    async fn read_range(&self, id: &str, offset: u64, length: u64)
        -> Result<Vec<u8>, StorageError>;

    /// Deletes an object. Deleting an absent object is not an error.
    async fn delete(&self, id: &str) -> Result<(), StorageError>;

    /// Returns the size of an object in bytes.
    async fn size(&self, id: &str) -> Result<u64, StorageError>;

    /// Checks whether an object exists.
    async fn exists(&self, id: &str) -> Result<bool, StorageError> {
        match self.size(id).await {
            Ok(_) => Ok(true),
            Err(StorageError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
