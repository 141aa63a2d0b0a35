//! # Pacsvault Storage - Filesystem Backend
//!
//! Stores objects as plain files under a root directory.
//!
//! Two directory layouts are supported: `flat` puts every object directly
//! under the root, `legacy` nests objects two levels deep by the first four
//! characters of their id (`root/aa/bb/aabbccdd…`), matching archives
//! written by older deployments.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, info};

use pacsvault_storage::{ObjectStore, StorageError};

/// Directory layout of the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageStructure {
    /// All objects directly under the root directory.
    #[default]
    Flat,
    /// Two-level nesting by id prefix: `root/aa/bb/aabb…`.
    Legacy,
}

/// Filesystem implementation of [`ObjectStore`].
pub struct FilesystemStore {
    root: PathBuf,
    structure: StorageStructure,
    fsync: bool,
}

impl FilesystemStore {
    /// Opens (and creates if needed) an archive rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();

        std::fs::create_dir_all(&root)
            .map_err(|e| StorageError::Io(format!("failed to create '{}': {e}", root.display())))?;

        info!(root = %root.display(), "filesystem store ready");

        Ok(Self {
            root,
            structure: StorageStructure::default(),
            fsync: false,
        })
    }

    /// Selects the directory layout.
    pub fn with_structure(mut self, structure: StorageStructure) -> Self {
        self.structure = structure;
        self
    }

    /// Enables fsync after every write.
    pub fn with_fsync(mut self, fsync: bool) -> Self {
        self.fsync = fsync;
        self
    }

    /// Validates that an object id is safe to map onto a path.
    ///
    /// Only ASCII alphanumerics, `-`, `_` and non-leading `.` are accepted,
    /// so an id can never escape the root directory.
    fn validate_object_id(&self, id: &str) -> Result<(), StorageError> {
        if id.is_empty() {
            return Err(StorageError::InvalidObjectId("id cannot be empty".into()));
        }

        if id.len() > 255 {
            return Err(StorageError::InvalidObjectId(format!(
                "id too long: {} chars",
                id.len()
            )));
        }

        if id.starts_with('.') {
            return Err(StorageError::InvalidObjectId(format!(
                "id cannot start with a dot: '{id}'"
            )));
        }

        let valid = id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');

        if !valid {
            return Err(StorageError::InvalidObjectId(format!(
                "id must match [A-Za-z0-9._-]+: '{id}'"
            )));
        }

        if self.structure == StorageStructure::Legacy && id.len() < 4 {
            return Err(StorageError::InvalidObjectId(format!(
                "id too short for the legacy layout: '{id}'"
            )));
        }

        Ok(())
    }

    fn object_path(&self, id: &str) -> Result<PathBuf, StorageError> {
        self.validate_object_id(id)?;

        let path = match self.structure {
            StorageStructure::Flat => self.root.join(id),
            StorageStructure::Legacy => self.root.join(&id[..2]).join(&id[2..4]).join(id),
        };

        Ok(path)
    }

    fn io_error(id: &str, err: std::io::Error) -> StorageError {
        if err.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(id.to_string())
        } else {
            StorageError::Io(format!("object '{id}': {err}"))
        }
    }
}

#[async_trait]
impl ObjectStore for FilesystemStore {
    async fn write(&self, id: &str, data: &[u8]) -> Result<(), StorageError> {
        let path = self.object_path(id)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Self::io_error(id, e))?;
        }

        let mut file = fs::File::create(&path)
            .await
            .map_err(|e| Self::io_error(id, e))?;
        file.write_all(data).await.map_err(|e| Self::io_error(id, e))?;

        if self.fsync {
            file.sync_all().await.map_err(|e| Self::io_error(id, e))?;
        }

        debug!(object = id, bytes = data.len(), "object written");

        Ok(())
    }

    async fn read(&self, id: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.object_path(id)?;

        fs::read(&path).await.map_err(|e| Self::io_error(id, e))
    }

    async fn read_range(
        &self,
        id: &str,
        offset: u64,
        length: u64,
    ) -> Result<Vec<u8>, StorageError> {
        let path = self.object_path(id)?;

        let mut file = fs::File::open(&path)
            .await
            .map_err(|e| Self::io_error(id, e))?;

        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| Self::io_error(id, e))?;

        let length = usize::try_from(length)
            .map_err(|_| StorageError::Io(format!("object '{id}': range too large")))?;

        let mut buffer = vec![0u8; length];
        file.read_exact(&mut buffer)
            .await
            .map_err(|e| Self::io_error(id, e))?;

        Ok(buffer)
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        let path = self.object_path(id)?;

        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(Self::io_error(id, e)),
        }

        if self.structure == StorageStructure::Legacy {
            // prune the two nesting directories if this was their last object
            if let Some(parent) = path.parent() {
                let _ = fs::remove_dir(parent).await;
                if let Some(grandparent) = parent.parent() {
                    let _ = fs::remove_dir(grandparent).await;
                }
            }
        }

        debug!(object = id, "object deleted");

        Ok(())
    }

    async fn size(&self, id: &str) -> Result<u64, StorageError> {
        let path = self.object_path(id)?;

        let metadata = fs::metadata(&path)
            .await
            .map_err(|e| Self::io_error(id, e))?;

        if !metadata.is_file() {
            return Err(StorageError::Io(format!(
                "object '{id}': path does not point to a regular file"
            )));
        }

        Ok(metadata.len())
    }
}
