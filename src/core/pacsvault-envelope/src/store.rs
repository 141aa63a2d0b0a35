//! Transparent encryption in front of any object store.
//!
//! Interposes the envelope cipher between callers and a backend: objects are
//! encrypted before they leave the process and decrypted on read. With no
//! cipher configured the wrapper is a plain passthrough, so hosts wire it in
//! unconditionally and let configuration decide.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use pacsvault_storage::{ObjectStore, StorageError};

use crate::cipher::EnvelopeCipher;
use crate::error::EnvelopeError;
use crate::frame::OVERHEAD_SIZE;

/// Suffix appended to the stored id of encrypted objects.
pub const ENCRYPTED_SUFFIX: &str = ".enc";

/// Object store wrapper that encrypts on write and decrypts on read.
///
/// Encrypted objects are stored under `{id}.enc`; their logical size is the
/// stored size minus the 86-byte frame overhead. Range reads are rejected
/// while encryption is active: the whole frame must be read to verify the
/// authentication tag, so callers must disable partial reads when they
/// enable encryption.
pub struct EncryptedObjectStore<S> {
    inner: S,
    cipher: Option<Arc<EnvelopeCipher>>,
}

impl<S: ObjectStore> EncryptedObjectStore<S> {
    /// Wraps a backend, encrypting when a cipher is supplied.
    pub fn new(inner: S, cipher: Option<Arc<EnvelopeCipher>>) -> Self {
        match &cipher {
            Some(cipher) => info!(
                master_key_id = cipher.key_store().current_master_key_id(),
                "client-side encryption is enabled"
            ),
            None => info!("client-side encryption is disabled"),
        }

        Self { inner, cipher }
    }

    /// Returns whether encryption is active.
    pub fn encryption_enabled(&self) -> bool {
        self.cipher.is_some()
    }

    fn stored_id(&self, id: &str) -> String {
        match self.cipher {
            Some(_) => format!("{id}{ENCRYPTED_SUFFIX}"),
            None => id.to_string(),
        }
    }

    fn crypto_error(id: &str, action: &str, source: EnvelopeError) -> StorageError {
        error!(object = id, error = %source, "error while {action} object");
        StorageError::Encryption {
            object: id.to_string(),
            reason: source.to_string(),
        }
    }
}

#[async_trait]
impl<S: ObjectStore> ObjectStore for EncryptedObjectStore<S> {
    async fn write(&self, id: &str, data: &[u8]) -> Result<(), StorageError> {
        let stored = self.stored_id(id);

        match &self.cipher {
            Some(cipher) => {
                let frame = cipher
                    .encrypt(data)
                    .await
                    .map_err(|e| Self::crypto_error(id, "encrypting", e))?;
                self.inner.write(&stored, &frame).await
            }
            None => self.inner.write(&stored, data).await,
        }
    }

    async fn read(&self, id: &str) -> Result<Vec<u8>, StorageError> {
        let stored = self.stored_id(id);
        let data = self.inner.read(&stored).await?;

        match &self.cipher {
            Some(cipher) => cipher
                .decrypt(&data)
                .await
                .map_err(|e| Self::crypto_error(id, "decrypting", e)),
            None => Ok(data),
        }
    }

    async fn read_range(
        &self,
        id: &str,
        offset: u64,
        length: u64,
    ) -> Result<Vec<u8>, StorageError> {
        if self.cipher.is_some() {
            // the whole frame is needed to verify the tag
            return Err(StorageError::RangeNotSupported(id.to_string()));
        }

        self.inner.read_range(id, offset, length).await
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        self.inner.delete(&self.stored_id(id)).await
    }

    async fn size(&self, id: &str) -> Result<u64, StorageError> {
        let stored = self.stored_id(id);
        let stored_size = self.inner.size(&stored).await?;

        match &self.cipher {
            Some(_) => {
                let overhead = OVERHEAD_SIZE as u64;
                if stored_size < overhead {
                    return Err(StorageError::Encryption {
                        object: id.to_string(),
                        reason: format!(
                            "stored object of {stored_size} bytes is smaller than the \
                             {overhead}-byte encryption overhead"
                        ),
                    });
                }
                Ok(stored_size - overhead)
            }
            None => Ok(stored_size),
        }
    }

    async fn exists(&self, id: &str) -> Result<bool, StorageError> {
        self.inner.exists(&self.stored_id(id)).await
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use pacsvault_crypto::MasterKey;

    use super::*;
    use crate::keystore::MasterKeyStore;

    /// Minimal in-memory backend for exercising the wrapper.
    #[derive(Default)]
    struct MemoryStore {
        objects: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl MemoryStore {
        fn raw(&self, id: &str) -> Option<Vec<u8>> {
            self.objects.lock().unwrap().get(id).cloned()
        }
    }

    #[async_trait]
    impl ObjectStore for MemoryStore {
        async fn write(&self, id: &str, data: &[u8]) -> Result<(), StorageError> {
            self.objects
                .lock()
                .unwrap()
                .insert(id.to_string(), data.to_vec());
            Ok(())
        }

        async fn read(&self, id: &str) -> Result<Vec<u8>, StorageError> {
            self.raw(id).ok_or_else(|| StorageError::NotFound(id.to_string()))
        }

        async fn read_range(
            &self,
            id: &str,
            offset: u64,
            length: u64,
        ) -> Result<Vec<u8>, StorageError> {
            let data = self.read(id).await?;
            let start = offset as usize;
            let end = (offset + length) as usize;
            if end > data.len() {
                return Err(StorageError::Io(format!(
                    "range {start}..{end} out of bounds for object '{id}'"
                )));
            }
            Ok(data[start..end].to_vec())
        }

        async fn delete(&self, id: &str) -> Result<(), StorageError> {
            self.objects.lock().unwrap().remove(id);
            Ok(())
        }

        async fn size(&self, id: &str) -> Result<u64, StorageError> {
            self.raw(id)
                .map(|d| d.len() as u64)
                .ok_or_else(|| StorageError::NotFound(id.to_string()))
        }
    }

    fn test_cipher() -> Arc<EnvelopeCipher> {
        Arc::new(EnvelopeCipher::new(MasterKeyStore::new(
            1,
            MasterKey::generate(),
        )))
    }

    #[tokio::test]
    async fn test_encrypted_round_trip() {
        let store = EncryptedObjectStore::new(MemoryStore::default(), Some(test_cipher()));
        let data = b"one slice of a CT series";

        store.write("study-1", data).await.unwrap();
        let read_back = store.read("study-1").await.unwrap();

        assert_eq!(read_back, data);
    }

    #[tokio::test]
    async fn test_stored_object_is_a_frame_under_enc_suffix() {
        let inner = MemoryStore::default();
        let data = b"pixel data";

        let store = EncryptedObjectStore::new(inner, Some(test_cipher()));
        store.write("study-2", data).await.unwrap();

        let raw = store.inner.raw("study-2.enc").unwrap();
        assert_eq!(raw.len(), data.len() + OVERHEAD_SIZE);
        assert_eq!(&raw[..2], b"A1");
        assert!(store.inner.raw("study-2").is_none());
    }

    #[tokio::test]
    async fn test_logical_size_subtracts_overhead() {
        let store = EncryptedObjectStore::new(MemoryStore::default(), Some(test_cipher()));
        let data = vec![0u8; 1000];

        store.write("study-3", &data).await.unwrap();

        assert_eq!(store.size("study-3").await.unwrap(), 1000);
        assert!(store.exists("study-3").await.unwrap());
    }

    #[tokio::test]
    async fn test_size_rejects_undersized_stored_object() {
        let inner = MemoryStore::default();
        inner.write("study-4.enc", b"tiny").await.unwrap();

        let store = EncryptedObjectStore::new(inner, Some(test_cipher()));

        let result = store.size("study-4").await;
        assert!(matches!(result, Err(StorageError::Encryption { .. })));
    }

    #[tokio::test]
    async fn test_range_read_rejected_when_encrypted() {
        let store = EncryptedObjectStore::new(MemoryStore::default(), Some(test_cipher()));
        store.write("study-5", b"0123456789").await.unwrap();

        let result = store.read_range("study-5", 0, 4).await;
        assert!(matches!(result, Err(StorageError::RangeNotSupported(_))));
    }

    #[tokio::test]
    async fn test_corrupted_stored_object_fails_decryption() {
        let store = EncryptedObjectStore::new(MemoryStore::default(), Some(test_cipher()));
        store.write("study-6", b"original bytes").await.unwrap();

        {
            let mut objects = store.inner.objects.lock().unwrap();
            let frame = objects.get_mut("study-6.enc").unwrap();
            let last = frame.len() - 1;
            frame[last] ^= 0xFF;
        }

        let result = store.read("study-6").await;
        assert!(matches!(result, Err(StorageError::Encryption { .. })));
    }

    #[tokio::test]
    async fn test_delete_removes_encrypted_object() {
        let store = EncryptedObjectStore::new(MemoryStore::default(), Some(test_cipher()));
        store.write("study-7", b"data").await.unwrap();

        store.delete("study-7").await.unwrap();

        assert!(!store.exists("study-7").await.unwrap());
        assert!(store.inner.raw("study-7.enc").is_none());
    }

    #[tokio::test]
    async fn test_plaintext_passthrough() {
        let store = EncryptedObjectStore::new(MemoryStore::default(), None);
        let data = b"stored as-is";

        store.write("study-8", data).await.unwrap();

        assert_eq!(store.inner.raw("study-8").unwrap(), data);
        assert_eq!(store.read("study-8").await.unwrap(), data);
        assert_eq!(store.size("study-8").await.unwrap(), data.len() as u64);
        assert_eq!(store.read_range("study-8", 7, 5).await.unwrap(), b"as-is");
    }
}
