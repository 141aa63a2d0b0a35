//! The envelope cipher: authenticated encryption with per-object data keys.

use tokio::sync::{Semaphore, SemaphorePermit};

use pacsvault_crypto::{aead, random, wrap};

use crate::error::EnvelopeError;
use crate::frame::{self, FORMAT_VERSION, OVERHEAD_SIZE, PREFIX_SIZE};
use crate::keystore::MasterKeyStore;

/// Default aggregate in-flight byte budget (1 GiB).
pub const DEFAULT_MAX_CONCURRENT_INPUT_SIZE: usize = 1024 * 1024 * 1024;

/// Envelope-encryption engine.
///
/// Every [`encrypt`](Self::encrypt) call generates a fresh data key and
/// nonce, wraps both under the current master key, and emits a
/// self-describing frame; [`decrypt`](Self::decrypt) reverses the process
/// for any frame whose master key is still registered. Calls are stateless
/// and safe to issue concurrently from any number of tasks.
///
/// Since an operation transiently holds roughly twice its input size in
/// memory (input plus output buffer), concurrent calls are throttled by an
/// admission semaphore seeded with a byte budget rather than by caller
/// count: each call holds a permit weighted by its input size for its whole
/// duration, putting a hard ceiling on peak memory.
pub struct EnvelopeCipher {
    keys: MasterKeyStore,
    max_concurrent_input_size: usize,
    admission: Semaphore,
}

impl EnvelopeCipher {
    /// Creates an engine with the default 1 GiB admission budget.
    pub fn new(keys: MasterKeyStore) -> Self {
        Self::with_max_concurrent_input_size(keys, DEFAULT_MAX_CONCURRENT_INPUT_SIZE)
    }

    /// Creates an engine with an explicit admission budget in bytes.
    ///
    /// Inputs larger than the budget are rejected outright with
    /// [`EnvelopeError::InputTooLarge`]. Tokio semaphore permits are
    /// `u32`-weighted, so the budget saturates at `u32::MAX` bytes.
    pub fn with_max_concurrent_input_size(keys: MasterKeyStore, max_bytes: usize) -> Self {
        let max = max_bytes.min(u32::MAX as usize);
        Self {
            keys,
            max_concurrent_input_size: max,
            admission: Semaphore::new(max),
        }
    }

    /// Returns the configured admission budget in bytes.
    pub fn max_concurrent_input_size(&self) -> usize {
        self.max_concurrent_input_size
    }

    /// Returns the master keys this engine operates with.
    pub fn key_store(&self) -> &MasterKeyStore {
        &self.keys
    }

    /// Encrypts a plaintext buffer into a self-describing frame.
    ///
    /// The output is exactly `plaintext.len() + 86` bytes. Encrypting the
    /// same plaintext twice yields different frames: the data key and nonce
    /// are fresh CSPRNG output on every call.
    ///
    /// Waits until the admission budget can cover the input, then holds the
    /// permit until the frame is built.
    pub async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
        let _permit = self.admit(plaintext.len()).await?;

        let data_key = random::generate_key();
        let nonce = random::generate_nonce();

        let master_key = self.keys.current_master_key();
        let wrapped_nonce = wrap::wrap_key_block(master_key.as_bytes(), &nonce)?;
        let wrapped_data_key = wrap::wrap_key_block(master_key.as_bytes(), &data_key)?;

        let mut frame = Vec::with_capacity(plaintext.len() + OVERHEAD_SIZE);
        frame.extend_from_slice(FORMAT_VERSION);
        frame.extend_from_slice(&self.keys.current_master_key_id().to_le_bytes());
        frame.extend_from_slice(&wrapped_nonce);
        frame.extend_from_slice(&wrapped_data_key);

        let ciphertext = aead::encrypt(&*data_key, &*nonce, plaintext, &frame[..PREFIX_SIZE])?;
        frame.extend_from_slice(&ciphertext);

        Ok(frame)
    }

    /// Decrypts a frame produced by [`encrypt`](Self::encrypt).
    ///
    /// The output is exactly `frame.len() - 86` bytes. Verification of the
    /// authentication tag covers the ciphertext and the whole header, and
    /// happens before any plaintext is returned; a tampered frame yields
    /// [`EnvelopeError::IntegrityCheckFailed`] and nothing else.
    pub async fn decrypt(&self, frame: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
        // malformed sizes are rejected before tying up admission budget
        if frame.len() > self.max_concurrent_input_size {
            return Err(EnvelopeError::InputTooLarge {
                size: frame.len(),
                max: self.max_concurrent_input_size,
            });
        }
        if frame.len() < OVERHEAD_SIZE {
            return Err(EnvelopeError::TruncatedInput {
                size: frame.len(),
                min: OVERHEAD_SIZE,
            });
        }

        let _permit = self.admit(frame.len()).await?;

        let header = frame::parse_header(frame)?;
        let master_key = self.keys.master_key(header.master_key_id)?;

        let nonce = wrap::unwrap_key_block(master_key.as_bytes(), header.wrapped_nonce)?;
        let data_key = wrap::unwrap_key_block(master_key.as_bytes(), header.wrapped_data_key)?;

        aead::decrypt(&*data_key, &*nonce, &frame[PREFIX_SIZE..], &frame[..PREFIX_SIZE])
            .map_err(|_| EnvelopeError::IntegrityCheckFailed)
    }

    /// Acquires an admission permit weighted by the input size.
    ///
    /// The permit is released when dropped, on every exit path of the
    /// calling operation.
    async fn admit(&self, size: usize) -> Result<SemaphorePermit<'_>, EnvelopeError> {
        if size > self.max_concurrent_input_size {
            return Err(EnvelopeError::InputTooLarge {
                size,
                max: self.max_concurrent_input_size,
            });
        }

        // size <= max <= u32::MAX, checked above
        let permit = self
            .admission
            .acquire_many(size as u32)
            .await
            .expect("admission semaphore is never closed");

        Ok(permit)
    }
}
