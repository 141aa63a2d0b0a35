//! Encryption configuration loading.
//!
//! The engine is configured from a `StorageEncryption` JSON section:
//!
//! ```json
//! {
//!   "Enable": true,
//!   "MasterKey": [3, "/etc/pacsvault/master3.key"],
//!   "PreviousMasterKeys": [[1, "/etc/pacsvault/master1.key"],
//!                          [2, "/etc/pacsvault/master2.key"]],
//!   "MaxConcurrentInputSize": 1024
//! }
//! ```
//!
//! Key files contain a base64-encoded 32-byte key. A suitable file can be
//! produced with the `pacsvault genkey` command (or
//! `openssl rand -base64 32`).

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Deserialize;

use pacsvault_crypto::MasterKey;

use crate::cipher::EnvelopeCipher;
use crate::error::EnvelopeError;
use crate::keystore::MasterKeyStore;

/// Reference to a master key on disk: `[id, "path"]` in the JSON section.
#[derive(Debug, Clone, Deserialize)]
pub struct MasterKeyRef(pub u32, pub PathBuf);

/// The `StorageEncryption` configuration section.
#[derive(Debug, Clone, Deserialize)]
pub struct EncryptionConfig {
    /// Whether client-side encryption is active.
    #[serde(rename = "Enable", default = "default_enable")]
    pub enable: bool,

    /// Id and key-file path of the current master key.
    #[serde(rename = "MasterKey", default)]
    pub master_key: Option<MasterKeyRef>,

    /// Ids and key-file paths of decryption-only master keys.
    #[serde(rename = "PreviousMasterKeys", default)]
    pub previous_master_keys: Vec<MasterKeyRef>,

    /// Aggregate in-flight byte budget, in MiB.
    #[serde(rename = "MaxConcurrentInputSize", default = "default_max_input_mb")]
    pub max_concurrent_input_size: u64,
}

fn default_enable() -> bool {
    true
}

fn default_max_input_mb() -> u64 {
    1024
}

impl EncryptionConfig {
    /// Builds the engine this configuration describes.
    ///
    /// Returns `None` when the section disables encryption.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::InvalidConfig`] when encryption is enabled
    /// without a current master key, and [`EnvelopeError::KeyFileUnreadable`]
    /// when any referenced key file is missing, not valid base64, or does not
    /// decode to exactly 32 bytes.
    pub fn into_cipher(self) -> Result<Option<EnvelopeCipher>, EnvelopeError> {
        if !self.enable {
            return Ok(None);
        }

        let MasterKeyRef(current_id, current_path) = self.master_key.ok_or_else(|| {
            EnvelopeError::InvalidConfig(
                "encryption is enabled but MasterKey is missing".to_string(),
            )
        })?;

        let mut keys = MasterKeyStore::new(current_id, load_master_key(&current_path)?);

        for MasterKeyRef(id, path) in self.previous_master_keys {
            keys.add_previous_master_key(id, load_master_key(&path)?);
        }

        let max_bytes = self
            .max_concurrent_input_size
            .saturating_mul(1024 * 1024)
            .try_into()
            .unwrap_or(usize::MAX);

        Ok(Some(EnvelopeCipher::with_max_concurrent_input_size(
            keys, max_bytes,
        )))
    }
}

/// Loads a base64-encoded 32-byte master key from a file.
///
/// Surrounding ASCII whitespace (such as the trailing newline most tools
/// emit) is tolerated.
pub fn load_master_key(path: &Path) -> Result<MasterKey, EnvelopeError> {
    let unreadable = |reason: String| EnvelopeError::KeyFileUnreadable {
        path: path.to_path_buf(),
        reason,
    };

    let text = std::fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;

    let decoded = BASE64
        .decode(text.trim().as_bytes())
        .map_err(|e| unreadable(format!("invalid base64: {e}")))?;

    MasterKey::from_bytes(&decoded).map_err(|e| unreadable(e.to_string()))
}
