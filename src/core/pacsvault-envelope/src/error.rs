//! Envelope engine error types.

use std::path::PathBuf;

use thiserror::Error;

use pacsvault_crypto::CryptoError;

/// Errors that can occur in the envelope-encryption engine.
///
/// All variants are terminal for the call that raised them; the engine never
/// retries and never logs. Callers own retry and logging policy.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// Input exceeds the configured maximum concurrent input size.
    #[error("input of {size} bytes exceeds the configured maximum of {max} bytes; try increasing MaxConcurrentInputSize")]
    InputTooLarge {
        /// Size of the rejected input.
        size: usize,
        /// Configured maximum in bytes.
        max: usize,
    },

    /// Frame is too short to contain the fixed header and tag.
    #[error("encrypted frame of {size} bytes is shorter than the {min}-byte minimum")]
    TruncatedInput {
        /// Size of the rejected frame.
        size: usize,
        /// Minimum valid frame size.
        min: usize,
    },

    /// Frame carries a version tag this build does not understand.
    #[error("unsupported frame version '{found}'")]
    UnsupportedVersion {
        /// The version bytes found in the frame, lossily decoded.
        found: String,
    },

    /// No registered master key matches the id in the frame.
    #[error("master key {id} not found, unable to decrypt")]
    UnknownMasterKey {
        /// The master key id carried by the frame.
        id: u32,
    },

    /// Authentication-tag verification failed; the frame was tampered with
    /// or corrupted. No plaintext is ever returned in this case.
    #[error("integrity check failed")]
    IntegrityCheckFailed,

    /// A master-key file could not be read or did not contain a valid key.
    #[error("unable to read key file '{}': {reason}", .path.display())]
    KeyFileUnreadable {
        /// Path of the offending key file.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// The encryption configuration is malformed.
    #[error("invalid encryption configuration: {0}")]
    InvalidConfig(String),

    /// Failure in an underlying cryptographic primitive.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}
