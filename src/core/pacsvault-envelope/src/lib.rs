//! # Pacsvault Envelope
//!
//! Envelope-encryption engine for Pacsvault archives.
//!
//! Every object is encrypted with a freshly generated data key; the data key
//! and its nonce travel inside the frame, wrapped under a long-lived master
//! key identified by a 4-byte id. Master keys rotate by configuration: the
//! current key encrypts everything new, previous keys remain available for
//! decryption only, so frames written years apart stay readable.
//!
//! ## Frame Format
//!
//! ```text
//! "A1" || master key id (4, LE) || wrapped nonce (32) || wrapped data key (32)
//!      || ciphertext (= plaintext length) || GCM tag (16)
//! ```
//!
//! The 70-byte prefix is authenticated as associated data, so tampering with
//! any header field fails the integrity check. Fixed overhead is 86 bytes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cipher;
pub mod config;
pub mod error;
pub mod frame;
pub mod keystore;
pub mod store;

pub use cipher::EnvelopeCipher;
pub use config::EncryptionConfig;
pub use error::EnvelopeError;
pub use keystore::MasterKeyStore;
pub use store::EncryptedObjectStore;
