//! # Pacsvault Crypto
//!
//! Core cryptographic primitives for Pacsvault.
//!
//! This crate provides the low-level operations the envelope engine is
//! built from:
//! - Authenticated encryption (AES-256-GCM with a 32-byte nonce)
//! - Key-block wrapping (AES-256-CTR keystream)
//! - Secure random generation
//! - Key types with automatic memory zeroization

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod aead;
pub mod error;
pub mod keys;
pub mod random;
pub mod wrap;

pub use error::CryptoError;
pub use keys::MasterKey;
