//! Cryptographically secure random generation.
//!
//! Uses the operating system's CSPRNG for all random number generation.

use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroizing;

use crate::aead::{KEY_SIZE, NONCE_SIZE};

/// Generates a cryptographically secure random 256-bit key.
///
/// The key is wrapped in `Zeroizing` to ensure it is cleared from memory when
/// dropped. Also used to produce master keys out-of-band (see the `genkey`
/// CLI command).
pub fn generate_key() -> Zeroizing<[u8; KEY_SIZE]> {
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    OsRng.fill_bytes(&mut *key);
    key
}

/// Generates a cryptographically secure random 32-byte nonce.
///
/// The nonce travels wrapped under a master key inside the frame, so it is
/// treated as sensitive material and zeroized on drop like a key.
pub fn generate_nonce() -> Zeroizing<[u8; NONCE_SIZE]> {
    let mut nonce = Zeroizing::new([0u8; NONCE_SIZE]);
    OsRng.fill_bytes(&mut *nonce);
    nonce
}

/// Generates cryptographically secure random bytes.
///
/// # Arguments
///
/// * `len` - Number of random bytes to generate
pub fn generate_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
}
