//! Key-block wrapping with an AES-256-CTR keystream.
//!
//! Wraps a 32-byte block (a data key or a nonce) under a master key by
//! XORing it with the AES-256-CTR keystream started from an all-zero
//! initialization vector. The transform is deterministic, introduces no
//! padding, and is its own inverse.
//!
//! The fixed zero IV is an inherited property of the frame format: it is
//! sound only because every wrapped value is fresh CSPRNG output used exactly
//! once, so the same (key, plaintext) pair never recurs. Changing the IV
//! scheme would orphan every frame already written.

use aes::cipher::{KeyIvInit, StreamCipher};
use aes::Aes256;
use zeroize::Zeroizing;

use crate::aead::KEY_SIZE;
use crate::error::CryptoError;

/// Size of a wrapped key block in bytes (identical to the unwrapped size).
pub const BLOCK_SIZE: usize = 32;

/// AES-256 in CTR mode with a big-endian 128-bit counter.
type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// Wraps a 32-byte key block under a master key.
pub fn wrap_key_block(
    master_key: &[u8],
    block: &[u8; BLOCK_SIZE],
) -> Result<[u8; BLOCK_SIZE], CryptoError> {
    let mut out = *block;
    apply_keystream(master_key, &mut out)?;
    Ok(out)
}

/// Unwraps a 32-byte key block previously wrapped under the same master key.
///
/// The result holds key material, so it is zeroized on drop.
pub fn unwrap_key_block(
    master_key: &[u8],
    block: &[u8; BLOCK_SIZE],
) -> Result<Zeroizing<[u8; BLOCK_SIZE]>, CryptoError> {
    let mut out = Zeroizing::new(*block);
    apply_keystream(master_key, &mut *out)?;
    Ok(out)
}

/// XORs the zero-IV AES-256-CTR keystream into `block` in place.
fn apply_keystream(master_key: &[u8], block: &mut [u8; BLOCK_SIZE]) -> Result<(), CryptoError> {
    if master_key.len() != KEY_SIZE {
        return Err(CryptoError::InvalidKey(format!(
            "expected {} bytes, got {}",
            KEY_SIZE,
            master_key.len()
        )));
    }

    let iv = [0u8; 16];
    let mut cipher = Aes256Ctr::new_from_slices(master_key, &iv)
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    cipher.apply_keystream(block);

    Ok(())
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::random::generate_key;

    #[test]
    fn test_wrap_unwrap_roundtrip() {
        let master_key = generate_key();
        let block = *generate_key();

        let wrapped = wrap_key_block(&*master_key, &block).unwrap();
        let unwrapped = unwrap_key_block(&*master_key, &wrapped).unwrap();

        assert_eq!(*unwrapped, block);
    }

    #[test]
    fn test_wrap_changes_block() {
        let master_key = generate_key();
        let block = *generate_key();

        let wrapped = wrap_key_block(&*master_key, &block).unwrap();

        assert_ne!(wrapped, block);
        assert_eq!(wrapped.len(), BLOCK_SIZE);
    }

    #[test]
    fn test_wrap_is_deterministic() {
        let master_key = generate_key();
        let block = *generate_key();

        let wrapped1 = wrap_key_block(&*master_key, &block).unwrap();
        let wrapped2 = wrap_key_block(&*master_key, &block).unwrap();

        assert_eq!(wrapped1, wrapped2);
    }

    #[test]
    fn test_wrap_depends_on_master_key() {
        let key1 = generate_key();
        let key2 = generate_key();
        let block = *generate_key();

        let wrapped1 = wrap_key_block(&*key1, &block).unwrap();
        let wrapped2 = wrap_key_block(&*key2, &block).unwrap();

        assert_ne!(wrapped1, wrapped2);
    }

    #[test]
    fn test_unwrap_wrong_key_garbles() {
        let key1 = generate_key();
        let key2 = generate_key();
        let block = *generate_key();

        let wrapped = wrap_key_block(&*key1, &block).unwrap();
        let unwrapped = unwrap_key_block(&*key2, &wrapped).unwrap();

        assert_ne!(*unwrapped, block);
    }

    #[test]
    fn test_invalid_master_key_length() {
        let block = [0u8; BLOCK_SIZE];

        let result = wrap_key_block(&[0u8; 16], &block);
        assert!(matches!(result, Err(CryptoError::InvalidKey(_))));
    }
}
