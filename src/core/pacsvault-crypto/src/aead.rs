//! AES-256-GCM authenticated encryption.
//!
//! Provides authenticated encryption with associated data (AEAD) using
//! AES-256-GCM with a 32-byte nonce. GCM processes initialization vectors
//! other than 96 bits through GHASH as specified in NIST SP 800-38D, so the
//! wide nonce stays interoperable with other implementations of the frame
//! format.

use aes::Aes256;
use aes_gcm::{
    aead::{consts::U32, Aead, KeyInit, Payload},
    AesGcm, Nonce,
};

use crate::error::CryptoError;

/// Size of an AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;

/// Size of a GCM nonce in bytes.
pub const NONCE_SIZE: usize = 32;

/// Size of a GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// AES-256-GCM with a 32-byte nonce.
type Aes256Gcm32 = AesGcm<Aes256, U32>;

/// Encrypts plaintext using AES-256-GCM.
///
/// Unlike formats that prepend the nonce, the caller owns nonce transport:
/// the envelope frame carries it wrapped under a master key.
///
/// # Arguments
///
/// * `key` - 32-byte encryption key
/// * `nonce` - 32-byte nonce, must never be reused with the same key
/// * `plaintext` - Data to encrypt
/// * `associated_data` - Additional data to authenticate (not encrypted)
///
/// # Returns
///
/// Ciphertext with the 16-byte authentication tag appended.
pub fn encrypt(
    key: &[u8],
    nonce: &[u8],
    plaintext: &[u8],
    associated_data: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = new_cipher(key)?;

    if nonce.len() != NONCE_SIZE {
        return Err(CryptoError::InvalidInput(format!(
            "expected {} nonce bytes, got {}",
            NONCE_SIZE,
            nonce.len()
        )));
    }

    cipher
        .encrypt(
            Nonce::<U32>::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad: associated_data,
            },
        )
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))
}

/// Decrypts ciphertext using AES-256-GCM.
///
/// Expects the 16-byte authentication tag appended to the ciphertext (as
/// produced by [`encrypt`]). Verification covers both the ciphertext and the
/// associated data; no plaintext is returned on mismatch.
///
/// # Arguments
///
/// * `key` - 32-byte encryption key
/// * `nonce` - 32-byte nonce used at encryption time
/// * `ciphertext` - Data to decrypt (ciphertext || tag)
/// * `associated_data` - Additional data that was authenticated
pub fn decrypt(
    key: &[u8],
    nonce: &[u8],
    ciphertext: &[u8],
    associated_data: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = new_cipher(key)?;

    if nonce.len() != NONCE_SIZE {
        return Err(CryptoError::InvalidInput(format!(
            "expected {} nonce bytes, got {}",
            NONCE_SIZE,
            nonce.len()
        )));
    }

    if ciphertext.len() < TAG_SIZE {
        return Err(CryptoError::InvalidInput(
            "ciphertext too short".to_string(),
        ));
    }

    cipher
        .decrypt(
            Nonce::<U32>::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad: associated_data,
            },
        )
        .map_err(|_| CryptoError::DecryptionFailed("authentication failed".to_string()))
}

fn new_cipher(key: &[u8]) -> Result<Aes256Gcm32, CryptoError> {
    if key.len() != KEY_SIZE {
        return Err(CryptoError::InvalidKey(format!(
            "expected {} bytes, got {}",
            KEY_SIZE,
            key.len()
        )));
    }

    Aes256Gcm32::new_from_slice(key).map_err(|e| CryptoError::InvalidKey(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::random::{generate_key, generate_nonce};

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = generate_key();
        let nonce = generate_nonce();
        let plaintext = b"Hello, Pacsvault!";

        let ciphertext = encrypt(&*key, &*nonce, plaintext, b"").unwrap();
        let decrypted = decrypt(&*key, &*nonce, &ciphertext, b"").unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_encrypt_decrypt_with_aad() {
        let key = generate_key();
        let nonce = generate_nonce();
        let plaintext = b"secret data";
        let aad = b"additional authenticated data";

        let ciphertext = encrypt(&*key, &*nonce, plaintext, aad).unwrap();
        let decrypted = decrypt(&*key, &*nonce, &ciphertext, aad).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_decrypt_wrong_aad_fails() {
        let key = generate_key();
        let nonce = generate_nonce();

        let ciphertext = encrypt(&*key, &*nonce, b"secret data", b"correct aad").unwrap();
        let result = decrypt(&*key, &*nonce, &ciphertext, b"wrong aad");

        assert!(result.is_err());
    }

    #[test]
    fn test_decrypt_wrong_key_fails() {
        let key1 = generate_key();
        let key2 = generate_key();
        let nonce = generate_nonce();

        let ciphertext = encrypt(&*key1, &*nonce, b"secret data", b"").unwrap();
        let result = decrypt(&*key2, &*nonce, &ciphertext, b"");

        assert!(result.is_err());
    }

    #[test]
    fn test_decrypt_wrong_nonce_fails() {
        let key = generate_key();
        let nonce1 = generate_nonce();
        let nonce2 = generate_nonce();

        let ciphertext = encrypt(&*key, &*nonce1, b"secret data", b"").unwrap();
        let result = decrypt(&*key, &*nonce2, &ciphertext, b"");

        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_key_size() {
        let short_key = vec![0u8; 16];
        let nonce = generate_nonce();

        let result = encrypt(&short_key, &*nonce, b"test", b"");
        assert!(matches!(result, Err(CryptoError::InvalidKey(_))));
    }

    #[test]
    fn test_invalid_nonce_size() {
        let key = generate_key();

        let result = encrypt(&*key, &[0u8; 12], b"test", b"");
        assert!(matches!(result, Err(CryptoError::InvalidInput(_))));
    }

    #[test]
    fn test_ciphertext_format() {
        let key = generate_key();
        let nonce = generate_nonce();
        let plaintext = b"test";

        let ciphertext = encrypt(&*key, &*nonce, plaintext, b"").unwrap();

        assert_eq!(ciphertext.len(), plaintext.len() + TAG_SIZE);
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = generate_key();
        let nonce = generate_nonce();

        let mut ciphertext = encrypt(&*key, &*nonce, b"secret data", b"").unwrap();
        ciphertext[0] ^= 0xFF;

        let result = decrypt(&*key, &*nonce, &ciphertext, b"");
        assert!(result.is_err());
    }
}
