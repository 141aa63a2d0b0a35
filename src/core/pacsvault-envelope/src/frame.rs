//! Encrypted-frame layout and header parsing.
//!
//! The on-disk artifact is fully self-describing: it carries its own version
//! tag and the id of the master key that wrapped it, so a frame can be
//! decrypted independently of when it was written as long as that key is
//! still registered.

use pacsvault_crypto::aead::{KEY_SIZE, NONCE_SIZE, TAG_SIZE};

use crate::error::EnvelopeError;

/// Version tag of the only supported frame format.
pub const FORMAT_VERSION: &[u8; VERSION_SIZE] = b"A1";

/// Size of the version tag in bytes.
pub const VERSION_SIZE: usize = 2;

/// Size of the master-key id in bytes.
pub const MASTER_KEY_ID_SIZE: usize = 4;

/// Size of the wrapped nonce in bytes (the CTR wrap introduces no padding).
pub const WRAPPED_NONCE_SIZE: usize = NONCE_SIZE;

/// Size of the wrapped data key in bytes.
pub const WRAPPED_DATA_KEY_SIZE: usize = KEY_SIZE;

/// Size of the unencrypted frame prefix, authenticated as associated data.
pub const PREFIX_SIZE: usize =
    VERSION_SIZE + MASTER_KEY_ID_SIZE + WRAPPED_NONCE_SIZE + WRAPPED_DATA_KEY_SIZE;

/// Total fixed overhead of a frame: `len(frame) == len(plaintext) + OVERHEAD_SIZE`.
pub const OVERHEAD_SIZE: usize = PREFIX_SIZE + TAG_SIZE;

const MASTER_KEY_ID_OFFSET: usize = VERSION_SIZE;
const WRAPPED_NONCE_OFFSET: usize = MASTER_KEY_ID_OFFSET + MASTER_KEY_ID_SIZE;
const WRAPPED_DATA_KEY_OFFSET: usize = WRAPPED_NONCE_OFFSET + WRAPPED_NONCE_SIZE;

/// Parsed view of a frame's fixed-size header.
///
/// Borrows from the frame; the wrapped fields are only meaningful to a holder
/// of the identified master key.
#[derive(Debug)]
pub struct FrameHeader<'a> {
    /// Id of the master key that wrapped this frame.
    pub master_key_id: u32,
    /// Nonce, wrapped under the master key.
    pub wrapped_nonce: &'a [u8; WRAPPED_NONCE_SIZE],
    /// Data key, wrapped under the master key.
    pub wrapped_data_key: &'a [u8; WRAPPED_DATA_KEY_SIZE],
}

/// Parses and validates the fixed-size header of an encrypted frame.
///
/// # Errors
///
/// Returns [`EnvelopeError::TruncatedInput`] if the frame cannot contain the
/// header and tag, and [`EnvelopeError::UnsupportedVersion`] if the version
/// tag is not `"A1"`.
pub fn parse_header(frame: &[u8]) -> Result<FrameHeader<'_>, EnvelopeError> {
    if frame.len() < OVERHEAD_SIZE {
        return Err(EnvelopeError::TruncatedInput {
            size: frame.len(),
            min: OVERHEAD_SIZE,
        });
    }

    let version = &frame[..VERSION_SIZE];
    if version != FORMAT_VERSION {
        return Err(EnvelopeError::UnsupportedVersion {
            found: String::from_utf8_lossy(version).into_owned(),
        });
    }

    let id_bytes: [u8; MASTER_KEY_ID_SIZE] = frame
        [MASTER_KEY_ID_OFFSET..MASTER_KEY_ID_OFFSET + MASTER_KEY_ID_SIZE]
        .try_into()
        .expect("frame length checked above");

    let wrapped_nonce: &[u8; WRAPPED_NONCE_SIZE] = frame
        [WRAPPED_NONCE_OFFSET..WRAPPED_NONCE_OFFSET + WRAPPED_NONCE_SIZE]
        .try_into()
        .expect("frame length checked above");

    let wrapped_data_key: &[u8; WRAPPED_DATA_KEY_SIZE] = frame
        [WRAPPED_DATA_KEY_OFFSET..WRAPPED_DATA_KEY_OFFSET + WRAPPED_DATA_KEY_SIZE]
        .try_into()
        .expect("frame length checked above");

    // The id is stored little-endian, matching frames written by the
    // original implementation on little-endian hosts.
    Ok(FrameHeader {
        master_key_id: u32::from_le_bytes(id_bytes),
        wrapped_nonce,
        wrapped_data_key,
    })
}
