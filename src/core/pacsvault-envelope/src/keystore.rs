//! Master-key registry with rotation support.

use std::collections::HashMap;

use pacsvault_crypto::MasterKey;

use crate::error::EnvelopeError;

/// Holds the master keys known to the engine.
///
/// Exactly one key is *current* and is used for every new encryption; any
/// number of *previous* keys remain available for decryption only. Rotation
/// happens by restarting the process with updated configuration, so the store
/// is read-only once the engine is constructed and safe for unsynchronized
/// concurrent reads. Key material is zeroized when the store is dropped.
pub struct MasterKeyStore {
    current_id: u32,
    current_key: MasterKey,
    previous: HashMap<u32, MasterKey>,
}

impl MasterKeyStore {
    /// Creates a store with the given current master key.
    ///
    /// Requiring the current key at construction makes a keyless engine
    /// unrepresentable: encryption always has a key to wrap with.
    pub fn new(id: u32, key: MasterKey) -> Self {
        Self {
            current_id: id,
            current_key: key,
            previous: HashMap::new(),
        }
    }

    /// Replaces the current master key used for new encryptions.
    ///
    /// The previous-key set is left untouched; re-register the old key with
    /// [`add_previous_master_key`](Self::add_previous_master_key) if frames
    /// wrapped under it must remain readable.
    pub fn set_current_master_key(&mut self, id: u32, key: MasterKey) {
        self.current_id = id;
        self.current_key = key;
    }

    /// Registers a decryption-only master key.
    ///
    /// Repeated calls accumulate; registering the same id twice keeps the
    /// latest key.
    pub fn add_previous_master_key(&mut self, id: u32, key: MasterKey) {
        self.previous.insert(id, key);
    }

    /// Returns the id of the current master key.
    pub fn current_master_key_id(&self) -> u32 {
        self.current_id
    }

    /// Returns the current master key.
    pub fn current_master_key(&self) -> &MasterKey {
        &self.current_key
    }

    /// Looks up a master key by id, for decryption.
    ///
    /// The current key wins if a previous key was registered under the same
    /// id.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::UnknownMasterKey`] if no key matches.
    pub fn master_key(&self, id: u32) -> Result<&MasterKey, EnvelopeError> {
        if id == self.current_id {
            return Ok(&self.current_key);
        }

        self.previous
            .get(&id)
            .ok_or(EnvelopeError::UnknownMasterKey { id })
    }
}

impl std::fmt::Debug for MasterKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKeyStore")
            .field("current_id", &self.current_id)
            .field("previous_ids", &self.previous.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn test_current_key_lookup() {
        let key = MasterKey::generate();
        let store = MasterKeyStore::new(1, key.clone());

        assert_eq!(store.current_master_key_id(), 1);
        assert_eq!(store.master_key(1).unwrap().as_bytes(), key.as_bytes());
    }

    #[test]
    fn test_unknown_key_fails() {
        let store = MasterKeyStore::new(1, MasterKey::generate());

        let result = store.master_key(2);
        assert!(matches!(result, Err(EnvelopeError::UnknownMasterKey { id: 2 })));
    }

    #[test]
    fn test_previous_keys_accumulate() {
        let key1 = MasterKey::generate();
        let key2 = MasterKey::generate();
        let key3 = MasterKey::generate();

        let mut store = MasterKeyStore::new(3, key3);
        store.add_previous_master_key(1, key1.clone());
        store.add_previous_master_key(2, key2.clone());

        assert_eq!(store.master_key(1).unwrap().as_bytes(), key1.as_bytes());
        assert_eq!(store.master_key(2).unwrap().as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_rotation_replaces_current() {
        let key1 = MasterKey::generate();
        let key2 = MasterKey::generate();

        let mut store = MasterKeyStore::new(1, key1.clone());
        store.set_current_master_key(2, key2.clone());
        store.add_previous_master_key(1, key1.clone());

        assert_eq!(store.current_master_key_id(), 2);
        assert_eq!(store.master_key(1).unwrap().as_bytes(), key1.as_bytes());
        assert_eq!(store.master_key(2).unwrap().as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_current_wins_on_id_collision() {
        let current = MasterKey::generate();
        let stale = MasterKey::generate();

        let mut store = MasterKeyStore::new(5, current.clone());
        store.add_previous_master_key(5, stale);

        assert_eq!(store.master_key(5).unwrap().as_bytes(), current.as_bytes());
    }

    #[test]
    fn test_debug_does_not_expose_key_material() {
        let key = MasterKey::from_bytes(&[0x42; 32]).unwrap();
        let store = MasterKeyStore::new(1, key);

        let debug_str = format!("{:?}", store);
        assert!(!debug_str.contains("42"));
    }
}
