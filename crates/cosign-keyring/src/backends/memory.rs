use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use std::collections::HashMap;

use crate::{KeyInfo, Keyring, KeyringError, OwnerKey};

/// In-memory keyring backend for testing and development
///
/// **WARNING**: keys live in plain memory and vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryKeyring {
    keys: HashMap<String, OwnerKey>,
}

impl MemoryKeyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a fresh random key under `name`
    pub fn create_key(&mut self, name: &str) -> Result<KeyInfo, KeyringError> {
        if self.keys.contains_key(name) {
            return Err(KeyringError::KeyExists(name.to_string()));
        }
        let key = OwnerKey::new(name, PrivateKeySigner::random());
        let info = key.info();
        self.keys.insert(name.to_string(), key);
        Ok(info)
    }
}

#[async_trait]
impl Keyring for MemoryKeyring {
    async fn get_key(&self, name: &str) -> Result<OwnerKey, KeyringError> {
        self.keys
            .get(name)
            .cloned()
            .ok_or_else(|| KeyringError::KeyNotFound(name.to_string()))
    }

    async fn list_keys(&self) -> Result<Vec<KeyInfo>, KeyringError> {
        let mut keys: Vec<KeyInfo> = self.keys.values().map(OwnerKey::info).collect();
        keys.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(keys)
    }

    async fn import_private_key(
        &mut self,
        name: &str,
        private_key_hex: &str,
    ) -> Result<KeyInfo, KeyringError> {
        if self.keys.contains_key(name) {
            return Err(KeyringError::KeyExists(name.to_string()));
        }
        let key = OwnerKey::from_private_key(name, private_key_hex)?;
        let info = key.info();
        self.keys.insert(name.to_string(), key);
        Ok(info)
    }
}
