use anyhow::Result;
use dashmap::DashMap;
use std::sync::Arc;

use super::CredentialStore;

/// Thread-safe in-memory credential store
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with an access and refresh token
    pub fn with_tokens(access_token: Option<&str>, refresh_token: Option<&str>) -> Self {
        let store = Self::new();
        if let Some(token) = access_token {
            store.entries.insert(super::ACCESS_TOKEN_KEY.to_string(), token.to_string());
        }
        if let Some(token) = refresh_token {
            store.entries.insert(super::REFRESH_TOKEN_KEY.to_string(), token.to_string());
        }
        store
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}
