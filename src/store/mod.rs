// Credential storage
// Key-value persistence for the access and refresh credentials

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::models::auth::CredentialPair;

pub const ACCESS_TOKEN_KEY: &str = "access";
pub const REFRESH_TOKEN_KEY: &str = "refresh";
pub const ACCESS_EXPIRY_KEY: &str = "accessExpiredAt";
pub const REFRESH_EXPIRY_KEY: &str = "refreshExpiredAt";

const ALL_KEYS: [&str; 4] = [
    ACCESS_TOKEN_KEY,
    REFRESH_TOKEN_KEY,
    ACCESS_EXPIRY_KEY,
    REFRESH_EXPIRY_KEY,
];

/// Persistent key-value storage shared by every dispatch
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

pub fn access_token(store: &dyn CredentialStore) -> Result<Option<String>> {
    Ok(store.get(ACCESS_TOKEN_KEY)?.filter(|t| !t.is_empty()))
}

pub fn refresh_token(store: &dyn CredentialStore) -> Result<Option<String>> {
    Ok(store.get(REFRESH_TOKEN_KEY)?.filter(|t| !t.is_empty()))
}

/// Write a credential pair under the fixed keys
pub fn save_pair(store: &dyn CredentialStore, pair: &CredentialPair) -> Result<()> {
    store.set(ACCESS_TOKEN_KEY, &pair.access_token)?;
    store.set(REFRESH_TOKEN_KEY, &pair.refresh_token)?;
    save_expiry(store, ACCESS_EXPIRY_KEY, pair.access_expiry)?;
    save_expiry(store, REFRESH_EXPIRY_KEY, pair.refresh_expiry)?;
    Ok(())
}

/// Read the stored credential pair, if both tokens are present
pub fn load_pair(store: &dyn CredentialStore) -> Result<Option<CredentialPair>> {
    let (Some(access_token), Some(refresh_token)) = (access_token(store)?, refresh_token(store)?)
    else {
        return Ok(None);
    };

    Ok(Some(CredentialPair {
        access_token,
        access_expiry: load_expiry(store, ACCESS_EXPIRY_KEY)?,
        refresh_token,
        refresh_expiry: load_expiry(store, REFRESH_EXPIRY_KEY)?,
    }))
}

/// Remove every credential key
pub fn clear(store: &dyn CredentialStore) -> Result<()> {
    for key in ALL_KEYS {
        store.remove(key)?;
    }
    Ok(())
}

fn save_expiry(store: &dyn CredentialStore, key: &str, expiry: Option<DateTime<Utc>>) -> Result<()> {
    match expiry {
        Some(at) => store.set(key, &at.to_rfc3339()),
        None => store.remove(key),
    }
}

fn load_expiry(store: &dyn CredentialStore, key: &str) -> Result<Option<DateTime<Utc>>> {
    store
        .get(key)?
        .map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .with_context(|| format!("Failed to parse stored {}: {}", key, s))
        })
        .transpose()
}
