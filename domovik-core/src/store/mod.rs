//! Local state store.
//!
//! A durable key-value store holding session credentials, encryption key
//! material, cached entity lists and connectivity status. Values are JSON.
//! A `null` value reads back as absent.

pub mod sqlite;

pub use sqlite::SqliteStore;

use crate::{DomovikError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// Persisted key names.
pub mod keys {
    pub const CONNECTED: &str = "connected";
    pub const AUTHORIZED: &str = "authorized";
    pub const LINKED: &str = "linked";
    pub const SERVER_URL: &str = "serverUrl";
    pub const EMAIL: &str = "email";
    pub const API_PASSWORD: &str = "apiPassword";
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const RENEWAL_TOKEN: &str = "renewal_token";
    pub const UUID: &str = "uuid";
    pub const BROWSER_NAME: &str = "browser_name";
    pub const READING_LISTS: &str = "reading_lists";
    pub const OTHER_BROWSERS: &str = "other_browsers";
    pub const BOOKMARKS: &str = "bookmarks";
    pub const CONNECTION_STATUS: &str = "connectionStatus";
    pub const EK: &str = "EK";
}

/// Durable key-value storage for one node.
pub trait StateStore: Send + Sync {
    /// Read a single key.
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Write several keys at once. Either every entry lands or none does.
    fn set_many(&self, entries: &[(&str, Value)]) -> Result<()>;
}

impl<'a> dyn StateStore + 'a {
    pub fn set(&self, key: &str, value: Value) -> Result<()> {
        self.set_many(&[(key, value)])
    }

    /// Read and deserialize a key; `None` when absent or `null`.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key)? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| DomovikError::Storage(format!("Bad value for {}: {}", key, e))),
        }
    }

    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.set(key, serde_json::to_value(value)?)
    }

    pub fn flag(&self, key: &str) -> Result<bool> {
        Ok(self.load::<bool>(key)?.unwrap_or(false))
    }

    /// A string key, empty when absent.
    pub fn text(&self, key: &str) -> Result<String> {
        Ok(self.load::<String>(key)?.unwrap_or_default())
    }
}

/// In-memory store for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Value>>> {
        self.values
            .lock()
            .map_err(|_| DomovikError::Storage("Memory store lock poisoned".to_string()))
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values()?.get(key).cloned())
    }

    fn set_many(&self, entries: &[(&str, Value)]) -> Result<()> {
        let mut values = self.values()?;
        for (key, value) in entries {
            values.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }
}
