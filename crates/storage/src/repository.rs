use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Keys under which the application keeps its documents.
pub mod keys {
    /// Versioned envelope of saved plans.
    pub const SESSION_PLANS: &str = "session_plans";
    /// Array of finished session records, newest last.
    pub const SESSION_HISTORY: &str = "session_history";
    /// Timer preferences.
    pub const TIMER_SETTINGS: &str = "timer_settings";
}

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// The only persistence capability the timer needs.
///
/// Values are JSON documents; the services layer decides what lives under
/// which key and repairs whatever it reads back.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails or the stored text is not JSON.
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Insert or replace the document under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the document cannot be written.
    async fn set(&self, key: &str, value: &Value) -> Result<(), StorageError>;

    /// Delete `key`, returning whether anything was stored there.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails.
    async fn remove(&self, key: &str) -> Result<bool, StorageError>;
}

/// In-memory store for tests and throwaway sessions.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    entries: Arc<Mutex<HashMap<String, Value>>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_owned(), value.clone());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.remove(key).is_some())
    }
}

/// Store handle passed to services, so the backend can be swapped freely.
#[derive(Clone)]
pub struct Storage {
    pub kv: Arc<dyn KeyValueStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            kv: Arc::new(InMemoryStore::new()),
        }
    }
}
