//! Durable key-value storage port for carts.
//!
//! The aggregator only needs two operations: read the payload once at startup
//! and overwrite it after every mutation. Both are best-effort; callers log
//! failures instead of propagating them.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

/// Errors reported by a [`CartStorage`] backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// The payload does not fit in the backend.
    #[error("storage quota exceeded ({size} bytes, limit {limit})")]
    QuotaExceeded { size: usize, limit: usize },

    /// The backend could not be reached or failed internally.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Key-value storage holding serialized carts.
///
/// # Implementation Notes
///
/// - Implementations must be thread-safe (`Send + Sync`)
/// - Methods return futures that can be awaited
/// - `set` overwrites any previous value under the key
pub trait CartStorage: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StorageError>> + Send;

    /// Store `value` under `key`.
    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// In-process storage backed by a shared map.
///
/// Clones share the same map, so a cart written through one handle is visible
/// to an aggregator initialized from another. An optional quota rejects
/// payloads larger than the given number of bytes.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    /// Create an empty store without a quota.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that rejects payloads over `limit` bytes.
    #[must_use]
    pub fn with_quota(limit: usize) -> Self {
        Self {
            entries: Arc::default(),
            quota: Some(limit),
        }
    }

    /// Write a raw value, bypassing the quota.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Backend` if the map lock is poisoned.
    pub fn insert_raw(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock()?.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    /// Read a raw value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Backend` if the map lock is poisoned.
    pub fn get_raw(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Backend("memory storage lock poisoned".to_owned()))
    }
}

impl CartStorage for MemoryStorage {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StorageError>> + Send {
        std::future::ready(self.get_raw(key))
    }

    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<(), StorageError>> + Send {
        let result = match self.quota {
            Some(limit) if value.len() > limit => Err(StorageError::QuotaExceeded {
                size: value.len(),
                limit,
            }),
            _ => self.lock().map(|mut entries| {
                entries.insert(key.to_owned(), value);
            }),
        };
        std::future::ready(result)
    }
}
