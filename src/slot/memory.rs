//! In-memory storage slot.

use crate::error::{Result, StoreError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::StorageSlot;

/// In-process storage slot.
///
/// Clones share the same entries, so a slot handed to one store can be
/// reopened by another store later in the same process. An optional
/// quota caps the total bytes of all keys and values, like browser
/// key-value storage.
#[derive(Clone, Default)]
pub struct MemorySlot {
    entries: Arc<RwLock<HashMap<String, String>>>,
    quota: Option<usize>,
}

impl MemorySlot {
    /// Create an empty slot with no quota.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty slot limited to `quota` bytes.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            quota: Some(quota),
        }
    }

    /// Total bytes currently used by keys and values.
    pub fn used_bytes(&self) -> usize {
        self.entries
            .read()
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl StorageSlot for MemorySlot {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write();

        if let Some(quota) = self.quota {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > quota {
                return Err(StoreError::QuotaExceeded { needed, quota });
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}
