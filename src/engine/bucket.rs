use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use crate::Store;

/// A single lock-guarded slice of the key space.
///
/// Reads take the shared lock and may run in parallel; `set` and `delete`
/// take the exclusive lock, which only blocks callers of this bucket.
#[derive(Default)]
pub struct Bucket {
    values: RwLock<HashMap<String, Vec<u8>>>,
}

impl Bucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.values.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// A panic while holding the lock cannot leave the map half-updated (every
// mutation is a single insert/remove), so a poisoned lock is still usable.
impl Store for Bucket {
    fn set(&self, key: &str, value: Vec<u8>) -> bool {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value).is_some()
    }

    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        values.get(key).cloned()
    }

    fn delete(&self, key: &str) -> bool {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.remove(key).is_some()
    }
}
