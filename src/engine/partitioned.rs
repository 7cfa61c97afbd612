use std::io::Cursor;
use crate::engine::Bucket;
use crate::Store;

/// Shard count used when none is configured.
pub const DEFAULT_SHARDS: usize = 32;

/// Murmur3 (x86, 32-bit, seed 0) over the raw key bytes.
///
/// Changing this function relocates every stored key.
pub fn hash32(bytes: &[u8]) -> u32 {
    // Reading from an in-memory cursor cannot fail.
    murmur3::murmur3_32(&mut Cursor::new(bytes), 0).unwrap_or_default()
}

/// Routes every key to one of a fixed set of [`Bucket`]s.
///
/// There is no global lock: operations on different buckets never coordinate,
/// so there is no cross-key atomicity and no whole-store snapshot.
pub struct PartitionedStore {
    buckets: Vec<Bucket>,
}

impl PartitionedStore {
    /// Creates a store with `shard_count` buckets (at least one).
    pub fn new(shard_count: usize) -> Self {
        let buckets = (0..shard_count.max(1)).map(|_| Bucket::new()).collect();
        Self { buckets }
    }

    pub fn shard_count(&self) -> usize {
        self.buckets.len()
    }

    /// Index of the bucket owning `key`: `hash32(key) mod shard_count`.
    pub fn route(&self, key: &str) -> usize {
        hash32(key.as_bytes()) as usize % self.buckets.len()
    }

    /// Total number of keys across all buckets. Not a snapshot.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(Bucket::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Bucket::is_empty)
    }

    fn bucket(&self, key: &str) -> &Bucket {
        &self.buckets[self.route(key)]
    }
}

impl Default for PartitionedStore {
    fn default() -> Self {
        Self::new(DEFAULT_SHARDS)
    }
}

impl Store for PartitionedStore {
    fn set(&self, key: &str, value: Vec<u8>) -> bool {
        self.bucket(key).set(key, value)
    }

    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.bucket(key).get(key)
    }

    fn delete(&self, key: &str) -> bool {
        self.bucket(key).delete(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_hash32_known_vectors() {
        assert_eq!(hash32(b""), 0);
        assert_eq!(hash32(b"hello"), 613153351);
        assert_eq!(hash32(b"The quick brown fox jumps over the lazy dog"), 0x2e4f_f723);
    }

    #[test]
    fn test_route_is_stable() {
        let store = PartitionedStore::new(8);
        assert_eq!(store.route("hello"), 7);
        assert_eq!(store.route("abc"), 2);
        for i in 0..100 {
            let key = format!("key-{}", i);
            let first = store.route(&key);
            assert!(first < 8);
            assert_eq!(store.route(&key), first);
        }
    }

    #[test]
    fn test_route_spreads_keys() {
        let store = PartitionedStore::new(16);
        let used: HashSet<usize> = (0..1000).map(|i| store.route(&format!("k{}", i))).collect();
        assert_eq!(used.len(), 16);
    }

    #[test]
    fn test_zero_shards_clamps_to_one() {
        let store = PartitionedStore::new(0);
        assert_eq!(store.shard_count(), 1);
        assert_eq!(store.route("anything"), 0);
    }

    #[test]
    fn test_single_shard_behaves_like_general_case() {
        for shards in [1, 7, DEFAULT_SHARDS] {
            let store = PartitionedStore::new(shards);
            assert_eq!(store.get("abc"), None);
            assert!(!store.set("abc", b"hello".to_vec()));
            assert!(store.set("abc", b"world".to_vec()));
            assert_eq!(store.get("abc"), Some(b"world".to_vec()));
            assert!(!store.set("empty", Vec::new()));
            assert_eq!(store.get("empty"), Some(Vec::new()));
            assert!(!store.delete("missing"));
            assert_eq!(store.len(), 2);
            assert!(store.delete("abc"));
            assert_eq!(store.get("abc"), None);
            if shards == 1 {
                assert!(["abc", "empty", "x", "y"].iter().all(|k| store.route(k) == 0));
            }
        }
    }

    #[test]
    fn test_concurrent_distinct_keys_lose_no_updates() {
        let store = Arc::new(PartitionedStore::new(4));
        let handles: Vec<_> = (0..16)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..1000 {
                        let key = format!("{}:{}", t, i);
                        assert!(!store.set(&key, key.as_bytes().to_vec()));
                        if i % 2 == 0 {
                            assert!(store.delete(&key));
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 16 * 500);
        assert_eq!(store.get("3:1"), Some(b"3:1".to_vec()));
        assert_eq!(store.get("3:2"), None);
    }
}
