//! Bucket storage.
//!
//! The limiter only needs "give me the bucket for this key"; how buckets are
//! kept (and whether they are ever evicted) is up to the store.

use std::sync::{Arc, Mutex};

use dashmap::DashMap;

use crate::rate_limiter::bucket::TokenBucket;

/// Shared handle to one client's bucket. The mutex is the per-key lock.
pub type SharedBucket = Arc<Mutex<TokenBucket>>;

/// Keyed bucket storage.
pub trait BucketStore: Send + Sync + 'static {
    /// Return the bucket for `key`, inserting `init()` on first sight.
    fn get_or_insert_with<F>(&self, key: &str, init: F) -> SharedBucket
    where
        F: FnOnce() -> TokenBucket;

    /// Number of tracked keys.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Unbounded in-memory store. Keys are never evicted.
///
/// The map's shard locks guard structure only; they are released before the
/// caller locks the returned bucket.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    buckets: DashMap<String, SharedBucket>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BucketStore for InMemoryStore {
    fn get_or_insert_with<F>(&self, key: &str, init: F) -> SharedBucket
    where
        F: FnOnce() -> TokenBucket,
    {
        if let Some(existing) = self.buckets.get(key) {
            return existing.value().clone();
        }

        self.buckets
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(init())))
            .value()
            .clone()
    }

    fn len(&self) -> usize {
        self.buckets.len()
    }
}
