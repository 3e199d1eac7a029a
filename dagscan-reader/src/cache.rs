//! A strict-LRU, CID-keyed byte cache (SPEC_FULL.md §4.5, §5). A thin
//! `Mutex<lru::LruCache>` wrapper rather than a concurrent map, since
//! cache entries are whole encoded blocks and the hot path is already a
//! single `get`-then-maybe-`put`; `lru` gives bounded eviction for free,
//! which a plain concurrent hash map would not.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use bytes::Bytes;
use cid::Cid;
use lru::LruCache;

pub struct BlockCache {
    inner: Mutex<LruCache<Cid, Bytes>>,
}

impl BlockCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, cid: &Cid) -> Option<Bytes> {
        self.inner.lock().unwrap().get(cid).cloned()
    }

    pub fn put(&self, cid: Cid, bytes: Bytes) {
        self.inner.lock().unwrap().put(cid, bytes);
    }
}
