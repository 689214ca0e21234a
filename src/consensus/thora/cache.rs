//! Snapshot cache abstraction.
//!
//! Snapshots are keyed by block hash, so competing branches at the same
//! height keep independent lineages. Entries carry no hidden state and can
//! be evicted at any time; the engine recomputes them from headers.

use super::{Snapshot, INMEMORY_SNAPSHOTS};
use alloy_primitives::B256;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

/// Trait for snapshot cache operations.
///
/// Implementations must tolerate concurrent readers and writers: verifying
/// independent branches from several threads shares one cache.
pub trait SnapshotCache: Send + Sync {
    /// Look up the snapshot taken at block `hash`.
    fn get(&self, hash: &B256) -> Option<Snapshot>;

    /// Store a snapshot under its own block hash.
    fn insert(&self, snapshot: Snapshot);

    /// Evict the snapshot for block `hash`.
    fn remove(&self, hash: &B256);

    /// Number of cached snapshots.
    fn len(&self) -> usize;

    /// Whether the cache holds no snapshots.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Least-recently-used snapshot cache.
#[derive(Debug)]
pub struct LruSnapshotCache {
    snapshots: Mutex<LruCache<B256, Snapshot>>,
}

impl LruSnapshotCache {
    /// Create a cache holding at most `capacity` snapshots.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self { snapshots: Mutex::new(LruCache::new(capacity)) }
    }
}

impl Default for LruSnapshotCache {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(INMEMORY_SNAPSHOTS).unwrap_or(NonZeroUsize::MIN))
    }
}

impl SnapshotCache for LruSnapshotCache {
    fn get(&self, hash: &B256) -> Option<Snapshot> {
        self.snapshots.lock().get(hash).cloned()
    }

    fn insert(&self, snapshot: Snapshot) {
        self.snapshots.lock().put(snapshot.hash, snapshot);
    }

    fn remove(&self, hash: &B256) {
        self.snapshots.lock().pop(hash);
    }

    fn len(&self) -> usize {
        self.snapshots.lock().len()
    }
}

/// A cache that remembers nothing.
///
/// Every lookup replays from genesis or a trusted checkpoint, which is what
/// a freshly restarted node does.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSnapshotCache;

impl SnapshotCache for NoopSnapshotCache {
    fn get(&self, _hash: &B256) -> Option<Snapshot> {
        None
    }

    fn insert(&self, _snapshot: Snapshot) {}

    fn remove(&self, _hash: &B256) {}

    fn len(&self) -> usize {
        0
    }
}
