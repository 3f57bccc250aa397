use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

use crate::graph::FamilyGraph;

/// Thread-safe LRU cache of built family graphs, keyed by store revision.
///
/// A revision identifies one immutable store state, so a cached graph never
/// goes stale; it just stops being requested once the store moves on.
/// Handing out `Arc`s lets in-flight queries keep their snapshot while a
/// newer one is built.
pub struct GraphCache {
    cache: Mutex<LruCache<u64, Arc<FamilyGraph>>>,
}

impl GraphCache {
    /// Create a new graph cache; a capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);

        Self {
            cache: Mutex::new(LruCache::new(cap)),
        }
    }

    pub fn get(&self, revision: u64) -> Option<Arc<FamilyGraph>> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&revision)
            .cloned()
    }

    pub fn put(&self, revision: u64, graph: Arc<FamilyGraph>) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(revision, graph);
    }

    /// Return the cached graph for `revision`, building it on a miss.
    pub fn get_or_build<F>(&self, revision: u64, build: F) -> Arc<FamilyGraph>
    where
        F: FnOnce() -> FamilyGraph,
    {
        if let Some(graph) = self.get(revision) {
            log::debug!("Graph cache hit for revision {}", revision);
            return graph;
        }
        log::debug!("Graph cache miss for revision {}, rebuilding", revision);
        let graph = Arc::new(build());
        self.put(revision, Arc::clone(&graph));
        graph
    }

    pub fn len(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
