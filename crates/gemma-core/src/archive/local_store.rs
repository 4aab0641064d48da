//! Bounded in-memory map of locally synthesized artifacts

use super::artifact::{Artifact, ArtifactSummary};
use lru::LruCache;
use std::num::NonZeroUsize;
use tracing::debug;

/// Default number of local artifacts kept
pub const DEFAULT_LOCAL_CAPACITY: usize = 5;

/// Local artifacts, evicted oldest-first once full
///
/// Entries are only ever read with `peek`, so recency never changes and the
/// cache's eviction order is insertion order.
#[derive(Debug)]
pub struct LocalArtifactStore {
    cache: LruCache<String, Artifact>,
}

impl Default for LocalArtifactStore {
    fn default() -> Self {
        Self::new(DEFAULT_LOCAL_CAPACITY)
    }
}

impl LocalArtifactStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
        }
    }

    /// Register an artifact, returning the id it was stored under and the
    /// artifact evicted to make room, if any
    ///
    /// Two artifacts minted in the same millisecond would share an id; the
    /// later one gets a numeric suffix.
    pub fn register(&mut self, mut artifact: Artifact) -> (String, Option<Artifact>) {
        artifact.is_local = true;
        if self.cache.contains(&artifact.artifact_id) {
            let base = artifact.artifact_id.clone();
            let mut n = 2;
            while self.cache.contains(&format!("{}-{}", base, n)) {
                n += 1;
            }
            artifact.artifact_id = format!("{}-{}", base, n);
        }

        let id = artifact.artifact_id.clone();
        let evicted = self.cache.push(id.clone(), artifact).map(|(_, old)| old);
        if let Some(old) = &evicted {
            debug!(evicted = %old.artifact_id, "Local artifact evicted");
        }
        (id, evicted)
    }

    pub fn get(&self, artifact_id: &str) -> Option<&Artifact> {
        self.cache.peek(artifact_id)
    }

    pub fn contains(&self, artifact_id: &str) -> bool {
        self.cache.contains(artifact_id)
    }

    /// Newest first
    pub fn summaries(&self) -> Vec<ArtifactSummary> {
        self.cache.iter().map(|(_, a)| a.summary()).collect()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }
}
