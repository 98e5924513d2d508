//! Cache of security snapshots.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use warden_acl::{Invalidation, InvalidationSink};
use warden_core::error::Result;
use warden_core::id::ContentId;

use crate::info::SecurityInfo;

/// Security snapshots by content id.
///
/// Every entry is stamped with the generation it was computed in. Any
/// invalidation bumps the generation, which makes every older entry stale
/// at once; stale entries are recomputed on their next read.
pub struct SecurityInfoCache {
    generation: AtomicU64,
    enabled: bool,
    max_entries: usize,
    entries: DashMap<ContentId, (u64, Arc<SecurityInfo>)>,
}

impl SecurityInfoCache {
    /// Create a cache. A disabled cache computes every snapshot afresh.
    pub fn new(enabled: bool, max_entries: usize) -> Self {
        Self {
            generation: AtomicU64::new(0),
            enabled,
            max_entries,
            entries: DashMap::new(),
        }
    }

    /// The current generation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// The cached snapshot of `content`, if it is current.
    pub fn get(&self, content: ContentId) -> Option<Arc<SecurityInfo>> {
        let generation = self.generation();
        self.entries
            .get(&content)
            .filter(|entry| entry.0 == generation)
            .map(|entry| entry.1.clone())
    }

    /// The cached snapshot of `content`, computing it with `load` if it is
    /// missing or stale.
    pub fn get_or_load<F>(&self, content: ContentId, load: F) -> Result<Arc<SecurityInfo>>
    where
        F: FnOnce() -> Result<SecurityInfo>,
    {
        if !self.enabled {
            return load().map(Arc::new);
        }
        if let Some(info) = self.get(content) {
            return Ok(info);
        }
        // Stamp with the generation seen before loading, so an invalidation
        // racing with the load leaves the entry stale
        let generation = self.generation();
        let info = Arc::new(load()?);
        self.entries.insert(content, (generation, info.clone()));
        self.evict();
        Ok(info)
    }

    /// Forget the snapshot of one content, e.g. after it was saved.
    pub fn remove(&self, content: ContentId) {
        self.entries.remove(&content);
    }

    /// Make every cached snapshot stale.
    pub fn bump(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Number of cached snapshots, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict(&self) {
        if self.entries.len() <= self.max_entries {
            return;
        }
        let generation = self.generation();
        self.entries.retain(|_, entry| entry.0 == generation);

        while self.entries.len() > self.max_entries {
            let victim = self.entries.iter().next().map(|e| *e.key());
            match victim {
                Some(content) => {
                    self.entries.remove(&content);
                }
                None => break,
            }
        }
    }
}

impl InvalidationSink for SecurityInfoCache {
    fn invalidate(&self, event: &Invalidation) {
        let generation = self.bump();
        debug!(event = %event, generation, "Security infos invalidated");
    }
}
