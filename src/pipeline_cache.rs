//! Pipeline-state caches.
//!
//! Hashes a pipeline's fixed-function state with a cheap combiner and keys a map of
//! already-built `VkPipeline`s by it, so two draws requesting identical state reuse one
//! pipeline object. Grounded here on [`crate::util::free_list_allocator::FreeList`]'s
//! `Arc<RwLock<..>>` sharing discipline, since the cache is read far more often than
//! written and is shared across the render-thread dispatcher.

use std::collections::HashMap;
use std::sync::RwLock;

use ash::vk;

/// Combines two hash values: no attempt at avalanche behavior, just enough to
/// disambiguate fixed-function state tuples cheaply every frame.
pub fn hash_combine(a: u64, b: u64) -> u64 {
    a.wrapping_mul(31).wrapping_add(b)
}

/// Hashes an ordered sequence of `u64`s with [`hash_combine`], seeded at zero.
pub fn hash_combine_all(values: impl IntoIterator<Item = u64>) -> u64 {
    values.into_iter().fold(0u64, hash_combine)
}

/// Caches built pipeline handles keyed by a caller-computed state hash.
///
/// Doesn't own the `VkPipeline`s it caches; destruction happens through the deferred
/// destruction ring like every other resource, this only deduplicates lookups.
pub struct PipelineStateCache {
    entries: RwLock<HashMap<u64, vk::Pipeline>>,
}

impl PipelineStateCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached pipeline for `state_hash`, if one was already built.
    pub fn get(&self, state_hash: u64) -> Option<vk::Pipeline> {
        self.entries
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(&state_hash)
            .copied()
    }

    /// Returns the cached pipeline for `state_hash`, building and inserting it via
    /// `build` on a miss. `build` may be expensive (a `vkCreateGraphicsPipelines` call)
    /// so it only runs when the read path misses.
    pub fn get_or_insert_with(
        &self,
        state_hash: u64,
        build: impl FnOnce() -> anyhow::Result<vk::Pipeline>,
    ) -> anyhow::Result<vk::Pipeline> {
        if let Some(pipeline) = self.get(state_hash) {
            return Ok(pipeline);
        }
        let pipeline = build()?;
        let mut entries = self.entries.write().unwrap_or_else(|p| p.into_inner());
        Ok(*entries.entry(state_hash).or_insert(pipeline))
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drains every cached handle; callers are responsible for destroying them
    /// (typically by handing each to [`crate::destruction::DestructionRing`]).
    pub fn drain(&self) -> Vec<vk::Pipeline> {
        let mut entries = self.entries.write().unwrap_or_else(|p| p.into_inner());
        entries.drain().map(|(_, pipeline)| pipeline).collect()
    }
}

impl Default for PipelineStateCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    #[test]
    fn hash_combine_is_order_sensitive() {
        let ab = hash_combine_all([1u64, 2]);
        let ba = hash_combine_all([2u64, 1]);
        assert_ne!(ab, ba);
    }

    #[test]
    fn get_or_insert_with_builds_once() {
        let cache = PipelineStateCache::new();
        let builds = std::sync::atomic::AtomicUsize::new(0);
        let key = hash_combine_all([1, 2, 3]);
        for _ in 0..5 {
            cache
                .get_or_insert_with(key, || {
                    builds.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    Ok(vk::Pipeline::from_raw(0xdead_beef))
                })
                .unwrap();
        }
        assert_eq!(builds.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn drain_empties_the_cache() {
        let cache = PipelineStateCache::new();
        cache
            .get_or_insert_with(hash_combine(1, 2), || Ok(vk::Pipeline::from_raw(1)))
            .unwrap();
        let drained = cache.drain();
        assert_eq!(drained.len(), 1);
        assert!(cache.is_empty());
    }
}
