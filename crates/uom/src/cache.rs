//! Per-(tenant, group) cache of built conversion graphs.
//!
//! Entries must be invalidated synchronously whenever an edge of that
//! (tenant, group) is created, updated or deactivated; [`crate::UomService`]
//! does so on every edge write it performs.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tallyforge_core::{TenantId, UnitGroupId};

use crate::graph::ConversionGraph;

type CacheKey = (TenantId, UnitGroupId);

/// Invalidation stamp of one (tenant, group), taken before its edges are read.
///
/// Any invalidation of the key, of its tenant or of the whole cache changes the
/// stamp, so a graph built from edges read under an older stamp is never stored.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CacheGeneration {
    key: CacheKey,
    cleared: u64,
    tenant: u64,
    group: u64,
}

#[derive(Debug, Default)]
struct Entries {
    graphs: HashMap<CacheKey, Arc<ConversionGraph>>,
    group_generations: HashMap<CacheKey, u64>,
    tenant_generations: HashMap<TenantId, u64>,
    cleared: u64,
}

impl Entries {
    fn generation(&self, key: CacheKey) -> CacheGeneration {
        CacheGeneration {
            key,
            cleared: self.cleared,
            tenant: self.tenant_generations.get(&key.0).copied().unwrap_or(0),
            group: self.group_generations.get(&key).copied().unwrap_or(0),
        }
    }
}

#[derive(Debug, Default)]
pub struct GraphCache {
    // A poisoned lock still guards whole entries: every write is a single map
    // operation, so a panicking writer never leaves one half-applied.
    inner: RwLock<Entries>,
}

impl GraphCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tenant_id: TenantId, group_id: UnitGroupId) -> Option<Arc<ConversionGraph>> {
        let entries = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        entries.graphs.get(&(tenant_id, group_id)).cloned()
    }

    /// Current stamp of (tenant, group). Take it before reading edges for a rebuild.
    pub fn generation(&self, tenant_id: TenantId, group_id: UnitGroupId) -> CacheGeneration {
        let entries = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        entries.generation((tenant_id, group_id))
    }

    /// Store `graph` unconditionally.
    pub fn insert(&self, graph: ConversionGraph) -> Arc<ConversionGraph> {
        let graph = Arc::new(graph);
        let mut entries = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        entries
            .graphs
            .insert((graph.tenant_id(), graph.group_id()), graph.clone());
        graph
    }

    /// Store `graph` only if its key was not invalidated since `generation` was
    /// taken. The graph is returned either way; a stale one serves only the
    /// caller that built it.
    pub fn insert_if_current(
        &self,
        generation: CacheGeneration,
        graph: ConversionGraph,
    ) -> Arc<ConversionGraph> {
        let graph = Arc::new(graph);
        let key = (graph.tenant_id(), graph.group_id());
        let mut entries = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if key == generation.key && entries.generation(key) == generation {
            entries.graphs.insert(key, graph.clone());
        }
        graph
    }

    pub fn invalidate(&self, tenant_id: TenantId, group_id: UnitGroupId) -> bool {
        let key = (tenant_id, group_id);
        let mut entries = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *entries.group_generations.entry(key).or_insert(0) += 1;
        entries.graphs.remove(&key).is_some()
    }

    pub fn invalidate_tenant(&self, tenant_id: TenantId) {
        let mut entries = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *entries.tenant_generations.entry(tenant_id).or_insert(0) += 1;
        entries.graphs.retain(|(t, _g), _| *t != tenant_id);
    }

    pub fn clear(&self) {
        let mut entries = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        entries.cleared += 1;
        entries.graphs.clear();
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .graphs
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_and_invalidate() {
        let cache = GraphCache::new();
        let (tenant_id, group_id) = (TenantId::new(), UnitGroupId::new());

        cache.insert(ConversionGraph::empty(tenant_id, group_id));
        assert!(cache.get(tenant_id, group_id).is_some());
        assert!(cache.get(TenantId::new(), group_id).is_none());

        assert!(cache.invalidate(tenant_id, group_id));
        assert!(cache.get(tenant_id, group_id).is_none());
        assert!(!cache.invalidate(tenant_id, group_id));
    }

    #[test]
    fn invalidate_tenant_leaves_other_tenants() {
        let cache = GraphCache::new();
        let (a, b) = (TenantId::new(), TenantId::new());
        let group_id = UnitGroupId::new();

        cache.insert(ConversionGraph::empty(a, group_id));
        cache.insert(ConversionGraph::empty(a, UnitGroupId::new()));
        cache.insert(ConversionGraph::empty(b, group_id));

        cache.invalidate_tenant(a);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(b, group_id).is_some());

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidation_during_a_rebuild_discards_the_rebuilt_graph() {
        let cache = GraphCache::new();
        let (tenant_id, group_id) = (TenantId::new(), UnitGroupId::new());

        let before = cache.generation(tenant_id, group_id);
        cache.invalidate(tenant_id, group_id);
        cache.insert_if_current(before, ConversionGraph::empty(tenant_id, group_id));
        assert!(cache.get(tenant_id, group_id).is_none());

        let current = cache.generation(tenant_id, group_id);
        cache.insert_if_current(current, ConversionGraph::empty(tenant_id, group_id));
        assert!(cache.get(tenant_id, group_id).is_some());
    }

    #[test]
    fn tenant_invalidation_and_clear_change_every_stamp() {
        let cache = GraphCache::new();
        let (tenant_id, group_id) = (TenantId::new(), UnitGroupId::new());

        let before = cache.generation(tenant_id, group_id);
        cache.invalidate_tenant(tenant_id);
        assert_ne!(cache.generation(tenant_id, group_id), before);
        assert_eq!(
            cache.generation(TenantId::new(), group_id),
            cache.generation(TenantId::new(), group_id)
        );

        let before = cache.generation(tenant_id, group_id);
        cache.clear();
        cache.insert_if_current(before, ConversionGraph::empty(tenant_id, group_id));
        assert!(cache.is_empty());
    }
}
