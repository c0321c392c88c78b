//! LEANN: a hub-cached, pruned HNSW variant.
//!
//! A hub cache (top `hubCacheRatio` of nodes by degree, gated by
//! `hubDegreeThreshold`) sits in front of the graph. Insertion prunes each node's
//! outgoing edges to `graphPruningRatio · M`, preferring hub neighbors and shorter
//! distances. Search does a two-level lookup: linear scan over the hub cache for
//! seed candidates, then bounded graph expansion from those seeds; for small `n` it
//! falls back to brute force to guarantee recall.

use super::brute_force::BruteForce;
use super::{SnapshotEnvelope, VectorIndex};
use crate::constants::{
    DEFAULT_GRAPH_PRUNING_RATIO, DEFAULT_HUB_CACHE_RATIO, DEFAULT_HUB_DEGREE_THRESHOLD,
    LEANN_BRUTE_FORCE_THRESHOLD,
};
use crate::error::{Error, Result};
use crate::types::{
    validate_vector, ActiveBackend, ScoredId, SearchResult, VectorId, VectorIndexConfig,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Serialize, Deserialize)]
struct LeannNode {
    id: VectorId,
    vector: Vec<f32>,
    /// Pruned outgoing edges (by node index).
    edges: Vec<usize>,
    /// Bumped on every insert and every successful [`Leann::get`] read, so
    /// [`Leann::recompute_cold_vectors`] evicts by actual access recency.
    last_access: AtomicU64,
}

impl Clone for LeannNode {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            vector: self.vector.clone(),
            edges: self.edges.clone(),
            last_access: AtomicU64::new(self.last_access.load(Ordering::Relaxed)),
        }
    }
}

/// Cache performance counters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub avg_hub_degree: f32,
    pub total_edges: usize,
    pub pruned_edges: u64,
}

impl CacheMetrics {
    #[must_use]
    pub fn hit_ratio(&self) -> f32 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f32 / total as f32
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LeannSnapshot {
    nodes: Vec<Option<LeannNode>>,
    id_to_idx: HashMap<VectorId, usize>,
    hub_ids: Vec<usize>,
    clock: u64,
}

/// LEANN vector index backend.
pub struct Leann {
    config: VectorIndexConfig,
    nodes: Vec<Option<LeannNode>>,
    id_to_idx: HashMap<VectorId, usize>,
    hub_ids: HashSet<usize>,
    count: usize,
    /// Shared with each node's `last_access`; atomic so [`Self::get`] (an
    /// `&self` read) can still bump recency.
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    avg_hub_degree: f32,
    total_edges: usize,
    pruned_edges: u64,
    hub_cache_ratio: f32,
    hub_degree_threshold: usize,
    graph_pruning_ratio: f32,
}

impl Leann {
    #[must_use]
    pub fn new(config: VectorIndexConfig) -> Self {
        Self {
            config,
            nodes: Vec::new(),
            id_to_idx: HashMap::new(),
            hub_ids: HashSet::new(),
            count: 0,
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            avg_hub_degree: 0.0,
            total_edges: 0,
            pruned_edges: 0,
            hub_cache_ratio: DEFAULT_HUB_CACHE_RATIO,
            hub_degree_threshold: DEFAULT_HUB_DEGREE_THRESHOLD,
            graph_pruning_ratio: DEFAULT_GRAPH_PRUNING_RATIO,
        }
    }

    /// Cache hit/miss metrics.
    #[must_use]
    pub fn metrics(&self) -> CacheMetrics {
        CacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            avg_hub_degree: self.avg_hub_degree,
            total_edges: self.total_edges,
            pruned_edges: self.pruned_edges,
        }
    }

    /// Recompute the hub-node set: the top `hub_cache_ratio` of nodes by degree,
    /// among those with degree at least `hub_degree_threshold`.
    pub fn rebuild_hub_cache(&mut self) {
        let mut degrees: Vec<(usize, usize)> = self
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|n| (i, n.edges.len())))
            .filter(|&(_, d)| d >= self.hub_degree_threshold)
            .collect();
        degrees.sort_by(|a, b| b.1.cmp(&a.1));
        let keep = ((degrees.len() as f32) * self.hub_cache_ratio).ceil() as usize;
        self.hub_ids = degrees.into_iter().take(keep).map(|(i, _)| i).collect();

        let total_degree: usize = self.hub_ids.iter().filter_map(|&i| self.nodes[i].as_ref()).map(|n| n.edges.len()).sum();
        self.avg_hub_degree = if self.hub_ids.is_empty() {
            0.0
        } else {
            total_degree as f32 / self.hub_ids.len() as f32
        };
        self.total_edges = self
            .nodes
            .iter()
            .filter_map(|n| n.as_ref())
            .map(|n| n.edges.len())
            .sum();
    }

    fn distance(&self, query: &[f32], idx: usize) -> f32 {
        let Some(Some(node)) = self.nodes.get(idx) else {
            return f32::INFINITY;
        };
        self.config.metric.distance(query, &node.vector)
    }

    /// Prune `node_idx`'s candidate neighbor set down to `graph_pruning_ratio · M`,
    /// preferring hub targets and shorter distances, ties broken by descending
    /// neighbor degree.
    fn prune_candidates(&self, node_idx: usize, candidates: &[usize]) -> Vec<usize> {
        let cap = ((self.config.m as f32) * self.graph_pruning_ratio).ceil().max(1.0) as usize;
        let node_vector = self.nodes[node_idx]
            .as_ref()
            .map_or_else(Vec::new, |n| n.vector.clone());

        let mut scored: Vec<(usize, f32, bool, usize)> = candidates
            .iter()
            .filter(|&&c| c != node_idx)
            .map(|&c| {
                let d = self.config.metric.distance(&node_vector, &self.nodes[c].as_ref().map_or_else(Vec::new, |n| n.vector.clone()));
                let is_hub = self.hub_ids.contains(&c);
                let degree = self.nodes[c].as_ref().map_or(0, |n| n.edges.len());
                (c, d, is_hub, degree)
            })
            .collect();

        scored.sort_by(|a, b| {
            b.2.cmp(&a.2)
                .then_with(|| a.1.total_cmp(&b.1))
                .then_with(|| b.3.cmp(&a.3))
        });
        scored.truncate(cap);
        scored.into_iter().map(|(idx, _, _, _)| idx).collect()
    }

    fn brute_force_search(&self, query: &[f32], k: usize) -> Vec<ScoredId> {
        let mut scored: Vec<ScoredId> = self
            .nodes
            .iter()
            .filter_map(|n| n.as_ref())
            .map(|n| ScoredId {
                id: n.id.clone(),
                distance: self.config.metric.distance(query, &n.vector),
            })
            .collect();
        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(k);
        scored
    }

    /// Replace the vectors of least-recently-used non-hub entries with
    /// freshly generated embeddings, bounded by a latency budget.
    /// `regenerate` returns `None` to skip an entry (e.g. the regenerator has no
    /// opinion on that id).
    pub fn recompute_cold_vectors<F>(&mut self, max: usize, max_latency: Duration, mut regenerate: F) -> usize
    where
        F: FnMut(&str) -> Option<Vec<f32>>,
    {
        let start = Instant::now();
        let mut candidates: Vec<(usize, u64)> = self
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|n| (i, n.last_access.load(Ordering::Relaxed))))
            .filter(|(i, _)| !self.hub_ids.contains(i))
            .collect();
        candidates.sort_by_key(|&(_, last_access)| last_access);

        let mut recomputed = 0;
        for (idx, _) in candidates.into_iter().take(max) {
            if start.elapsed() > max_latency {
                break;
            }
            let id = self.nodes[idx].as_ref().map(|n| n.id.clone());
            if let Some(id) = id {
                if let Some(new_vec) = regenerate(&id) {
                    if let Some(Some(node)) = self.nodes.get_mut(idx) {
                        node.vector = new_vec;
                        recomputed += 1;
                    }
                }
            }
        }
        recomputed
    }
}

impl VectorIndex for Leann {
    fn insert(&mut self, id: VectorId, v: Vec<f32>) -> Result<()> {
        validate_vector(&v, self.config.dimension, self.config.metric)?;
        if self.id_to_idx.contains_key(&id) {
            self.remove(&id);
        }

        let new_idx = self.nodes.len();
        let clock = self.clock.fetch_add(1, Ordering::Relaxed) + 1;
        self.nodes.push(Some(LeannNode {
            id: id.clone(),
            vector: v,
            edges: Vec::new(),
            last_access: AtomicU64::new(clock),
        }));
        self.id_to_idx.insert(id, new_idx);
        self.count += 1;

        // Candidate edges: current hub set plus a handful of closest existing nodes.
        let node_vector = self.nodes[new_idx].as_ref().map_or_else(Vec::new, |n| n.vector.clone());
        let mut candidates: Vec<usize> = self.hub_ids.iter().copied().collect();
        let mut by_distance: Vec<(usize, f32)> = self
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|n| (i, n)))
            .filter(|(i, _)| *i != new_idx)
            .map(|(i, n)| (i, self.config.metric.distance(&node_vector, &n.vector)))
            .collect();
        by_distance.sort_by(|a, b| a.1.total_cmp(&b.1));
        candidates.extend(by_distance.into_iter().take(self.config.m).map(|(i, _)| i));
        candidates.sort_unstable();
        candidates.dedup();

        let before = candidates.len();
        let pruned = self.prune_candidates(new_idx, &candidates);
        self.pruned_edges += before.saturating_sub(pruned.len()) as u64;

        for &target in &pruned {
            if let Some(Some(node)) = self.nodes.get_mut(new_idx) {
                node.edges.push(target);
            }
            if let Some(Some(node)) = self.nodes.get_mut(target) {
                if !node.edges.contains(&new_idx) {
                    node.edges.push(new_idx);
                }
            }
        }

        self.rebuild_hub_cache();
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredId>> {
        validate_vector(query, self.config.dimension, self.config.metric)?;

        if self.count < LEANN_BRUTE_FORCE_THRESHOLD {
            return Ok(self.brute_force_search(query, k));
        }

        let seed_width = k.max(self.config.ef_search / 2).max(1);
        let mut hub_scored: Vec<ScoredId> = self
            .hub_ids
            .iter()
            .filter_map(|&i| self.nodes[i].as_ref().map(|n| (i, n)))
            .map(|(_, n)| ScoredId {
                id: n.id.clone(),
                distance: self.config.metric.distance(query, &n.vector),
            })
            .collect();
        hub_scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hub_scored.truncate(seed_width);

        let mut seed_indices: Vec<usize> = hub_scored
            .iter()
            .filter_map(|s| self.id_to_idx.get(&s.id).copied())
            .collect();
        if seed_indices.is_empty() {
            seed_indices = (0..self.nodes.len())
                .filter(|i| self.nodes[*i].is_some())
                .take(seed_width)
                .collect();
        }

        let mut visited: HashSet<usize> = HashSet::new();
        let mut frontier: Vec<usize> = seed_indices.clone();
        let mut candidate_pool: HashMap<usize, f32> = HashMap::new();
        for &s in &seed_indices {
            candidate_pool.insert(s, self.distance(query, s));
            visited.insert(s);
        }

        let bound = (k * 8).max(32);
        while let Some(current) = frontier.pop() {
            let Some(Some(node)) = self.nodes.get(current) else {
                continue;
            };
            for &neighbor in &node.edges {
                if visited.contains(&neighbor) {
                    continue;
                }
                visited.insert(neighbor);
                let d = self.distance(query, neighbor);
                candidate_pool.insert(neighbor, d);
                if candidate_pool.len() < bound {
                    frontier.push(neighbor);
                }
            }
        }

        let mut scored: Vec<ScoredId> = candidate_pool
            .into_iter()
            .filter_map(|(idx, dist)| self.nodes[idx].as_ref().map(|n| ScoredId { id: n.id.clone(), distance: dist }))
            .collect();
        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(k);
        Ok(scored)
    }

    fn search_with_vectors(
        &self,
        query: &[f32],
        k: usize,
        include_vectors: bool,
    ) -> Result<Vec<SearchResult>> {
        let scored = self.search(query, k)?;
        Ok(scored
            .into_iter()
            .map(|s| {
                let similarity = self.config.metric.distance_to_similarity(s.distance);
                let vector = if include_vectors { self.get(&s.id) } else { None };
                SearchResult { id: s.id, similarity, vector }
            })
            .collect())
    }

    fn get(&self, id: &str) -> Option<Vec<f32>> {
        let Some(&idx) = self.id_to_idx.get(id) else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };
        let is_hit = self.nodes.get(idx).is_some_and(Option::is_some);
        if !is_hit {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        self.hits.fetch_add(1, Ordering::Relaxed);
        let clock = self.clock.fetch_add(1, Ordering::Relaxed) + 1;
        let node = self.nodes[idx].as_ref().expect("checked by is_hit above");
        node.last_access.store(clock, Ordering::Relaxed);
        Some(node.vector.clone())
    }

    fn has(&self, id: &str) -> bool {
        self.id_to_idx.contains_key(id)
    }

    fn remove(&mut self, id: &str) -> bool {
        let Some(idx) = self.id_to_idx.remove(id) else {
            return false;
        };
        self.nodes[idx] = None;
        self.hub_ids.remove(&idx);
        self.count = self.count.saturating_sub(1);
        for slot in self.nodes.iter_mut().flatten() {
            slot.edges.retain(|&e| e != idx);
        }
        true
    }

    fn count(&self) -> usize {
        self.count
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.id_to_idx.clear();
        self.hub_ids.clear();
        self.count = 0;
        self.clock = AtomicU64::new(0);
        self.hits = AtomicU64::new(0);
        self.misses = AtomicU64::new(0);
        self.avg_hub_degree = 0.0;
        self.total_edges = 0;
        self.pruned_edges = 0;
    }

    fn save(&self, path: &Path) -> Result<()> {
        let snapshot = LeannSnapshot {
            nodes: self.nodes.clone(),
            id_to_idx: self.id_to_idx.clone(),
            hub_ids: self.hub_ids.iter().copied().collect(),
            clock: self.clock.load(Ordering::Relaxed),
        };
        let envelope = SnapshotEnvelope::new(self.config.clone(), snapshot);
        let bytes = bincode::serialize(&envelope)
            .map_err(|e| Error::Persistence(format!("encode leann snapshot: {e}")))?;
        std::fs::write(path, bytes)?;

        // Side-car content file (`<path>.content`): holds the ids present in this
        // snapshot, useful for external tooling without decoding the binary blob.
        let content_path = path.with_extension("content");
        let ids: Vec<&VectorId> = self.id_to_idx.keys().collect();
        let content = serde_json::to_vec(&ids)
            .map_err(|e| Error::Persistence(format!("encode leann content sidecar: {e}")))?;
        std::fs::write(content_path, content)?;
        Ok(())
    }

    fn load(&mut self, path: &Path) -> Result<bool> {
        if !path.exists() {
            return Ok(false);
        }
        let bytes = std::fs::read(path)?;
        let envelope: SnapshotEnvelope<LeannSnapshot> = bincode::deserialize(&bytes)
            .map_err(|e| Error::Persistence(format!("decode leann snapshot: {e}")))?;
        envelope.check_version()?;
        if envelope.config.dimension != self.config.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.config.dimension,
                actual: envelope.config.dimension,
            });
        }
        self.config = envelope.config;
        self.nodes = envelope.payload.nodes;
        self.id_to_idx = envelope.payload.id_to_idx;
        self.hub_ids = envelope.payload.hub_ids.into_iter().collect();
        self.clock = AtomicU64::new(envelope.payload.clock);
        self.count = self.id_to_idx.len();
        self.rebuild_hub_cache();
        Ok(true)
    }

    fn active_backend(&self) -> ActiveBackend {
        ActiveBackend::Leann
    }

    fn config(&self) -> &VectorIndexConfig {
        &self.config
    }

    fn cache_metrics(&self) -> Option<CacheMetrics> {
        Some(self.metrics())
    }
}

/// Construct the `auto`-selection brute-force fallback, used when
/// neither graph backend can be linked.
#[must_use]
pub fn fallback(config: VectorIndexConfig) -> BruteForce {
    BruteForce::new(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Metric;

    fn cfg() -> VectorIndexConfig {
        let mut c = VectorIndexConfig::new(4, Metric::Euclidean);
        c.m = 4;
        c
    }

    #[test]
    fn small_n_uses_brute_force_and_is_exact() {
        let mut idx = Leann::new(cfg());
        for i in 0..10 {
            idx.insert(format!("v{i}"), vec![i as f32, 0.0, 0.0, 0.0])
                .unwrap();
        }
        let results = idx.search(&[0.0, 0.0, 0.0, 0.0], 3).unwrap();
        assert_eq!(results[0].id, "v0");
        assert_eq!(results[1].id, "v1");
        assert_eq!(results[2].id, "v2");
    }

    #[test]
    fn hub_cache_tracks_high_degree_nodes() {
        let mut idx = Leann::new(cfg());
        for i in 0..50 {
            idx.insert(format!("v{i}"), vec![i as f32, 0.0, 0.0, 0.0])
                .unwrap();
        }
        idx.rebuild_hub_cache();
        assert!(idx.metrics().total_edges > 0);
    }

    #[test]
    fn remove_drops_from_hub_cache() {
        let mut idx = Leann::new(cfg());
        for i in 0..5 {
            idx.insert(format!("v{i}"), vec![i as f32, 0.0, 0.0, 0.0])
                .unwrap();
        }
        idx.remove("v0");
        assert!(!idx.has("v0"));
    }
}
