//! Classical Malkov-Yashunin HNSW.
//!
//! Per-node level is drawn from `⌊-ln(U(0,1)) · mL⌋` with `mL = 1/ln(M)`. Insertion
//! greedy-descends from the global entry point to the node's level, then
//! beam-searches with width `ef_construction` at each level at or below the node's
//! level, keeping up to `M` (or `M0 = 2M` at level 0) closest neighbors and pruning
//! any neighbor whose degree then exceeds the cap. Search greedy-descends to level 1,
//! then beam-searches level 0 with width `max(ef_search, k)`.

use super::{SnapshotEnvelope, VectorIndex};
use crate::constants::QUANT_RERANK_MULTIPLIER;
#[cfg(test)]
use crate::distance::Metric;
use crate::error::{Error, Result};
use crate::quantization::{quality_metrics, QuantizationQuality, QuantizedVector};
use crate::types::{
    validate_vector, ActiveBackend, ScoredId, SearchResult, VectorId, VectorIndexConfig,
};
use rand::RngExt;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HnswNode {
    id: VectorId,
    level: usize,
    /// Outgoing neighbor indices, one `Vec` per level `0..=level`.
    neighbors: Vec<Vec<usize>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GraphSnapshot {
    nodes: Vec<Option<HnswNode>>,
    vectors: Vec<Option<Vec<f32>>>,
    quantized: Vec<Option<QuantizedVector>>,
    entry_point: Option<usize>,
    max_level: usize,
    id_to_idx: HashMap<VectorId, usize>,
}

/// Graph-HNSW vector index.
pub struct GraphHnsw {
    config: VectorIndexConfig,
    nodes: Vec<Option<HnswNode>>,
    vectors: Vec<Option<Vec<f32>>>,
    quantized: Vec<Option<QuantizedVector>>,
    entry_point: Option<usize>,
    max_level: usize,
    id_to_idx: HashMap<VectorId, usize>,
    count: usize,
    ml: f64,
    /// Running sums behind [`Self::quantization_metrics`]; `None` fields
    /// until the first quantized insert.
    quant_samples: usize,
    quant_mse_sum: f32,
    quant_mae_sum: f32,
    quant_max_abs_error: f32,
    quant_sqnr_sum: f32,
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    dist: f32,
    idx: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.dist == other.dist
    }
}
impl Eq for Candidate {}
impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; we want the *smallest* distance to sort first
        // when popped from a min-heap, so reverse the natural f32 ordering here.
        other
            .dist
            .partial_cmp(&self.dist)
            .unwrap_or(Ordering::Equal)
    }
}

impl GraphHnsw {
    #[must_use]
    pub fn new(config: VectorIndexConfig) -> Self {
        let ml = 1.0 / (config.m.max(2) as f64).ln();
        Self {
            config,
            nodes: Vec::new(),
            vectors: Vec::new(),
            quantized: Vec::new(),
            entry_point: None,
            max_level: 0,
            id_to_idx: HashMap::new(),
            count: 0,
            ml,
            quant_samples: 0,
            quant_mse_sum: 0.0,
            quant_mae_sum: 0.0,
            quant_max_abs_error: 0.0,
            quant_sqnr_sum: 0.0,
        }
    }

    fn random_level(&self) -> usize {
        let u: f64 = rand::rng().random_range(f64::EPSILON..1.0);
        (-u.ln() * self.ml).floor() as usize
    }

    fn vector_for(&self, idx: usize) -> Vec<f32> {
        if self.config.quantize {
            if let Some(Some(q)) = self.quantized.get(idx) {
                return q.dequantize();
            }
        }
        self.vectors[idx].clone().unwrap_or_default()
    }

    fn distance_to(&self, query: &[f32], idx: usize) -> f32 {
        self.config.metric.distance(query, &self.vector_for(idx))
    }

    fn neighbors_cap(&self, level: usize) -> usize {
        if level == 0 {
            self.config.m0()
        } else {
            self.config.m
        }
    }

    /// Greedy single-path descent at `layer`, returning the closest node found
    /// starting from `entry`.
    fn search_layer_greedy(&self, query: &[f32], entry: usize, layer: usize) -> usize {
        let mut current = entry;
        let mut current_dist = self.distance_to(query, current);
        loop {
            let mut improved = false;
            if let Some(Some(node)) = self.nodes.get(current) {
                if let Some(level_neighbors) = node.neighbors.get(layer) {
                    for &n in level_neighbors {
                        if self.nodes.get(n).is_none_or(Option::is_none) {
                            continue;
                        }
                        let d = self.distance_to(query, n);
                        if d < current_dist {
                            current = n;
                            current_dist = d;
                            improved = true;
                        }
                    }
                }
            }
            if !improved {
                return current;
            }
        }
    }

    /// Beam search at `layer` starting from `entry_points`, returning up to `ef`
    /// candidates sorted ascending by distance.
    fn search_layer(
        &self,
        query: &[f32],
        entry_points: &[usize],
        ef: usize,
        layer: usize,
    ) -> Vec<Candidate> {
        let mut visited: std::collections::HashSet<usize> = entry_points.iter().copied().collect();
        let mut candidates: BinaryHeap<Candidate> = BinaryHeap::new();
        let mut found: Vec<Candidate> = Vec::new();

        for &ep in entry_points {
            let d = self.distance_to(query, ep);
            candidates.push(Candidate { dist: d, idx: ep });
            found.push(Candidate { dist: d, idx: ep });
        }

        while let Some(current) = candidates.pop() {
            let worst_found = found
                .iter()
                .map(|c| c.dist)
                .fold(f32::NEG_INFINITY, f32::max);
            if found.len() >= ef && current.dist > worst_found {
                break;
            }
            if let Some(Some(node)) = self.nodes.get(current.idx) {
                if let Some(level_neighbors) = node.neighbors.get(layer) {
                    for &n in level_neighbors {
                        if visited.contains(&n) || self.nodes.get(n).is_none_or(Option::is_none) {
                            continue;
                        }
                        visited.insert(n);
                        let d = self.distance_to(query, n);
                        if found.len() < ef {
                            candidates.push(Candidate { dist: d, idx: n });
                            found.push(Candidate { dist: d, idx: n });
                        } else {
                            let worst = found
                                .iter()
                                .enumerate()
                                .max_by(|a, b| a.1.dist.total_cmp(&b.1.dist))
                                .map(|(i, _)| i);
                            if let Some(worst_idx) = worst {
                                if d < found[worst_idx].dist {
                                    found[worst_idx] = Candidate { dist: d, idx: n };
                                    candidates.push(Candidate { dist: d, idx: n });
                                }
                            }
                        }
                    }
                }
            }
        }

        found.sort_by(|a, b| a.dist.total_cmp(&b.dist));
        found.truncate(ef);
        found
    }

    /// Select up to `cap` neighbors from `candidates` by simple closest-first
    /// heuristic.
    fn select_neighbors_simple(candidates: &[Candidate], cap: usize) -> Vec<usize> {
        let mut sorted = candidates.to_vec();
        sorted.sort_by(|a, b| a.dist.total_cmp(&b.dist));
        sorted.truncate(cap);
        sorted.into_iter().map(|c| c.idx).collect()
    }

    /// Prune `node_idx`'s neighbor list at `layer` down to `cap`, keeping the
    /// closest links to the node's own vector.
    fn prune_neighbors(&mut self, node_idx: usize, layer: usize, cap: usize) {
        let node_vector = self.vector_for(node_idx);
        let Some(Some(node)) = self.nodes.get(node_idx) else {
            return;
        };
        if node.neighbors[layer].len() <= cap {
            return;
        }
        let mut scored: Vec<Candidate> = node.neighbors[layer]
            .iter()
            .map(|&n| Candidate {
                dist: self.config.metric.distance(&node_vector, &self.vector_for(n)),
                idx: n,
            })
            .collect();
        scored.sort_by(|a, b| a.dist.total_cmp(&b.dist));
        scored.truncate(cap);
        if let Some(Some(node)) = self.nodes.get_mut(node_idx) {
            node.neighbors[layer] = scored.into_iter().map(|c| c.idx).collect();
        }
    }

    fn link_bidirectional(&mut self, a: usize, b: usize, layer: usize) {
        if let Some(Some(node)) = self.nodes.get_mut(a) {
            if layer < node.neighbors.len() && !node.neighbors[layer].contains(&b) {
                node.neighbors[layer].push(b);
            }
        }
        if let Some(Some(node)) = self.nodes.get_mut(b) {
            if layer < node.neighbors.len() && !node.neighbors[layer].contains(&a) {
                node.neighbors[layer].push(a);
            }
        }
        let cap = self.neighbors_cap(layer);
        self.prune_neighbors(a, layer, cap);
        self.prune_neighbors(b, layer, cap);
    }

    fn insert_vector(&mut self, v: Vec<f32>) -> usize {
        let idx = self.vectors.len();
        if self.config.quantize {
            let quantized = QuantizedVector::quantize(&v);
            let quality = quality_metrics(&v, &quantized);
            self.quant_samples += 1;
            self.quant_mse_sum += quality.mse;
            self.quant_mae_sum += quality.mae;
            self.quant_max_abs_error = self.quant_max_abs_error.max(quality.max_abs_error);
            self.quant_sqnr_sum += quality.sqnr_db;
            self.quantized.push(Some(quantized));
        } else {
            self.quantized.push(None);
        }
        self.vectors.push(Some(v));
        idx
    }

    fn re_rank_with_full_precision(&self, query: &[f32], candidates: &mut [Candidate]) {
        for c in candidates.iter_mut() {
            if let Some(Some(full)) = self.vectors.get(c.idx) {
                c.dist = self.config.metric.distance(query, full);
            }
        }
        candidates.sort_by(|a, b| a.dist.total_cmp(&b.dist));
    }
}

impl VectorIndex for GraphHnsw {
    fn insert(&mut self, id: VectorId, v: Vec<f32>) -> Result<()> {
        validate_vector(&v, self.config.dimension, self.config.metric)?;

        if self.id_to_idx.contains_key(&id) {
            self.remove(&id);
        }

        let level = self.random_level();
        let new_idx = self.insert_vector(v.clone());
        self.nodes.push(Some(HnswNode {
            id: id.clone(),
            level,
            neighbors: vec![Vec::new(); level + 1],
        }));
        self.id_to_idx.insert(id, new_idx);
        self.count += 1;

        let Some(entry) = self.entry_point else {
            self.entry_point = Some(new_idx);
            self.max_level = level;
            return Ok(());
        };

        let mut current = entry;
        for layer in (level + 1..=self.max_level).rev() {
            current = self.search_layer_greedy(&v, current, layer);
        }

        for layer in (0..=level.min(self.max_level)).rev() {
            let candidates = self.search_layer(&v, &[current], self.config.ef_construction, layer);
            let cap = self.neighbors_cap(layer);
            let selected = Self::select_neighbors_simple(&candidates, cap);
            for &n in &selected {
                self.link_bidirectional(new_idx, n, layer);
            }
            if let Some(best) = candidates.first() {
                current = best.idx;
            }
        }

        if level > self.max_level {
            self.max_level = level;
            self.entry_point = Some(new_idx);
        }

        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredId>> {
        validate_vector(query, self.config.dimension, self.config.metric)?;
        let Some(entry) = self.entry_point else {
            return Ok(Vec::new());
        };

        let mut current = entry;
        for layer in (1..=self.max_level).rev() {
            current = self.search_layer_greedy(query, current, layer);
        }

        let ef = self.config.ef_search.max(k);
        let mut candidates = self.search_layer(query, &[current], ef, 0);

        if self.config.quantize {
            let rerank_width = (k * QUANT_RERANK_MULTIPLIER).max(k);
            candidates.truncate(rerank_width.max(candidates.len().min(rerank_width)));
            self.re_rank_with_full_precision(query, &mut candidates);
        }

        candidates.truncate(k);
        Ok(candidates
            .into_iter()
            .filter_map(|c| {
                self.nodes.get(c.idx)?.as_ref().map(|n| ScoredId {
                    id: n.id.clone(),
                    distance: c.dist,
                })
            })
            .collect())
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
                SearchResult {
                    id: s.id,
                    similarity,
                    vector,
                }
            })
            .collect())
    }

    fn get(&self, id: &str) -> Option<Vec<f32>> {
        let idx = *self.id_to_idx.get(id)?;
        self.vectors.get(idx)?.clone()
    }

    fn has(&self, id: &str) -> bool {
        self.id_to_idx.contains_key(id)
    }

    fn remove(&mut self, id: &str) -> bool {
        let Some(idx) = self.id_to_idx.remove(id) else {
            return false;
        };
        self.nodes[idx] = None;
        self.vectors[idx] = None;
        if idx < self.quantized.len() {
            self.quantized[idx] = None;
        }
        self.count = self.count.saturating_sub(1);

        for slot in self.nodes.iter_mut().flatten() {
            for level in &mut slot.neighbors {
                level.retain(|&n| n != idx);
            }
        }

        if self.entry_point == Some(idx) {
            self.entry_point = self
                .nodes
                .iter()
                .enumerate()
                .filter_map(|(i, n)| n.as_ref().map(|_| i))
                .next_back();
            self.max_level = self
                .entry_point
                .and_then(|e| self.nodes[e].as_ref())
                .map_or(0, |n| n.level);
        }
        true
    }

    fn count(&self) -> usize {
        self.count
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.vectors.clear();
        self.quantized.clear();
        self.id_to_idx.clear();
        self.entry_point = None;
        self.max_level = 0;
        self.count = 0;
        self.quant_samples = 0;
        self.quant_mse_sum = 0.0;
        self.quant_mae_sum = 0.0;
        self.quant_max_abs_error = 0.0;
        self.quant_sqnr_sum = 0.0;
    }

    fn save(&self, path: &Path) -> Result<()> {
        let snapshot = GraphSnapshot {
            nodes: self.nodes.clone(),
            vectors: self.vectors.clone(),
            quantized: self.quantized.clone(),
            entry_point: self.entry_point,
            max_level: self.max_level,
            id_to_idx: self.id_to_idx.clone(),
        };
        let envelope = SnapshotEnvelope::new(self.config.clone(), snapshot);
        let bytes = bincode::serialize(&envelope)
            .map_err(|e| Error::Persistence(format!("encode graph-hnsw snapshot: {e}")))?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    fn load(&mut self, path: &Path) -> Result<bool> {
        if !path.exists() {
            return Ok(false);
        }
        let bytes = std::fs::read(path)?;
        let envelope: SnapshotEnvelope<GraphSnapshot> = bincode::deserialize(&bytes)
            .map_err(|e| Error::Persistence(format!("decode graph-hnsw snapshot: {e}")))?;
        envelope.check_version()?;
        if envelope.config.dimension != self.config.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.config.dimension,
                actual: envelope.config.dimension,
            });
        }
        self.config = envelope.config;
        self.nodes = envelope.payload.nodes;
        self.vectors = envelope.payload.vectors;
        self.quantized = envelope.payload.quantized;
        self.entry_point = envelope.payload.entry_point;
        self.max_level = envelope.payload.max_level;
        self.id_to_idx = envelope.payload.id_to_idx;
        self.count = self.id_to_idx.len();
        Ok(true)
    }

    fn active_backend(&self) -> ActiveBackend {
        ActiveBackend::GraphHnsw
    }

    fn config(&self) -> &VectorIndexConfig {
        &self.config
    }

    fn quantization_metrics(&self) -> Option<QuantizationQuality> {
        if self.quant_samples == 0 {
            return None;
        }
        let n = self.quant_samples as f32;
        Some(QuantizationQuality {
            mse: self.quant_mse_sum / n,
            mae: self.quant_mae_sum / n,
            max_abs_error: self.quant_max_abs_error,
            sqnr_db: self.quant_sqnr_sum / n,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> VectorIndexConfig {
        VectorIndexConfig::new(4, Metric::Cosine)
    }

    #[test]
    fn insert_and_retrieve_scenario_matches_spec() {
        let mut idx = GraphHnsw::new(cfg());
        idx.insert("a".into(), vec![1.0, 0.0, 0.0, 0.0]).unwrap();
        idx.insert("b".into(), vec![0.0, 1.0, 0.0, 0.0]).unwrap();
        let c = std::f32::consts::FRAC_1_SQRT_2;
        idx.insert("c".into(), vec![c, c, 0.0, 0.0]).unwrap();

        let results = idx
            .search_with_vectors(&[1.0, 0.0, 0.0, 0.0], 2, false)
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "a");
        assert!((results[0].similarity - 1.0).abs() < 1e-3);
        assert_eq!(results[1].id, "c");
        assert!((results[1].similarity - 0.7071).abs() < 1e-2);
    }

    #[test]
    fn search_is_sorted_ascending_by_distance() {
        let mut idx = GraphHnsw::new(VectorIndexConfig::new(4, Metric::Euclidean));
        for i in 0..20 {
            let v = vec![i as f32, 0.0, 0.0, 0.0];
            idx.insert(format!("v{i}"), v).unwrap();
        }
        let results = idx.search(&[0.0, 0.0, 0.0, 0.0], 5).unwrap();
        for w in results.windows(2) {
            assert!(w[0].distance <= w[1].distance);
        }
    }

    #[test]
    fn remove_then_has_returns_false() {
        let mut idx = GraphHnsw::new(cfg());
        idx.insert("a".into(), vec![1.0, 0.0, 0.0, 0.0]).unwrap();
        assert!(idx.remove("a"));
        assert!(!idx.has("a"));
        assert_eq!(idx.count(), 0);
    }

    #[test]
    fn duplicate_insert_replaces() {
        let mut idx = GraphHnsw::new(cfg());
        idx.insert("a".into(), vec![1.0, 0.0, 0.0, 0.0]).unwrap();
        idx.insert("a".into(), vec![0.0, 1.0, 0.0, 0.0]).unwrap();
        assert_eq!(idx.count(), 1);
        let v = idx.get("a").unwrap();
        assert!((v[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn save_and_load_round_trips_search_results() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.bin");
        let mut idx = GraphHnsw::new(VectorIndexConfig::new(4, Metric::Euclidean));
        for i in 0..10 {
            idx.insert(format!("v{i}"), vec![i as f32, 0.0, 0.0, 0.0])
                .unwrap();
        }
        idx.save(&path).unwrap();

        let mut loaded = GraphHnsw::new(VectorIndexConfig::new(4, Metric::Euclidean));
        assert!(loaded.load(&path).unwrap());

        let original = idx.search(&[3.0, 0.0, 0.0, 0.0], 3).unwrap();
        let reloaded = loaded.search(&[3.0, 0.0, 0.0, 0.0], 3).unwrap();
        assert_eq!(
            original.iter().map(|r| &r.id).collect::<Vec<_>>(),
            reloaded.iter().map(|r| &r.id).collect::<Vec<_>>()
        );
    }

    #[test]
    fn quantization_metrics_absent_until_quantized_insert() {
        let idx = GraphHnsw::new(cfg());
        assert!(idx.quantization_metrics().is_none());
    }

    #[test]
    fn quantization_metrics_present_when_quantizing() {
        let mut config = cfg();
        config.quantize = true;
        let mut idx = GraphHnsw::new(config);
        idx.insert("a".into(), vec![1.0, 0.0, 0.0, 0.0]).unwrap();
        idx.insert("b".into(), vec![0.0, 1.0, 0.0, 0.0]).unwrap();
        let quality = idx.quantization_metrics().unwrap();
        assert!(quality.mse >= 0.0);
    }

    #[test]
    fn load_missing_file_returns_false() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.bin");
        let mut idx = GraphHnsw::new(cfg());
        assert!(!idx.load(&path).unwrap());
    }
}
