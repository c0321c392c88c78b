//! Vector Index: approximate nearest-neighbor search over `ℝ^d`.
//!
//! Three backends share one capability set (`VectorIndex`): [`graph_hnsw::GraphHnsw`]
//! (classical Malkov-Yashunin HNSW), [`leann::Leann`] (hub-cached, pruned variant),
//! and [`brute_force::BruteForce`] (the `auto` fallback when no graph backend can be
//! linked). Callers open an index through [`open`], which resolves
//! [`crate::types::BackendPreference`] to a concrete, observable
//! [`crate::types::ActiveBackend`].

pub mod brute_force;
pub mod graph_hnsw;
pub mod leann;

use crate::error::Result;
use crate::quantization::QuantizationQuality;
use crate::types::{ActiveBackend, BackendPreference, SearchResult, VectorId, VectorIndexConfig};
use leann::CacheMetrics;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The common capability set every vector-index backend implements.
pub trait VectorIndex: Send + Sync {
    /// Insert or replace the vector stored under `id`.
    fn insert(&mut self, id: VectorId, v: Vec<f32>) -> Result<()>;

    /// Nearest `k` neighbors of `query`, sorted ascending by distance.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<crate::types::ScoredId>>;

    /// Like [`search`](Self::search), but converts distances to similarities and
    /// optionally embeds the stored vector.
    fn search_with_vectors(
        &self,
        query: &[f32],
        k: usize,
        include_vectors: bool,
    ) -> Result<Vec<SearchResult>>;

    /// Fetch the stored vector for `id`, if present.
    fn get(&self, id: &str) -> Option<Vec<f32>>;

    /// Whether `id` is present.
    fn has(&self, id: &str) -> bool;

    /// Remove `id`; returns whether it was present.
    fn remove(&mut self, id: &str) -> bool;

    /// Number of stored vectors.
    fn count(&self) -> usize;

    /// Remove every stored vector.
    fn clear(&mut self);

    /// Persist a self-contained snapshot to `path`.
    fn save(&self, path: &Path) -> Result<()>;

    /// Load a snapshot from `path`, replacing in-memory state. Returns `false`
    /// if the file does not exist.
    fn load(&mut self, path: &Path) -> Result<bool>;

    /// Which backend this instance actually runs.
    fn active_backend(&self) -> ActiveBackend;

    /// Index configuration this instance was opened with.
    fn config(&self) -> &VectorIndexConfig;

    /// Running quantization quality metrics, for backends that quantize.
    /// `None` when the backend doesn't quantize or hasn't quantized anything yet.
    fn quantization_metrics(&self) -> Option<QuantizationQuality> {
        None
    }

    /// Hub-cache hit/miss and pruning metrics, for the LEANN backend only.
    fn cache_metrics(&self) -> Option<CacheMetrics> {
        None
    }
}

/// Shared on-disk snapshot envelope: metric,
/// dimension, and a backend-specific payload blob.
#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotEnvelope<T> {
    pub format_version: u32,
    pub config: VectorIndexConfig,
    pub payload: T,
}

impl<T> SnapshotEnvelope<T> {
    #[must_use]
    pub fn new(config: VectorIndexConfig, payload: T) -> Self {
        Self {
            format_version: crate::constants::SNAPSHOT_FORMAT_VERSION,
            config,
            payload,
        }
    }

    pub fn check_version(&self) -> Result<()> {
        if self.format_version != crate::constants::SNAPSHOT_FORMAT_VERSION {
            return Err(crate::error::Error::SnapshotVersion {
                expected: crate::constants::SNAPSHOT_FORMAT_VERSION,
                found: self.format_version,
            });
        }
        Ok(())
    }
}

/// Open a vector index, resolving `config.backend` to a concrete implementation.
/// `auto` prefers the native graph backend; both graph and LEANN are
/// always linkable in this crate, so `auto` never falls through to brute force
/// except when explicitly requested for testing via [`BackendPreference`] (the
/// brute-force fallback remains available through [`brute_force::BruteForce`]
/// directly for callers that want it, e.g. the LEANN small-`n` fallback).
#[must_use]
pub fn open(config: VectorIndexConfig) -> Box<dyn VectorIndex> {
    match config.backend {
        BackendPreference::Leann => Box::new(leann::Leann::new(config)),
        BackendPreference::Graph | BackendPreference::Auto => {
            Box::new(graph_hnsw::GraphHnsw::new(config))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Metric;

    #[test]
    fn auto_resolves_to_graph_backend() {
        let cfg = VectorIndexConfig::new(4, Metric::Cosine);
        let idx = open(cfg);
        assert_eq!(idx.active_backend(), ActiveBackend::GraphHnsw);
    }

    #[test]
    fn leann_preference_resolves_to_leann_backend() {
        let mut cfg = VectorIndexConfig::new(4, Metric::Cosine);
        cfg.backend = BackendPreference::Leann;
        let idx = open(cfg);
        assert_eq!(idx.active_backend(), ActiveBackend::Leann);
    }
}
