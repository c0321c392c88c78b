//! Brute-force vector index: the `auto`-selection fallback when no graph backend
//! can be linked. Trades O(n) search for zero index-maintenance cost
//! and exact recall; also used internally by [`super::leann::Leann`] for small `n`.

use super::{SnapshotEnvelope, VectorIndex};
use crate::error::{Error, Result};
use crate::types::{
    validate_vector, ActiveBackend, ScoredId, SearchResult, VectorId, VectorIndexConfig,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
struct BruteForceSnapshot {
    vectors: HashMap<VectorId, Vec<f32>>,
}

/// Linear-scan vector index.
pub struct BruteForce {
    config: VectorIndexConfig,
    vectors: HashMap<VectorId, Vec<f32>>,
}

impl BruteForce {
    #[must_use]
    pub fn new(config: VectorIndexConfig) -> Self {
        Self {
            config,
            vectors: HashMap::new(),
        }
    }
}

impl VectorIndex for BruteForce {
    fn insert(&mut self, id: VectorId, v: Vec<f32>) -> Result<()> {
        validate_vector(&v, self.config.dimension, self.config.metric)?;
        self.vectors.insert(id, v);
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredId>> {
        validate_vector(query, self.config.dimension, self.config.metric)?;
        let mut scored: Vec<ScoredId> = self
            .vectors
            .iter()
            .map(|(id, v)| ScoredId {
                id: id.clone(),
                distance: self.config.metric.distance(query, v),
            })
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
        self.vectors.get(id).cloned()
    }

    fn has(&self, id: &str) -> bool {
        self.vectors.contains_key(id)
    }

    fn remove(&mut self, id: &str) -> bool {
        self.vectors.remove(id).is_some()
    }

    fn count(&self) -> usize {
        self.vectors.len()
    }

    fn clear(&mut self) {
        self.vectors.clear();
    }

    fn save(&self, path: &Path) -> Result<()> {
        let snapshot = BruteForceSnapshot {
            vectors: self.vectors.clone(),
        };
        let envelope = SnapshotEnvelope::new(self.config.clone(), snapshot);
        let json = serde_json::to_vec_pretty(&envelope)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    fn load(&mut self, path: &Path) -> Result<bool> {
        if !path.exists() {
            return Ok(false);
        }
        let bytes = std::fs::read(path)?;
        let envelope: SnapshotEnvelope<BruteForceSnapshot> = serde_json::from_slice(&bytes)?;
        envelope.check_version()?;
        if envelope.config.dimension != self.config.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.config.dimension,
                actual: envelope.config.dimension,
            });
        }
        self.config = envelope.config;
        self.vectors = envelope.payload.vectors;
        Ok(true)
    }

    fn active_backend(&self) -> ActiveBackend {
        ActiveBackend::BruteForce
    }

    fn config(&self) -> &VectorIndexConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Metric;

    #[test]
    fn exact_search_sorted_ascending() {
        let mut idx = BruteForce::new(VectorIndexConfig::new(4, Metric::Euclidean));
        for i in 0..5 {
            idx.insert(format!("v{i}"), vec![i as f32, 0.0, 0.0, 0.0])
                .unwrap();
        }
        let results = idx.search(&[0.0, 0.0, 0.0, 0.0], 3).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].id, "v0");
    }

    #[test]
    fn save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bf.json");
        let mut idx = BruteForce::new(VectorIndexConfig::new(4, Metric::Cosine));
        idx.insert("a".into(), vec![1.0, 0.0, 0.0, 0.0]).unwrap();
        idx.save(&path).unwrap();

        let mut loaded = BruteForce::new(VectorIndexConfig::new(4, Metric::Cosine));
        assert!(loaded.load(&path).unwrap());
        assert!(loaded.has("a"));
    }
}
