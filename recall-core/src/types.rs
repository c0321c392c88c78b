//! Shared value types used across the vector index, episode store, and fusion search.

use crate::constants::NORMALIZATION_EPSILON;
use crate::distance::{l2_norm, Metric};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Opaque, non-empty, caller-supplied or engine-generated vector identifier.
pub type VectorId = String;

/// Validate a vector against dimension, finiteness, and (metric-dependent)
/// normalization contracts. Called at every insertion/query boundary.
pub fn validate_vector(v: &[f32], dimension: usize, metric: Metric) -> Result<()> {
    if v.len() != dimension {
        return Err(Error::DimensionMismatch {
            expected: dimension,
            actual: v.len(),
        });
    }
    if v.iter().any(|x| !x.is_finite()) {
        return Err(Error::NotFinite);
    }
    if metric.requires_normalization() {
        let norm = l2_norm(v);
        if (norm - 1.0).abs() > NORMALIZATION_EPSILON {
            return Err(Error::NotNormalized {
                norm,
                tolerance: NORMALIZATION_EPSILON,
            });
        }
    }
    Ok(())
}

/// A single result from a vector index search, in its internal (distance-based)
/// form. Sorted ascending by `distance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredId {
    pub id: VectorId,
    pub distance: f32,
}

/// A single result from a vector index search, converted to the output-boundary
/// similarity representation, with an optional embedded vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: VectorId,
    pub similarity: f32,
    pub vector: Option<Vec<f32>>,
}

/// Backend selection preference for opening a vector index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum BackendPreference {
    #[default]
    Auto,
    Graph,
    Leann,
}

/// Which backend an index actually opened with (observable post-open).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActiveBackend {
    GraphHnsw,
    Leann,
    BruteForce,
}

/// Configuration for opening a vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndexConfig {
    pub dimension: usize,
    pub metric: Metric,
    pub m: usize,
    pub ef_construction: usize,
    pub ef_search: usize,
    pub backend: BackendPreference,
    pub quantize: bool,
}

impl VectorIndexConfig {
    #[must_use]
    pub fn new(dimension: usize, metric: Metric) -> Self {
        Self {
            dimension,
            metric,
            m: crate::constants::DEFAULT_M,
            ef_construction: crate::constants::DEFAULT_EF_CONSTRUCTION,
            ef_search: crate::constants::DEFAULT_EF_SEARCH,
            backend: BackendPreference::default(),
            quantize: false,
        }
    }

    #[must_use]
    pub fn m0(&self) -> usize {
        crate::constants::m0(self.m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_dimension() {
        let v = vec![1.0_f32, 0.0, 0.0];
        assert!(matches!(
            validate_vector(&v, 4, Metric::Euclidean),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn rejects_non_finite() {
        let v = vec![1.0_f32, f32::NAN, 0.0, 0.0];
        assert!(matches!(
            validate_vector(&v, 4, Metric::Euclidean),
            Err(Error::NotFinite)
        ));
    }

    #[test]
    fn rejects_unnormalized_for_cosine() {
        let v = vec![2.0_f32, 0.0, 0.0, 0.0];
        assert!(matches!(
            validate_vector(&v, 4, Metric::Cosine),
            Err(Error::NotNormalized { .. })
        ));
    }

    #[test]
    fn accepts_normalized_for_cosine() {
        let v = vec![1.0_f32, 0.0, 0.0, 0.0];
        assert!(validate_vector(&v, 4, Metric::Cosine).is_ok());
    }

    #[test]
    fn euclidean_does_not_require_normalization() {
        let v = vec![3.0_f32, 4.0, 0.0, 0.0];
        assert!(validate_vector(&v, 4, Metric::Euclidean).is_ok());
    }
}
