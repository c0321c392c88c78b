//! L0 distance kernels over `ℝ^d`.
//!
//! Every kernel takes two equal-length `f32` slices and returns a non-negative
//! *distance* (lower = closer). The vector index converts distance to a
//! metric-appropriate *similarity* at the output boundary.

use serde::{Deserialize, Serialize};

/// Supported distance metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    Cosine,
    Euclidean,
    Dot,
    Manhattan,
}

impl Metric {
    /// Whether insertion/query requires L2-normalized input.
    #[must_use]
    pub fn requires_normalization(self) -> bool {
        matches!(self, Metric::Cosine | Metric::Dot)
    }

    /// Distance between two vectors of equal length under this metric.
    #[must_use]
    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Metric::Cosine => cosine_distance(a, b),
            Metric::Euclidean => euclidean_distance(a, b),
            Metric::Dot => dot_distance(a, b),
            Metric::Manhattan => manhattan_distance(a, b),
        }
    }

    /// Convert a distance under this metric to a similarity (cosine/dot
    /// deliver `[-1, 1]` for normalized inputs; euclidean/manhattan deliver
    /// `(0, 1]`) using the metric's monotone inverse.
    #[must_use]
    pub fn distance_to_similarity(self, distance: f32) -> f32 {
        match self {
            Metric::Cosine => 1.0 - distance,
            Metric::Dot => -distance,
            Metric::Euclidean | Metric::Manhattan => (-distance).exp(),
        }
    }
}

/// `1 - cosine_similarity(a, b)`, assuming both inputs are (approximately)
/// unit-length, as enforced at insertion/query boundaries.
#[must_use]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    1.0 - dot
}

/// Euclidean (L2) distance.
#[must_use]
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Negative dot product, so that larger dot products (more similar) become
/// smaller distances, keeping the "lower = closer" contract uniform.
#[must_use]
pub fn dot_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    -dot
}

/// Manhattan (L1) distance.
#[must_use]
pub fn manhattan_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
}

/// L2 norm of a vector.
#[must_use]
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_identical_unit_vectors_is_zero() {
        let a = [1.0_f32, 0.0, 0.0, 0.0];
        assert!(cosine_distance(&a, &a).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_matches_spec_scenario_1() {
        let a = [1.0_f32, 0.0, 0.0, 0.0];
        let c = [std::f32::consts::FRAC_1_SQRT_2, std::f32::consts::FRAC_1_SQRT_2, 0.0, 0.0];
        let d = Metric::Cosine.distance(&a, &c);
        let sim = Metric::Cosine.distance_to_similarity(d);
        assert!((sim - 0.7071).abs() < 1e-3);
    }

    #[test]
    fn euclidean_similarity_is_monotone_decreasing() {
        let near = Metric::Euclidean.distance_to_similarity(0.1);
        let far = Metric::Euclidean.distance_to_similarity(2.0);
        assert!(near > far);
    }
}
