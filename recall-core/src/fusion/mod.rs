//! Quad-Fusion Search: four source adapters queried concurrently under a
//! per-source timeout, merged by weighted min-max-normalized score fusion.

pub mod types;

#[cfg(test)]
mod tests;

use crate::constants::{DEFAULT_SOURCE_TIMEOUT_MS, DEFAULT_TOP_K};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use types::{
    FusedCandidate, FusedResult, FusionMetadata, FusionQuery, QuadFusionResult, SourceMetadata,
    SourceOutcome, SourceStatus, SourceWeights,
};
use uuid::Uuid;

/// One of the four retrieval adapters fused by [`QuadFusionSearch`]: vector,
/// graph, pattern, or episodic.
#[async_trait]
pub trait FusionSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn search(&self, query: &FusionQuery) -> Result<Vec<FusedCandidate>, String>;
}

/// Orchestrates the four sources, applying a per-source timeout and never
/// letting a single source's timeout or error fail the whole call.
pub struct QuadFusionSearch {
    sources: Vec<Box<dyn FusionSource>>,
    weights: SourceWeights,
    source_timeout: Duration,
    top_k: usize,
}

impl QuadFusionSearch {
    #[must_use]
    pub fn new(sources: Vec<Box<dyn FusionSource>>) -> Self {
        Self {
            sources,
            weights: SourceWeights::default(),
            source_timeout: Duration::from_millis(DEFAULT_SOURCE_TIMEOUT_MS),
            top_k: DEFAULT_TOP_K,
        }
    }

    #[must_use]
    pub fn with_weights(mut self, weights: SourceWeights) -> Self {
        self.weights = weights;
        self
    }

    #[must_use]
    pub fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    async fn run_source(&self, source: &dyn FusionSource, query: &FusionQuery) -> SourceOutcome {
        let start = Instant::now();
        match tokio::time::timeout(self.source_timeout, source.search(query)).await {
            Ok(Ok(results)) => SourceOutcome::success(results, elapsed_ms(start)),
            Ok(Err(message)) => SourceOutcome::error(message, elapsed_ms(start)),
            Err(_) => SourceOutcome::timeout(elapsed_ms(start)),
        }
    }

    /// Launch all sources concurrently, wait for every one to settle, and
    /// return the fused, sorted, truncated result set.
    pub async fn search(&self, query: FusionQuery) -> QuadFusionResult {
        let correlation_id = Uuid::new_v4().to_string();
        let overall_start = Instant::now();

        let outcomes: Vec<(&'static str, SourceOutcome)> = futures::future::join_all(
            self.sources.iter().map(|source| {
                let query = &query;
                async move { (source.name(), self.run_source(source.as_ref(), query).await) }
            }),
        )
        .await;

        let source_metadata: Vec<SourceMetadata> = outcomes
            .iter()
            .map(|(name, outcome)| SourceMetadata {
                name: (*name).to_string(),
                status: outcome.status,
                duration_ms: outcome.duration_ms,
                result_count: outcome.results.len(),
            })
            .collect();

        let results = self.fuse(&outcomes);

        QuadFusionResult {
            metadata: FusionMetadata {
                correlation_id,
                total_elapsed_ms: elapsed_ms(overall_start),
                sources: source_metadata,
            },
            results,
        }
    }

    fn fuse(&self, outcomes: &[(&'static str, SourceOutcome)]) -> Vec<FusedResult> {
        let mut fused: HashMap<String, (f32, Vec<String>, serde_json::Value)> = HashMap::new();

        for (name, outcome) in outcomes {
            if outcome.status != SourceStatus::Success || outcome.results.is_empty() {
                continue;
            }
            let min = outcome
                .results
                .iter()
                .map(|c| c.raw_score)
                .fold(f32::INFINITY, f32::min);
            let max = outcome
                .results
                .iter()
                .map(|c| c.raw_score)
                .fold(f32::NEG_INFINITY, f32::max);
            let range = max - min;
            let weight = self.weights.for_source(name);

            for candidate in &outcome.results {
                let normalized = if range.abs() < f32::EPSILON {
                    candidate.raw_score.clamp(0.0, 1.0)
                } else {
                    (candidate.raw_score - min) / range
                };
                let entry = fused.entry(candidate.content_id.clone()).or_insert_with(|| {
                    (0.0, Vec::new(), candidate.payload.clone())
                });
                entry.0 += normalized * weight;
                entry.1.push((*name).to_string());
            }
        }

        let mut results: Vec<FusedResult> = fused
            .into_iter()
            .map(|(content_id, (score, contributing_sources, payload))| FusedResult {
                content_id,
                score,
                contributing_sources,
                payload,
            })
            .collect();
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(self.top_k);
        results
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}
