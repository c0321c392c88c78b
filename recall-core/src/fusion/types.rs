//! Quad-Fusion Search types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Input shared by all four source adapters; each adapter reads only the
/// fields relevant to its own retrieval mode.
#[derive(Debug, Clone, Default)]
pub struct FusionQuery {
    pub text: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub task_id: Option<String>,
    pub top_k: usize,
}

/// One candidate returned by a source adapter, before cross-source fusion.
#[derive(Debug, Clone)]
pub struct FusedCandidate {
    pub content_id: String,
    pub raw_score: f32,
    pub payload: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Success,
    Timeout,
    Error,
}

/// What a single source adapter produced for one query.
#[derive(Debug, Clone)]
pub struct SourceOutcome {
    pub status: SourceStatus,
    pub results: Vec<FusedCandidate>,
    pub duration_ms: u64,
    pub error: Option<String>,
}

impl SourceOutcome {
    #[must_use]
    pub fn success(results: Vec<FusedCandidate>, duration_ms: u64) -> Self {
        Self {
            status: SourceStatus::Success,
            results,
            duration_ms,
            error: None,
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            status: SourceStatus::Error,
            results: Vec::new(),
            duration_ms,
            error: Some(message.into()),
        }
    }

    #[must_use]
    pub fn timeout(duration_ms: u64) -> Self {
        Self {
            status: SourceStatus::Timeout,
            results: Vec::new(),
            duration_ms,
            error: Some("source timed out".into()),
        }
    }
}

/// Per-source scaling applied before fusion; each weight
/// is expected in `[0,1]` but is not hard-clamped — an out-of-range weight is
/// a caller configuration error, not a runtime validation concern.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SourceWeights {
    pub vector: f32,
    pub graph: f32,
    pub pattern: f32,
    pub episodic: f32,
}

impl Default for SourceWeights {
    fn default() -> Self {
        Self {
            vector: 0.35,
            graph: 0.2,
            pattern: 0.2,
            episodic: 0.25,
        }
    }
}

impl SourceWeights {
    #[must_use]
    pub fn for_source(&self, name: &str) -> f32 {
        match name {
            "vector" => self.vector,
            "graph" => self.graph,
            "pattern" => self.pattern,
            "episodic" => self.episodic,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMetadata {
    pub name: String,
    pub status: SourceStatus,
    pub duration_ms: u64,
    pub result_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusionMetadata {
    pub correlation_id: String,
    pub total_elapsed_ms: u64,
    pub sources: Vec<SourceMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusedResult {
    pub content_id: String,
    pub score: f32,
    pub contributing_sources: Vec<String>,
    pub payload: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuadFusionResult {
    pub metadata: FusionMetadata,
    pub results: Vec<FusedResult>,
}
