//! `search` service: Quad-Fusion Search wired to the four stores owned by
//! [`recall_storage::RecallStore`].

use crate::protocol::{JsonRpcError, INVALID_PARAMS};
use crate::registry::ServiceHandler;
use async_trait::async_trait;
use parking_lot::RwLock;
use recall_core::fusion::types::{FusedCandidate, FusionQuery, SourceWeights};
use recall_core::fusion::{FusionSource, QuadFusionSearch};
use recall_storage::RecallStore;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

struct VectorSource {
    store: Arc<RwLock<RecallStore>>,
}

#[async_trait]
impl FusionSource for VectorSource {
    fn name(&self) -> &'static str {
        "vector"
    }

    async fn search(&self, query: &FusionQuery) -> Result<Vec<FusedCandidate>, String> {
        let Some(embedding) = &query.embedding else {
            return Ok(Vec::new());
        };
        let k = query.top_k.max(1);
        let store = self.store.read();
        let results = store
            .vectors
            .search_with_vectors(embedding, k, false)
            .map_err(|e| e.to_string())?;
        Ok(results
            .into_iter()
            .map(|r| FusedCandidate {
                content_id: r.id,
                raw_score: r.similarity,
                payload: json!({ "source": "vector" }),
            })
            .collect())
    }
}

struct EpisodicSource {
    store: Arc<RwLock<RecallStore>>,
}

#[async_trait]
impl FusionSource for EpisodicSource {
    fn name(&self) -> &'static str {
        "episodic"
    }

    async fn search(&self, query: &FusionQuery) -> Result<Vec<FusedCandidate>, String> {
        let Some(embedding) = &query.embedding else {
            return Ok(Vec::new());
        };
        let k = query.top_k.max(1);
        let task_ids = query.task_id.clone().map(|t| vec![t]);
        let store = self.store.read();
        let results = store
            .episodes
            .search_by_similarity(embedding, k, None, task_ids.as_deref())
            .map_err(|e| e.to_string())?;
        Ok(results
            .into_iter()
            .map(|(episode, similarity)| FusedCandidate {
                content_id: episode.id.to_string(),
                raw_score: similarity,
                payload: json!({ "source": "episodic", "taskId": episode.task_id }),
            })
            .collect())
    }
}

struct GraphSource {
    store: Arc<RwLock<RecallStore>>,
}

#[async_trait]
impl FusionSource for GraphSource {
    fn name(&self) -> &'static str {
        "graph"
    }

    async fn search(&self, query: &FusionQuery) -> Result<Vec<FusedCandidate>, String> {
        let Some(text) = &query.text else {
            return Ok(Vec::new());
        };
        let needle = text.to_lowercase();
        let store = self.store.read();
        let mut candidates: Vec<FusedCandidate> = store
            .graph
            .all_nodes()
            .filter(|node| node.key.to_lowercase().contains(&needle))
            .map(|node| FusedCandidate {
                content_id: node.id.to_string(),
                raw_score: 1.0,
                payload: json!({ "source": "graph", "key": node.key }),
            })
            .collect();
        candidates.truncate(query.top_k.max(1));
        Ok(candidates)
    }
}

struct PatternSource {
    store: Arc<RwLock<RecallStore>>,
}

#[async_trait]
impl FusionSource for PatternSource {
    fn name(&self) -> &'static str {
        "pattern"
    }

    async fn search(&self, query: &FusionQuery) -> Result<Vec<FusedCandidate>, String> {
        let Some(task_type) = &query.task_id else {
            return Ok(Vec::new());
        };
        let store = self.store.read();
        let mut patterns = store.patterns.find_by_task_type(task_type);
        patterns.truncate(query.top_k.max(1));
        Ok(patterns
            .into_iter()
            .map(|p| FusedCandidate {
                content_id: p.id.to_string(),
                raw_score: p.weight,
                payload: json!({ "source": "pattern", "name": p.name }),
            })
            .collect())
    }
}

/// Holds the four adapters plus caller-tunable weights; builds a fresh
/// [`QuadFusionSearch`] per query so `updateWeights` takes effect immediately
/// without needing to mutate a long-lived orchestrator in place.
pub struct SearchService {
    store: Arc<RwLock<RecallStore>>,
    weights: RwLock<SourceWeights>,
}

impl SearchService {
    #[must_use]
    pub fn new(store: Arc<RwLock<RecallStore>>) -> Self {
        Self {
            store,
            weights: RwLock::new(SourceWeights::default()),
        }
    }

    fn build(&self) -> QuadFusionSearch {
        let sources: Vec<Box<dyn FusionSource>> = vec![
            Box::new(VectorSource {
                store: self.store.clone(),
            }),
            Box::new(GraphSource {
                store: self.store.clone(),
            }),
            Box::new(PatternSource {
                store: self.store.clone(),
            }),
            Box::new(EpisodicSource {
                store: self.store.clone(),
            }),
        ];
        QuadFusionSearch::new(sources).with_weights(*self.weights.read())
    }
}

fn bad_params(e: impl std::fmt::Display) -> JsonRpcError {
    JsonRpcError::new(INVALID_PARAMS, format!("invalid params: {e}"))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryParams {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    embedding: Option<Vec<f32>>,
    #[serde(default)]
    task_id: Option<String>,
    #[serde(default = "default_top_k")]
    top_k: usize,
}

fn default_top_k() -> usize {
    10
}

#[async_trait]
impl ServiceHandler for SearchService {
    async fn handle(&self, method: &str, params: Value) -> Result<Value, JsonRpcError> {
        match method {
            "query" => {
                let p: QueryParams = serde_json::from_value(params).map_err(bad_params)?;
                let query = FusionQuery {
                    text: p.text,
                    embedding: p.embedding,
                    task_id: p.task_id,
                    top_k: p.top_k,
                };
                let result = self.build().search(query).await;
                Ok(json!(result))
            }
            "updateWeights" => {
                let weights: SourceWeights = serde_json::from_value(params).map_err(bad_params)?;
                *self.weights.write() = weights;
                Ok(json!({ "updated": true }))
            }
            other => Err(JsonRpcError::method_not_found("search", other)),
        }
    }
}
