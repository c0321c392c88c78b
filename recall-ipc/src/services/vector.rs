//! `vector` service: direct access to the standalone Vector Index
//! (distinct from the one embedded in the Episode Store).

use crate::protocol::{JsonRpcError, INVALID_PARAMS};
use crate::registry::ServiceHandler;
use async_trait::async_trait;
use parking_lot::RwLock;
use recall_storage::RecallStore;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct VectorService {
    store: Arc<RwLock<RecallStore>>,
}

impl VectorService {
    #[must_use]
    pub fn new(store: Arc<RwLock<RecallStore>>) -> Self {
        Self { store }
    }
}

fn bad_params(e: impl std::fmt::Display) -> JsonRpcError {
    JsonRpcError::new(INVALID_PARAMS, format!("invalid params: {e}"))
}

#[derive(Deserialize)]
struct AddParams {
    id: String,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct SearchParams {
    embedding: Vec<f32>,
    k: usize,
    #[serde(default)]
    include_vectors: bool,
}

#[derive(Deserialize)]
struct IdParams {
    id: String,
}

#[async_trait]
impl ServiceHandler for VectorService {
    async fn handle(&self, method: &str, params: Value) -> Result<Value, JsonRpcError> {
        match method {
            "add" => {
                let p: AddParams = serde_json::from_value(params).map_err(bad_params)?;
                self.store
                    .write()
                    .vectors
                    .insert(p.id, p.embedding)
                    .map_err(|e| JsonRpcError::from_handler("vector", "add", &e))?;
                Ok(json!({ "added": true }))
            }
            "search" => {
                let p: SearchParams = serde_json::from_value(params).map_err(bad_params)?;
                let results = self
                    .store
                    .read()
                    .vectors
                    .search_with_vectors(&p.embedding, p.k, p.include_vectors)
                    .map_err(|e| JsonRpcError::from_handler("vector", "search", &e))?;
                Ok(json!({ "results": results }))
            }
            "get" => {
                let p: IdParams = serde_json::from_value(params).map_err(bad_params)?;
                let v = self.store.read().vectors.get(&p.id);
                Ok(json!({ "vector": v }))
            }
            "delete" => {
                let p: IdParams = serde_json::from_value(params).map_err(bad_params)?;
                let removed = self.store.write().vectors.remove(&p.id);
                Ok(json!({ "deleted": removed }))
            }
            "stats" => {
                let store = self.store.read();
                Ok(json!({
                    "count": store.vectors.count(),
                    "backend": store.vectors.active_backend(),
                    "quantization": store.vectors.quantization_metrics(),
                    "cache": store.vectors.cache_metrics(),
                }))
            }
            other => Err(JsonRpcError::method_not_found("vector", other)),
        }
    }
}
