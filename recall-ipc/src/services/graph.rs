//! `graph` service: nodes and binary edges over [`recall_core::hypergraph::HypergraphStore`].

use crate::protocol::{JsonRpcError, INVALID_PARAMS};
use crate::registry::ServiceHandler;
use async_trait::async_trait;
use parking_lot::RwLock;
use recall_core::hypergraph::types::NodeId;
use recall_storage::RecallStore;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct GraphService {
    store: Arc<RwLock<RecallStore>>,
}

impl GraphService {
    #[must_use]
    pub fn new(store: Arc<RwLock<RecallStore>>) -> Self {
        Self { store }
    }
}

fn bad_params(e: impl std::fmt::Display) -> JsonRpcError {
    JsonRpcError::new(INVALID_PARAMS, format!("invalid params: {e}"))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddNodeParams {
    key: String,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    vector_id: Option<String>,
    #[serde(default)]
    metadata: Value,
    #[serde(default)]
    link: Option<(NodeId, String)>,
}

#[derive(Deserialize)]
struct NodeIdParams {
    id: NodeId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddEdgeParams {
    source: NodeId,
    target: NodeId,
    edge_type: String,
    #[serde(default)]
    weight: Option<f32>,
    #[serde(default)]
    metadata: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryEdgesParams {
    #[serde(default)]
    node_id: Option<NodeId>,
    #[serde(default)]
    edge_type: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TraverseParams {
    start: NodeId,
    #[serde(default = "default_depth")]
    max_depth: usize,
}

fn default_depth() -> usize {
    3
}

#[async_trait]
impl ServiceHandler for GraphService {
    async fn handle(&self, method: &str, params: Value) -> Result<Value, JsonRpcError> {
        match method {
            "addNode" => {
                let p: AddNodeParams = serde_json::from_value(params).map_err(bad_params)?;
                let id = self
                    .store
                    .write()
                    .graph
                    .create_node(p.key, p.namespace, p.vector_id, p.metadata, p.link)
                    .map_err(|e| JsonRpcError::from_handler("graph", "addNode", &e))?;
                Ok(json!({ "id": id }))
            }
            "getNode" => {
                let p: NodeIdParams = serde_json::from_value(params).map_err(bad_params)?;
                let node = self.store.read().graph.get_node(&p.id).cloned();
                Ok(json!(node))
            }
            "addEdge" => {
                let p: AddEdgeParams = serde_json::from_value(params).map_err(bad_params)?;
                let id = self
                    .store
                    .write()
                    .graph
                    .create_edge(p.source, p.target, p.edge_type, p.weight, p.metadata)
                    .map_err(|e| JsonRpcError::from_handler("graph", "addEdge", &e))?;
                Ok(json!({ "id": id }))
            }
            "query" => {
                let p: QueryEdgesParams = serde_json::from_value(params).map_err(bad_params)?;
                let edges = self
                    .store
                    .read()
                    .graph
                    .query_edges(p.node_id, p.edge_type.as_deref())
                    .into_iter()
                    .cloned()
                    .collect::<Vec<_>>();
                Ok(json!({ "edges": edges }))
            }
            "traverse" => {
                let p: TraverseParams = serde_json::from_value(params).map_err(bad_params)?;
                let ids = self.store.read().graph.traverse(p.start, p.max_depth);
                Ok(json!({ "nodeIds": ids }))
            }
            other => Err(JsonRpcError::method_not_found("graph", other)),
        }
    }
}
