//! `hyperedge` service: n-ary, optionally temporal relations over
//! [`recall_core::hypergraph::HypergraphStore`].

use crate::protocol::{JsonRpcError, INVALID_PARAMS};
use crate::registry::ServiceHandler;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use recall_core::hypergraph::types::{Granularity, HyperedgeId, NodeId};
use recall_storage::RecallStore;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;

pub struct HyperedgeService {
    store: Arc<RwLock<RecallStore>>,
}

impl HyperedgeService {
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
struct CreateParams {
    nodes: Vec<NodeId>,
    edge_type: String,
    #[serde(default)]
    metadata: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTemporalParams {
    nodes: Vec<NodeId>,
    edge_type: String,
    #[serde(default)]
    metadata: Value,
    expires_at: DateTime<Utc>,
    granularity: Granularity,
}

#[derive(Deserialize)]
struct NodeQueryParams {
    #[serde(rename = "nodeId")]
    node_id: NodeId,
}

#[derive(Deserialize)]
struct IdParams {
    id: HyperedgeId,
}

#[async_trait]
impl ServiceHandler for HyperedgeService {
    async fn handle(&self, method: &str, params: Value) -> Result<Value, JsonRpcError> {
        match method {
            "create" => {
                let p: CreateParams = serde_json::from_value(params).map_err(bad_params)?;
                let id = self
                    .store
                    .write()
                    .graph
                    .create_hyperedge(p.nodes, p.edge_type, p.metadata)
                    .map_err(|e| JsonRpcError::from_handler("hyperedge", "create", &e))?;
                Ok(json!({ "id": id }))
            }
            "createTemporal" => {
                let p: CreateTemporalParams =
                    serde_json::from_value(params).map_err(bad_params)?;
                let id = self
                    .store
                    .write()
                    .graph
                    .create_temporal_hyperedge(
                        p.nodes,
                        p.edge_type,
                        p.metadata,
                        p.expires_at,
                        p.granularity,
                    )
                    .map_err(|e| JsonRpcError::from_handler("hyperedge", "createTemporal", &e))?;
                Ok(json!({ "id": id }))
            }
            "query" => {
                let p: NodeQueryParams = serde_json::from_value(params).map_err(bad_params)?;
                let edges = self
                    .store
                    .read()
                    .graph
                    .hyperedges_for_node(p.node_id)
                    .into_iter()
                    .cloned()
                    .collect::<Vec<_>>();
                Ok(json!({ "hyperedges": edges }))
            }
            "expand" => {
                let p: NodeQueryParams = serde_json::from_value(params).map_err(bad_params)?;
                let store = self.store.read();
                let neighbors: HashSet<NodeId> = store
                    .graph
                    .hyperedges_for_node(p.node_id)
                    .into_iter()
                    .flat_map(|h| h.nodes.iter().copied())
                    .filter(|&n| n != p.node_id)
                    .collect();
                Ok(json!({ "nodeIds": neighbors.into_iter().collect::<Vec<_>>() }))
            }
            "get" => {
                let p: IdParams = serde_json::from_value(params).map_err(bad_params)?;
                let h = self.store.read().graph.get_hyperedge(&p.id).cloned();
                Ok(json!(h))
            }
            "stats" => {
                let report = self.store.read().graph.integrity_report(Utc::now());
                Ok(json!({
                    "totalHyperedges": report.total_hyperedges,
                    "expired": report.expired_temporal_hyperedges.len(),
                }))
            }
            other => Err(JsonRpcError::method_not_found("hyperedge", other)),
        }
    }
}
