//! Hypergraph data model: nodes, binary edges, and n-ary hyperedges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub type NodeId = Uuid;
pub type EdgeId = Uuid;
pub type HyperedgeId = Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub key: String,
    pub namespace: Option<String>,
    pub vector_id: Option<String>,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub edge_type: String,
    pub weight: Option<f32>,
    pub metadata: Value,
}

/// Recurrence granularity for a [`TemporalHyperedge`]'s expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Granularity {
    Hourly,
    Daily,
    Monthly,
}

/// A named n-ary relation (`nodes.len() >= 3`), optionally time-bounded.
/// An ordinary hyperedge has `expires_at: None`; a temporal hyperedge is the
/// same shape with `expires_at`/`granularity` populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hyperedge {
    pub id: HyperedgeId,
    pub nodes: Vec<NodeId>,
    pub edge_type: String,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub granularity: Option<Granularity>,
}

impl Hyperedge {
    #[must_use]
    pub fn is_temporal(&self) -> bool {
        self.expires_at.is_some()
    }

    /// Expired temporal hyperedges are not auto-deleted; callers
    /// filter by this at query time.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| now > exp)
    }
}

/// Output of an on-demand consistency scan; never blocks writes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityReport {
    pub orphan_nodes: Vec<NodeId>,
    pub dangling_edges: Vec<EdgeId>,
    pub dangling_hyperedges: Vec<HyperedgeId>,
    pub expired_temporal_hyperedges: Vec<HyperedgeId>,
    pub total_nodes: usize,
    pub total_edges: usize,
    pub total_hyperedges: usize,
}
