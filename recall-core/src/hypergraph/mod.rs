//! Hypergraph Store: nodes, binary edges, and n-ary hyperedges over a
//! designated root namespace.
//!
//! Writes enforce the non-orphan invariant and referential integrity up
//! front; deeper consistency questions (dangling references left behind by a
//! later removal, expired temporal hyperedges) are answered on demand by
//! [`HypergraphStore::integrity_report`] rather than blocking writes.

pub mod lock;
pub mod types;

#[cfg(test)]
mod tests;

use crate::constants::MIN_HYPEREDGE_ARITY;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use lock::FileLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::time::Duration;
use types::{Edge, EdgeId, Granularity, Hyperedge, HyperedgeId, IntegrityReport, Node, NodeId};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
struct GraphSnapshot {
    format_version: u32,
    saved_at: DateTime<Utc>,
    nodes: HashMap<NodeId, Node>,
    edges: HashMap<EdgeId, Edge>,
    hyperedges: HashMap<HyperedgeId, Hyperedge>,
    root: Option<NodeId>,
    root_namespaces: Vec<String>,
}

/// In-memory hypergraph with optional JSON snapshot persistence.
pub struct HypergraphStore {
    nodes: HashMap<NodeId, Node>,
    edges: HashMap<EdgeId, Edge>,
    hyperedges: HashMap<HyperedgeId, Hyperedge>,
    root: Option<NodeId>,
    root_namespaces: HashSet<String>,
    lock_timeout: Duration,
}

impl Default for HypergraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HypergraphStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            hyperedges: HashMap::new(),
            root: None,
            root_namespaces: HashSet::new(),
            lock_timeout: Duration::from_secs(5),
        }
    }

    /// Register a namespace whose nodes are exempt from the link-to-existing
    /// requirement.
    pub fn add_root_namespace(&mut self, namespace: impl Into<String>) {
        self.root_namespaces.insert(namespace.into());
    }

    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Create a node. The first node ever created seeds the graph root. Any
    /// later node must either live in a recognized root namespace or be
    /// linked (via `link`) to an existing node in the same call, otherwise
    /// the call fails with [`Error::OrphanNode`].
    pub fn create_node(
        &mut self,
        key: impl Into<String>,
        namespace: Option<String>,
        vector_id: Option<String>,
        metadata: Value,
        link: Option<(NodeId, String)>,
    ) -> Result<NodeId> {
        let is_root_namespace = namespace
            .as_deref()
            .is_some_and(|ns| self.root_namespaces.contains(ns));

        if !self.nodes.is_empty() && !is_root_namespace {
            match &link {
                Some((target, _)) if self.nodes.contains_key(target) => {}
                Some((target, _)) => return Err(Error::NotFound(target.to_string())),
                None => return Err(Error::OrphanNode),
            }
        }

        let now = Utc::now();
        let id = Uuid::new_v4();
        self.nodes.insert(
            id,
            Node {
                id,
                key: key.into(),
                namespace,
                vector_id,
                metadata,
                created_at: now,
                updated_at: now,
            },
        );

        if self.root.is_none() {
            self.root = Some(id);
        } else if let Some((target, edge_type)) = link {
            self.insert_edge_unchecked(id, target, edge_type, None, Value::Null);
        }

        Ok(id)
    }

    fn insert_edge_unchecked(
        &mut self,
        source: NodeId,
        target: NodeId,
        edge_type: String,
        weight: Option<f32>,
        metadata: Value,
    ) -> EdgeId {
        let id = Uuid::new_v4();
        self.edges.insert(
            id,
            Edge {
                id,
                source,
                target,
                edge_type,
                weight,
                metadata,
            },
        );
        id
    }

    /// Create a binary edge; both endpoints must already exist.
    pub fn create_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        edge_type: impl Into<String>,
        weight: Option<f32>,
        metadata: Value,
    ) -> Result<EdgeId> {
        if !self.nodes.contains_key(&source) {
            return Err(Error::NotFound(source.to_string()));
        }
        if !self.nodes.contains_key(&target) {
            return Err(Error::NotFound(target.to_string()));
        }
        Ok(self.insert_edge_unchecked(source, target, edge_type.into(), weight, metadata))
    }

    fn create_hyperedge_inner(
        &mut self,
        nodes: Vec<NodeId>,
        edge_type: String,
        metadata: Value,
        expires_at: Option<DateTime<Utc>>,
        granularity: Option<Granularity>,
    ) -> Result<HyperedgeId> {
        let mut distinct: Vec<NodeId> = Vec::new();
        for n in nodes {
            if !distinct.contains(&n) {
                distinct.push(n);
            }
        }
        if distinct.len() < MIN_HYPEREDGE_ARITY {
            return Err(Error::HyperedgeArity {
                min: MIN_HYPEREDGE_ARITY,
                actual: distinct.len(),
            });
        }
        for n in &distinct {
            if !self.nodes.contains_key(n) {
                return Err(Error::NotFound(n.to_string()));
            }
        }
        let id = Uuid::new_v4();
        self.hyperedges.insert(
            id,
            Hyperedge {
                id,
                nodes: distinct,
                edge_type,
                metadata,
                created_at: Utc::now(),
                expires_at,
                granularity,
            },
        );
        Ok(id)
    }

    /// Create a plain (non-expiring) hyperedge over `nodes` (`>= 3` distinct).
    pub fn create_hyperedge(
        &mut self,
        nodes: Vec<NodeId>,
        edge_type: impl Into<String>,
        metadata: Value,
    ) -> Result<HyperedgeId> {
        self.create_hyperedge_inner(nodes, edge_type.into(), metadata, None, None)
    }

    /// Create a temporal hyperedge carrying an `expiresAt`; expiry is
    /// reported, never auto-deleted.
    pub fn create_temporal_hyperedge(
        &mut self,
        nodes: Vec<NodeId>,
        edge_type: impl Into<String>,
        metadata: Value,
        expires_at: DateTime<Utc>,
        granularity: Granularity,
    ) -> Result<HyperedgeId> {
        self.create_hyperedge_inner(
            nodes,
            edge_type.into(),
            metadata,
            Some(expires_at),
            Some(granularity),
        )
    }

    #[must_use]
    pub fn get_node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Every node currently stored, in arbitrary order.
    pub fn all_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    #[must_use]
    pub fn get_edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    #[must_use]
    pub fn get_hyperedge(&self, id: &HyperedgeId) -> Option<&Hyperedge> {
        self.hyperedges.get(id)
    }

    #[must_use]
    pub fn nodes_by_namespace(&self, namespace: &str) -> Vec<&Node> {
        self.nodes
            .values()
            .filter(|n| n.namespace.as_deref() == Some(namespace))
            .collect()
    }

    /// Every edge/hyperedge that references `node_id`, optionally filtered by type.
    #[must_use]
    pub fn query_edges(&self, node_id: Option<NodeId>, edge_type: Option<&str>) -> Vec<&Edge> {
        self.edges
            .values()
            .filter(|e| node_id.is_none_or(|n| e.source == n || e.target == n))
            .filter(|e| edge_type.is_none_or(|t| e.edge_type == t))
            .collect()
    }

    #[must_use]
    pub fn hyperedges_for_node(&self, node_id: NodeId) -> Vec<&Hyperedge> {
        self.hyperedges
            .values()
            .filter(|h| h.nodes.contains(&node_id))
            .collect()
    }

    fn neighbors(&self, node_id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        for e in self.edges.values() {
            if e.source == node_id {
                out.push(e.target);
            } else if e.target == node_id {
                out.push(e.source);
            }
        }
        for h in self.hyperedges.values() {
            if h.nodes.contains(&node_id) {
                out.extend(h.nodes.iter().copied().filter(|&n| n != node_id));
            }
        }
        out
    }

    /// Breadth-first traversal from `start`, bounded by `max_depth` hops,
    /// treating hyperedges as cliques over their member nodes.
    #[must_use]
    pub fn traverse(&self, start: NodeId, max_depth: usize) -> Vec<NodeId> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back((start, 0usize));
        visited.insert(start);

        while let Some((node, depth)) = queue.pop_front() {
            order.push(node);
            if depth >= max_depth {
                continue;
            }
            for next in self.neighbors(node) {
                if visited.insert(next) {
                    queue.push_back((next, depth + 1));
                }
            }
        }
        order
    }

    /// Remove a node without cascading. May introduce dangling references or
    /// orphans, surfaced later by [`Self::integrity_report`] rather than
    /// prevented here.
    pub fn remove_node(&mut self, id: &NodeId) -> bool {
        self.nodes.remove(id).is_some()
    }

    pub fn remove_edge(&mut self, id: &EdgeId) -> bool {
        self.edges.remove(id).is_some()
    }

    pub fn remove_hyperedge(&mut self, id: &HyperedgeId) -> bool {
        self.hyperedges.remove(id).is_some()
    }

    /// Nodes reachable from the root (or from a root-namespace node) via any
    /// edge or hyperedge.
    fn reachable_from_roots(&self) -> HashSet<NodeId> {
        let mut seeds: Vec<NodeId> = self.root.into_iter().collect();
        seeds.extend(
            self.nodes
                .values()
                .filter(|n| {
                    n.namespace
                        .as_deref()
                        .is_some_and(|ns| self.root_namespaces.contains(ns))
                })
                .map(|n| n.id),
        );

        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        for s in seeds {
            if visited.insert(s) {
                queue.push_back(s);
            }
        }
        while let Some(node) = queue.pop_front() {
            for next in self.neighbors(node) {
                if self.nodes.contains_key(&next) && visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        visited
    }

    /// On-demand consistency scan; never blocks writes.
    #[must_use]
    pub fn integrity_report(&self, now: DateTime<Utc>) -> IntegrityReport {
        let reachable = self.reachable_from_roots();
        let orphan_nodes: Vec<NodeId> = self
            .nodes
            .keys()
            .filter(|id| !reachable.contains(*id))
            .copied()
            .collect();

        let dangling_edges: Vec<EdgeId> = self
            .edges
            .values()
            .filter(|e| !self.nodes.contains_key(&e.source) || !self.nodes.contains_key(&e.target))
            .map(|e| e.id)
            .collect();

        let dangling_hyperedges: Vec<HyperedgeId> = self
            .hyperedges
            .values()
            .filter(|h| h.nodes.iter().any(|n| !self.nodes.contains_key(n)))
            .map(|h| h.id)
            .collect();

        let expired_temporal_hyperedges: Vec<HyperedgeId> = self
            .hyperedges
            .values()
            .filter(|h| h.is_expired(now))
            .map(|h| h.id)
            .collect();

        IntegrityReport {
            orphan_nodes,
            dangling_edges,
            dangling_hyperedges,
            expired_temporal_hyperedges,
            total_nodes: self.nodes.len(),
            total_edges: self.edges.len(),
            total_hyperedges: self.hyperedges.len(),
        }
    }

    /// Atomically persist a snapshot under a cross-process advisory lock
    ///: lock, write to a sibling temp file, rename into place.
    pub fn save(&self, path: &Path) -> Result<()> {
        let _lock = FileLock::acquire(path, self.lock_timeout)?;
        let snapshot = GraphSnapshot {
            format_version: crate::constants::SNAPSHOT_FORMAT_VERSION,
            saved_at: Utc::now(),
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            hyperedges: self.hyperedges.clone(),
            root: self.root,
            root_namespaces: self.root_namespaces.iter().cloned().collect(),
        };
        let tmp_path = path.with_extension("tmp");
        std::fs::write(&tmp_path, serde_json::to_vec_pretty(&snapshot)?)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Load a snapshot under the same advisory lock used by [`Self::save`].
    pub fn load(path: &Path, lock_timeout: Duration) -> Result<Self> {
        let _lock = FileLock::acquire(path, lock_timeout)?;
        let bytes = std::fs::read(path)?;
        let snapshot: GraphSnapshot = serde_json::from_slice(&bytes)?;
        if snapshot.format_version != crate::constants::SNAPSHOT_FORMAT_VERSION {
            return Err(Error::SnapshotVersion {
                expected: crate::constants::SNAPSHOT_FORMAT_VERSION,
                found: snapshot.format_version,
            });
        }
        Ok(Self {
            nodes: snapshot.nodes,
            edges: snapshot.edges,
            hyperedges: snapshot.hyperedges,
            root: snapshot.root,
            root_namespaces: snapshot.root_namespaces.into_iter().collect(),
            lock_timeout,
        })
    }
}
