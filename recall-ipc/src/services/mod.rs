//! Core service adapters registered on every daemon: `episode`, `hyperedge`,
//! `vector`, `graph`, `search`, and the always-present `health`.

pub mod episode;
pub mod graph;
pub mod health;
pub mod hyperedge;
pub mod search;
pub mod vector;

use crate::lifecycle::ServerState;
use crate::registry::ServiceRegistry;
use parking_lot::RwLock;
use recall_storage::RecallStore;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

/// Build a registry with every core service wired to the shared store.
#[must_use]
pub fn build_registry(
    store: Arc<RwLock<RecallStore>>,
    state: Arc<RwLock<ServerState>>,
    connected_clients: Arc<RwLock<usize>>,
    request_count: Arc<AtomicU64>,
) -> ServiceRegistry {
    let mut registry = ServiceRegistry::new();
    registry.register("episode", Box::new(episode::EpisodeService::new(store.clone())));
    registry.register("hyperedge", Box::new(hyperedge::HyperedgeService::new(store.clone())));
    registry.register("vector", Box::new(vector::VectorService::new(store.clone())));
    registry.register("graph", Box::new(graph::GraphService::new(store.clone())));
    registry.register("search", Box::new(search::SearchService::new(store)));

    let mut service_names = registry.service_names();
    service_names.push("health".to_string());
    service_names.sort();
    registry.register(
        "health",
        Box::new(health::HealthService::new(
            state,
            service_names,
            connected_clients,
            request_count,
        )),
    );
    registry
}
