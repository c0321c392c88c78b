//! Built-in `health` service: always present regardless of what else is
//! registered.

use crate::lifecycle::ServerState;
use crate::protocol::JsonRpcError;
use crate::registry::ServiceHandler;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub struct HealthService {
    state: Arc<RwLock<ServerState>>,
    service_names: Vec<String>,
    connected_clients: Arc<RwLock<usize>>,
    request_count: Arc<AtomicU64>,
}

impl HealthService {
    #[must_use]
    pub fn new(
        state: Arc<RwLock<ServerState>>,
        service_names: Vec<String>,
        connected_clients: Arc<RwLock<usize>>,
        request_count: Arc<AtomicU64>,
    ) -> Self {
        Self {
            state,
            service_names,
            connected_clients,
            request_count,
        }
    }
}

#[async_trait]
impl ServiceHandler for HealthService {
    async fn handle(&self, method: &str, _params: Value) -> Result<Value, JsonRpcError> {
        match method {
            "status" => Ok(json!({
                "state": *self.state.read(),
                "connectedClients": *self.connected_clients.read(),
                "totalRequests": self.request_count.load(Ordering::Relaxed),
                "services": self.service_names,
            })),
            "ping" => Ok(json!({
                "pong": true,
                "timestamp": Utc::now().timestamp_millis(),
            })),
            other => Err(JsonRpcError::method_not_found("health", other)),
        }
    }
}
