//! Service registry: maps the `service` half of `service.method` to a handler.

use crate::protocol::JsonRpcError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// A registered service handling every method under one `service` name.
#[async_trait]
pub trait ServiceHandler: Send + Sync {
    async fn handle(&self, method: &str, params: Value) -> Result<Value, JsonRpcError>;
}

#[derive(Default)]
pub struct ServiceRegistry {
    services: HashMap<String, Box<dyn ServiceHandler>>,
}

impl ServiceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, handler: Box<dyn ServiceHandler>) {
        self.services.insert(name.into(), handler);
    }

    #[must_use]
    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.services.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn dispatch(&self, service: &str, method: &str, params: Value) -> Result<Value, JsonRpcError> {
        let handler = self
            .services
            .get(service)
            .ok_or_else(|| JsonRpcError::unknown_service(service))?;
        handler.handle(method, params).await
    }
}
