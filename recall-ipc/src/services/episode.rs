//! `episode` service: thin JSON-RPC adapter over [`recall_core::episode::EpisodeStore`].

use crate::protocol::{JsonRpcError, INVALID_PARAMS};
use crate::registry::ServiceHandler;
use async_trait::async_trait;
use parking_lot::RwLock;
use recall_core::episode::types::{CreateEpisodeOptions, EpisodeMetadata, EpisodePatch, LinkType};
use recall_storage::RecallStore;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

pub struct EpisodeService {
    store: Arc<RwLock<RecallStore>>,
}

impl EpisodeService {
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
    task_id: String,
    #[serde(default)]
    start_time: Option<i64>,
    #[serde(default)]
    end_time: Option<i64>,
    embedding: Vec<f32>,
    #[serde(default)]
    metadata: EpisodeMetadata,
}

#[derive(Deserialize)]
struct IdParams {
    id: Uuid,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryParams {
    start_time: i64,
    end_time: i64,
    #[serde(default)]
    include_ongoing: bool,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinkParams {
    source: Uuid,
    target: Uuid,
    link_type: LinkType,
}

#[derive(Deserialize)]
struct SaveParams {
    path: String,
}

#[async_trait]
impl ServiceHandler for EpisodeService {
    async fn handle(&self, method: &str, params: Value) -> Result<Value, JsonRpcError> {
        match method {
            "create" => {
                let p: CreateParams = serde_json::from_value(params).map_err(bad_params)?;
                let id = self
                    .store
                    .write()
                    .episodes
                    .create_episode(CreateEpisodeOptions {
                        task_id: p.task_id,
                        start_time: p.start_time,
                        end_time: p.end_time,
                        embedding: p.embedding,
                        metadata: p.metadata,
                        initial_links: Vec::new(),
                    })
                    .map_err(|e| JsonRpcError::from_handler("episode", "create", &e))?;
                Ok(json!({ "id": id }))
            }
            "get" => {
                let p: IdParams = serde_json::from_value(params).map_err(bad_params)?;
                let ep = self.store.write().episodes.get_by_id(&p.id);
                Ok(json!(ep))
            }
            "query" => {
                let p: QueryParams = serde_json::from_value(params).map_err(bad_params)?;
                let episodes = self.store.read().episodes.query_by_time_range(
                    p.start_time,
                    p.end_time,
                    p.include_ongoing,
                    p.limit,
                );
                Ok(json!({ "episodes": episodes }))
            }
            "update" => {
                let p: IdParams = serde_json::from_value(params.clone()).map_err(bad_params)?;
                let patch: EpisodePatch = serde_json::from_value(params).map_err(bad_params)?;
                self.store
                    .write()
                    .episodes
                    .update(&p.id, patch)
                    .map_err(|e| JsonRpcError::from_handler("episode", "update", &e))?;
                Ok(json!({ "updated": true }))
            }
            "delete" => {
                let p: IdParams = serde_json::from_value(params).map_err(bad_params)?;
                let deleted = self.store.write().episodes.delete(&p.id);
                Ok(json!({ "deleted": deleted }))
            }
            "link" => {
                let p: LinkParams = serde_json::from_value(params).map_err(bad_params)?;
                self.store
                    .write()
                    .episodes
                    .link_episodes(p.source, p.target, p.link_type)
                    .map_err(|e| JsonRpcError::from_handler("episode", "link", &e))?;
                Ok(json!({ "linked": true }))
            }
            "getLinks" => {
                let p: IdParams = serde_json::from_value(params).map_err(bad_params)?;
                let links = self.store.read().episodes.outgoing_links(&p.id);
                Ok(json!({ "links": links }))
            }
            "stats" => {
                let count = self.store.read().episodes.len();
                Ok(json!({ "count": count }))
            }
            "save" => {
                let p: SaveParams = serde_json::from_value(params).map_err(bad_params)?;
                self.store
                    .read()
                    .episodes
                    .save_rows(std::path::Path::new(&p.path))
                    .map_err(|e| JsonRpcError::from_handler("episode", "save", &e))?;
                Ok(json!({ "saved": true }))
            }
            other => Err(JsonRpcError::method_not_found("episode", other)),
        }
    }
}
