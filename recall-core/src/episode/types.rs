//! Episode data model: a task execution with an embedding, metadata, and
//! links to other episodes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub type EpisodeId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
    Partial,
}

/// Episode metadata: a few well-known fields plus arbitrary caller keys,
/// bounded to `MAX_METADATA_BYTES` when serialized.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeMetadata {
    pub agent_type: Option<String>,
    pub task_description: Option<String>,
    pub outcome: Option<Outcome>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EpisodeMetadata {
    pub fn encoded_size(&self) -> Result<usize, serde_json::Error> {
        Ok(serde_json::to_vec(self)?.len())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub id: EpisodeId,
    pub task_id: String,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub embedding: Vec<f32>,
    pub metadata: EpisodeMetadata,
    pub linked_episodes: Vec<EpisodeId>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    Sequence,
    Reference,
    Continuation,
    Causal,
    Temporal,
    Semantic,
    Dependency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeLink {
    pub source: EpisodeId,
    pub target: EpisodeId,
    pub link_type: LinkType,
}

/// Options for [`super::EpisodeStore::create_episode`]; defaults are filled in
/// during creation.
#[derive(Debug, Clone, Default)]
pub struct CreateEpisodeOptions {
    pub task_id: String,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub embedding: Vec<f32>,
    pub metadata: EpisodeMetadata,
    pub initial_links: Vec<(EpisodeId, LinkType)>,
}

/// Allowed fields for [`super::EpisodeStore::update`]. `start_time` is
/// included alongside `end_time`/`embedding`/`linked_episodes`/metadata-merge
/// since changing it re-keys the Time Index (see `DESIGN.md`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EpisodePatch {
    pub start_time: Option<i64>,
    pub end_time: Option<Option<i64>>,
    pub embedding: Option<Vec<f32>>,
    pub linked_episodes: Option<Vec<EpisodeId>>,
    pub metadata_merge: Option<Map<String, Value>>,
}

/// Result of [`super::EpisodeStore::get_episode_context`].
#[derive(Debug, Clone, Default)]
pub struct EpisodeContext {
    pub direct: Vec<Episode>,
    pub temporal: Vec<Episode>,
    pub semantic: Vec<Episode>,
}
