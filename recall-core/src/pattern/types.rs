//! Pattern and feedback data model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type PatternId = Uuid;
pub type FeedbackId = Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pattern {
    pub id: PatternId,
    pub name: String,
    pub context: String,
    pub action: String,
    pub outcome: Option<String>,
    pub embedding: Vec<f32>,
    pub weight: f32,
    pub success_count: u64,
    pub failure_count: u64,
    pub trajectory_ids: Vec<String>,
    pub agent_id: String,
    pub task_type: String,
    pub tags: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub version: u64,
    pub deprecated: bool,
}

/// Fields the caller supplies to [`super::PatternStore::insert`]; the rest
/// are initialized (`weight`/`version` defaulted, counts zeroed).
#[derive(Debug, Clone)]
pub struct NewPattern {
    pub name: String,
    pub context: String,
    pub action: String,
    pub outcome: Option<String>,
    pub embedding: Vec<f32>,
    pub weight: f32,
    pub agent_id: String,
    pub task_type: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternStats {
    pub total: usize,
    pub active: usize,
    pub deprecated: usize,
    pub weight_sum: f64,
    pub weight_avg: f64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackOutcome {
    Positive,
    Negative,
    Neutral,
}

/// Append-only learning feedback record. The only permitted
/// mutation after creation is `processed: false -> true`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningFeedback {
    pub id: FeedbackId,
    pub trajectory_id: String,
    pub episode_id: Option<Uuid>,
    pub pattern_id: Option<PatternId>,
    pub quality: f32,
    pub outcome: FeedbackOutcome,
    pub task_type: String,
    pub agent_id: String,
    pub result_length: Option<usize>,
    pub has_code_blocks: Option<bool>,
    pub created_at: i64,
    pub version: u64,
    pub processed: bool,
}

#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub trajectory_id: String,
    pub episode_id: Option<Uuid>,
    pub pattern_id: Option<PatternId>,
    pub quality: f32,
    pub outcome: FeedbackOutcome,
    pub task_type: String,
    pub agent_id: String,
    pub result_length: Option<usize>,
    pub has_code_blocks: Option<bool>,
}
