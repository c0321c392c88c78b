//! Pattern Store and Learning Feedback log: append-or-soft-deprecate records
//! that accumulate what the agent has learned works.

pub mod types;

#[cfg(test)]
mod tests;

use crate::error::{Error, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use types::{
    FeedbackId, LearningFeedback, NewFeedback, NewPattern, Pattern, PatternId, PatternStats,
};
use uuid::Uuid;

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn require_unit_range(value: f32, field: &str) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(Error::OutOfRange(format!("{field} must be in [0,1], got {value}")));
    }
    Ok(())
}

/// Append-or-soft-deprecate pattern store; hard `delete`/`clear` are
/// permanently forbidden.
#[derive(Default)]
pub struct PatternStore {
    patterns: HashMap<PatternId, Pattern>,
}

impl PatternStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, new: NewPattern) -> Result<PatternId> {
        require_unit_range(new.weight, "weight")?;
        let id = Uuid::new_v4();
        let now = now_ms();
        self.patterns.insert(
            id,
            Pattern {
                id,
                name: new.name,
                context: new.context,
                action: new.action,
                outcome: new.outcome,
                embedding: new.embedding,
                weight: new.weight,
                success_count: 0,
                failure_count: 0,
                trajectory_ids: Vec::new(),
                agent_id: new.agent_id,
                task_type: new.task_type,
                tags: new.tags,
                created_at: now,
                updated_at: now,
                version: 1,
                deprecated: false,
            },
        );
        Ok(id)
    }

    #[must_use]
    pub fn find_by_id(&self, id: &PatternId) -> Option<&Pattern> {
        self.patterns.get(id)
    }

    /// Active patterns for `task_type`, sorted by weight desc then `updatedAt` desc.
    #[must_use]
    pub fn find_by_task_type(&self, task_type: &str) -> Vec<&Pattern> {
        let mut matches: Vec<&Pattern> = self
            .patterns
            .values()
            .filter(|p| !p.deprecated && p.task_type == task_type)
            .collect();
        matches.sort_by(|a, b| {
            b.weight
                .partial_cmp(&a.weight)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.updated_at.cmp(&a.updated_at))
        });
        matches
    }

    #[must_use]
    pub fn find_active(&self) -> Vec<&Pattern> {
        self.patterns.values().filter(|p| !p.deprecated).collect()
    }

    fn touch(&mut self, id: &PatternId) -> Result<&mut Pattern> {
        let pattern = self.patterns.get_mut(id).ok_or_else(|| Error::NotFound(id.to_string()))?;
        pattern.version += 1;
        pattern.updated_at = now_ms();
        Ok(pattern)
    }

    pub fn update_weight(&mut self, id: &PatternId, weight: f32) -> Result<()> {
        require_unit_range(weight, "weight")?;
        self.touch(id)?.weight = weight;
        Ok(())
    }

    pub fn increment_success(&mut self, id: &PatternId) -> Result<()> {
        self.touch(id)?.success_count += 1;
        Ok(())
    }

    pub fn increment_failure(&mut self, id: &PatternId) -> Result<()> {
        self.touch(id)?.failure_count += 1;
        Ok(())
    }

    pub fn deprecate(&mut self, id: &PatternId) -> Result<()> {
        self.touch(id)?.deprecated = true;
        Ok(())
    }

    /// Hard-delete is a fixed, permanently forbidden mutation.
    pub fn delete(&mut self, _id: &PatternId) -> Result<()> {
        Err(Error::ForbiddenMutation(
            "hard-delete of a pattern is not permitted; use deprecate()".into(),
        ))
    }

    pub fn clear(&mut self) -> Result<()> {
        Err(Error::ForbiddenMutation(
            "clearing the pattern store is not permitted".into(),
        ))
    }

    #[must_use]
    pub fn get_stats(&self) -> PatternStats {
        let total = self.patterns.len();
        let active = self.patterns.values().filter(|p| !p.deprecated).count();
        let deprecated = total - active;
        let weight_sum: f64 = self.patterns.values().map(|p| f64::from(p.weight)).sum();
        let weight_avg = if total > 0 { weight_sum / total as f64 } else { 0.0 };
        let (successes, failures) = self
            .patterns
            .values()
            .fold((0u64, 0u64), |(s, f), p| (s + p.success_count, f + p.failure_count));
        let success_rate = if successes + failures > 0 {
            successes as f64 / (successes + failures) as f64
        } else {
            0.0
        };
        PatternStats {
            total,
            active,
            deprecated,
            weight_sum,
            weight_avg,
            success_rate,
        }
    }
}

/// Append-only feedback log. The only permitted post-creation mutation is
/// `processed: false -> true`; everything else, including hard-delete, is
/// forbidden.
#[derive(Default)]
pub struct FeedbackStore {
    items: HashMap<FeedbackId, LearningFeedback>,
}

impl FeedbackStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, new: NewFeedback) -> Result<FeedbackId> {
        require_unit_range(new.quality, "quality")?;
        let id = Uuid::new_v4();
        self.items.insert(
            id,
            LearningFeedback {
                id,
                trajectory_id: new.trajectory_id,
                episode_id: new.episode_id,
                pattern_id: new.pattern_id,
                quality: new.quality,
                outcome: new.outcome,
                task_type: new.task_type,
                agent_id: new.agent_id,
                result_length: new.result_length,
                has_code_blocks: new.has_code_blocks,
                created_at: now_ms(),
                version: 1,
                processed: false,
            },
        );
        Ok(id)
    }

    #[must_use]
    pub fn find_by_id(&self, id: &FeedbackId) -> Option<&LearningFeedback> {
        self.items.get(id)
    }

    #[must_use]
    pub fn find_unprocessed(&self) -> Vec<&LearningFeedback> {
        self.items.values().filter(|f| !f.processed).collect()
    }

    pub fn mark_processed(&mut self, id: &FeedbackId) -> Result<()> {
        let item = self.items.get_mut(id).ok_or_else(|| Error::NotFound(id.to_string()))?;
        if item.processed {
            return Err(Error::ForbiddenMutation(
                "feedback is already processed".into(),
            ));
        }
        item.processed = true;
        item.version += 1;
        Ok(())
    }

    pub fn delete(&mut self, _id: &FeedbackId) -> Result<()> {
        Err(Error::ForbiddenMutation(
            "hard-delete of feedback is not permitted".into(),
        ))
    }

    pub fn clear(&mut self) -> Result<()> {
        Err(Error::ForbiddenMutation(
            "clearing the feedback log is not permitted".into(),
        ))
    }
}

pub use types::FeedbackOutcome as Outcome;

#[derive(Debug, Serialize, Deserialize)]
struct PatternSnapshot {
    format_version: u32,
    patterns: HashMap<PatternId, Pattern>,
}

impl PatternStore {
    pub fn save(&self, path: &Path) -> Result<()> {
        let snapshot = PatternSnapshot {
            format_version: crate::constants::SNAPSHOT_FORMAT_VERSION,
            patterns: self.patterns.clone(),
        };
        std::fs::write(path, serde_json::to_vec_pretty(&snapshot)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let snapshot: PatternSnapshot = serde_json::from_slice(&bytes)?;
        if snapshot.format_version != crate::constants::SNAPSHOT_FORMAT_VERSION {
            return Err(Error::SnapshotVersion {
                expected: crate::constants::SNAPSHOT_FORMAT_VERSION,
                found: snapshot.format_version,
            });
        }
        Ok(Self {
            patterns: snapshot.patterns,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FeedbackSnapshot {
    format_version: u32,
    items: HashMap<FeedbackId, LearningFeedback>,
}

impl FeedbackStore {
    pub fn save(&self, path: &Path) -> Result<()> {
        let snapshot = FeedbackSnapshot {
            format_version: crate::constants::SNAPSHOT_FORMAT_VERSION,
            items: self.items.clone(),
        };
        std::fs::write(path, serde_json::to_vec_pretty(&snapshot)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let snapshot: FeedbackSnapshot = serde_json::from_slice(&bytes)?;
        if snapshot.format_version != crate::constants::SNAPSHOT_FORMAT_VERSION {
            return Err(Error::SnapshotVersion {
                expected: crate::constants::SNAPSHOT_FORMAT_VERSION,
                found: snapshot.format_version,
            });
        }
        Ok(Self {
            items: snapshot.items,
        })
    }
}
