//! Fixture builders shared across `recall-*` crates' test suites: cheap,
//! deterministic-shaped episodes, patterns, and hypergraph nodes so each
//! crate's tests don't hand-roll the same boilerplate.

use rand::RngExt;
use recall_core::episode::types::{CreateEpisodeOptions, EpisodeMetadata};
use recall_core::pattern::types::{FeedbackOutcome, NewFeedback, NewPattern};

/// A unit-norm pseudo-random embedding of the given dimension, suitable for
/// cosine-metric fixtures.
#[must_use]
pub fn random_unit_embedding(dimension: usize) -> Vec<f32> {
    let mut rng = rand::rng();
    let mut v: Vec<f32> = (0..dimension).map(|_| rng.random_range(-1.0..1.0)).collect();
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

/// A minimal, valid [`CreateEpisodeOptions`] for `task_id` with a random
/// unit-norm embedding of `dimension`.
#[must_use]
pub fn test_episode_options(task_id: &str, dimension: usize) -> CreateEpisodeOptions {
    CreateEpisodeOptions {
        task_id: task_id.to_string(),
        start_time: None,
        end_time: None,
        embedding: random_unit_embedding(dimension),
        metadata: EpisodeMetadata {
            agent_type: Some("test-agent".to_string()),
            task_description: Some(format!("fixture for {task_id}")),
            outcome: None,
            tags: Vec::new(),
            extra: serde_json::Map::new(),
        },
        initial_links: Vec::new(),
    }
}

/// A minimal, valid [`NewPattern`] named `name` with a random unit-norm
/// embedding of `dimension`.
#[must_use]
pub fn test_pattern(name: &str, dimension: usize) -> NewPattern {
    NewPattern {
        name: name.to_string(),
        context: "fixture context".to_string(),
        action: "fixture action".to_string(),
        outcome: None,
        embedding: random_unit_embedding(dimension),
        weight: 0.5,
        agent_id: "test-agent".to_string(),
        task_type: "testing".to_string(),
        tags: Vec::new(),
    }
}

/// A minimal, valid [`NewFeedback`] referencing no particular pattern or
/// episode.
#[must_use]
pub fn test_feedback(quality: f32) -> NewFeedback {
    NewFeedback {
        trajectory_id: uuid::Uuid::new_v4().to_string(),
        episode_id: None,
        pattern_id: None,
        quality,
        outcome: FeedbackOutcome::Neutral,
        task_type: "testing".to_string(),
        agent_id: "test-agent".to_string(),
        result_length: None,
        has_code_blocks: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_unit_embedding_is_normalized() {
        let v = random_unit_embedding(16);
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }
}
