use super::types::{FeedbackOutcome, NewFeedback, NewPattern};
use super::*;

fn new_pattern(task_type: &str, weight: f32) -> NewPattern {
    NewPattern {
        name: "retry-on-timeout".into(),
        context: "network call".into(),
        action: "retry with backoff".into(),
        outcome: None,
        embedding: vec![1.0, 0.0],
        weight,
        agent_id: "agent-1".into(),
        task_type: task_type.into(),
        tags: vec![],
    }
}

#[test]
fn insert_rejects_out_of_range_weight() {
    let mut store = PatternStore::new();
    let err = store.insert(new_pattern("net", 1.5)).unwrap_err();
    assert!(matches!(err, Error::OutOfRange(_)));
}

#[test]
fn find_by_task_type_sorts_by_weight_then_recency() {
    let mut store = PatternStore::new();
    let low = store.insert(new_pattern("net", 0.2)).unwrap();
    let high = store.insert(new_pattern("net", 0.9)).unwrap();
    let _other = store.insert(new_pattern("disk", 0.9)).unwrap();

    let ranked = store.find_by_task_type("net");
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].id, high);
    assert_eq!(ranked[1].id, low);
}

#[test]
fn deprecate_excludes_from_active_and_task_type_queries() {
    let mut store = PatternStore::new();
    let id = store.insert(new_pattern("net", 0.5)).unwrap();
    store.deprecate(&id).unwrap();
    assert!(store.find_active().is_empty());
    assert!(store.find_by_task_type("net").is_empty());
    assert!(store.find_by_id(&id).unwrap().deprecated);
}

#[test]
fn hard_delete_and_clear_are_always_forbidden() {
    let mut store = PatternStore::new();
    let id = store.insert(new_pattern("net", 0.5)).unwrap();
    assert!(matches!(store.delete(&id).unwrap_err(), Error::ForbiddenMutation(_)));
    assert!(matches!(store.clear().unwrap_err(), Error::ForbiddenMutation(_)));
    assert!(store.find_by_id(&id).is_some());
}

#[test]
fn stats_reflect_success_rate_and_weight_average() {
    let mut store = PatternStore::new();
    let a = store.insert(new_pattern("net", 1.0)).unwrap();
    let b = store.insert(new_pattern("net", 0.0)).unwrap();
    store.increment_success(&a).unwrap();
    store.increment_success(&a).unwrap();
    store.increment_failure(&b).unwrap();

    let stats = store.get_stats();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.active, 2);
    assert!((stats.weight_avg - 0.5).abs() < 1e-9);
    assert!((stats.success_rate - (2.0 / 3.0)).abs() < 1e-9);
}

fn new_feedback(quality: f32) -> NewFeedback {
    NewFeedback {
        trajectory_id: "traj-1".into(),
        episode_id: None,
        pattern_id: None,
        quality,
        outcome: FeedbackOutcome::Positive,
        task_type: "net".into(),
        agent_id: "agent-1".into(),
        result_length: None,
        has_code_blocks: None,
    }
}

#[test]
fn feedback_quality_out_of_range_is_rejected() {
    let mut log = FeedbackStore::new();
    assert!(matches!(
        log.record(new_feedback(-0.1)).unwrap_err(),
        Error::OutOfRange(_)
    ));
}

#[test]
fn feedback_processed_flag_flips_once_then_locks() {
    let mut log = FeedbackStore::new();
    let id = log.record(new_feedback(0.8)).unwrap();
    assert!(!log.find_by_id(&id).unwrap().processed);
    log.mark_processed(&id).unwrap();
    assert!(log.find_by_id(&id).unwrap().processed);
    assert!(matches!(
        log.mark_processed(&id).unwrap_err(),
        Error::ForbiddenMutation(_)
    ));
}

#[test]
fn pattern_store_save_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("patterns.json");
    let mut store = PatternStore::new();
    let id = store.insert(new_pattern("net", 0.7)).unwrap();
    store.save(&path).unwrap();

    let loaded = PatternStore::load(&path).unwrap();
    assert_eq!(loaded.find_by_id(&id).unwrap().weight, 0.7);
}

#[test]
fn feedback_hard_delete_and_clear_are_forbidden() {
    let mut log = FeedbackStore::new();
    let id = log.record(new_feedback(0.5)).unwrap();
    assert!(matches!(log.delete(&id).unwrap_err(), Error::ForbiddenMutation(_)));
    assert!(matches!(log.clear().unwrap_err(), Error::ForbiddenMutation(_)));
}
