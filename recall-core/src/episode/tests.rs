use super::types::{CreateEpisodeOptions, EpisodeMetadata, EpisodePatch, LinkType};
use super::*;
use crate::distance::Metric;

fn store() -> EpisodeStore {
    EpisodeStore::new(VectorIndexConfig::new(4, Metric::Cosine))
}

fn opts(task_id: &str, embedding: Vec<f32>) -> CreateEpisodeOptions {
    CreateEpisodeOptions {
        task_id: task_id.into(),
        embedding,
        metadata: EpisodeMetadata::default(),
        ..Default::default()
    }
}

#[test]
fn create_then_get_round_trips() {
    let mut s = store();
    let id = s.create_episode(opts("t1", vec![1.0, 0.0, 0.0, 0.0])).unwrap();
    let ep = s.get_by_id(&id).unwrap();
    assert_eq!(ep.task_id, "t1");
    assert!(ep.end_time.is_none());
}

#[test]
fn empty_task_id_is_rejected() {
    let mut s = store();
    let err = s.create_episode(opts("", vec![1.0, 0.0, 0.0, 0.0])).unwrap_err();
    assert!(matches!(err, Error::InvalidId(_)));
}

#[test]
fn dimension_mismatch_rolls_back_row_insert() {
    let mut s = store();
    let err = s.create_episode(opts("t1", vec![1.0, 0.0])).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { .. }));
    assert!(s.is_empty());
}

#[test]
fn query_by_time_range_orders_ascending_and_respects_limit() {
    let mut s = store();
    let mut ids = Vec::new();
    for i in 0..5 {
        let mut o = opts("t1", vec![1.0, 0.0, 0.0, 0.0]);
        o.start_time = Some(i * 1000);
        ids.push(s.create_episode(o).unwrap());
    }
    let got = s.query_by_time_range(1000, 3000, false, None);
    assert_eq!(got.len(), 3);
    assert!(got.windows(2).all(|w| w[0].start_time <= w[1].start_time));

    let limited = s.query_by_time_range(0, 4000, false, Some(2));
    assert_eq!(limited.len(), 2);
}

#[test]
fn query_by_time_range_includes_ongoing_when_requested() {
    let mut s = store();
    let mut o = opts("t1", vec![1.0, 0.0, 0.0, 0.0]);
    o.start_time = Some(0);
    o.end_time = None;
    s.create_episode(o).unwrap();

    assert!(s.query_by_time_range(5000, 6000, false, None).is_empty());
    assert_eq!(s.query_by_time_range(5000, 6000, true, None).len(), 1);
}

#[test]
fn search_by_similarity_filters_by_task_and_min_similarity() {
    let mut s = store();
    s.create_episode(opts("t1", vec![1.0, 0.0, 0.0, 0.0])).unwrap();
    s.create_episode(opts("t2", vec![0.0, 1.0, 0.0, 0.0])).unwrap();

    let results = s
        .search_by_similarity(&[1.0, 0.0, 0.0, 0.0], 5, Some(0.9), None)
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0.task_id, "t1");

    let filtered = s
        .search_by_similarity(&[1.0, 0.0, 0.0, 0.0], 5, None, Some(&["t2".to_string()]))
        .unwrap();
    assert!(filtered.iter().all(|(ep, _)| ep.task_id == "t2"));
}

#[test]
fn update_reupserts_embedding_and_rekeys_time_index() {
    let mut s = store();
    let id = s.create_episode(opts("t1", vec![1.0, 0.0, 0.0, 0.0])).unwrap();
    s.update(
        &id,
        EpisodePatch {
            start_time: Some(9999),
            embedding: Some(vec![0.0, 1.0, 0.0, 0.0]),
            ..Default::default()
        },
    )
    .unwrap();

    let ep = s.get_by_id(&id).unwrap();
    assert_eq!(ep.start_time, 9999);
    assert_eq!(ep.embedding, vec![0.0, 1.0, 0.0, 0.0]);
    assert_eq!(s.query_by_time_range(9999, 9999, false, None).len(), 1);
}

#[test]
fn link_episodes_rejects_self_link_and_enforces_cycle_check() {
    let mut s = store();
    let a = s.create_episode(opts("t1", vec![1.0, 0.0, 0.0, 0.0])).unwrap();
    let b = s.create_episode(opts("t1", vec![0.0, 1.0, 0.0, 0.0])).unwrap();

    assert!(matches!(
        s.link_episodes(a, a, LinkType::Sequence).unwrap_err(),
        Error::SelfLink(_)
    ));

    s.link_episodes(a, b, LinkType::Sequence).unwrap();
    assert!(matches!(
        s.link_episodes(b, a, LinkType::Sequence).unwrap_err(),
        Error::SequenceCycle
    ));
}

#[test]
fn delete_cleans_up_adjacency_on_both_sides() {
    let mut s = store();
    let a = s.create_episode(opts("t1", vec![1.0, 0.0, 0.0, 0.0])).unwrap();
    let b = s.create_episode(opts("t1", vec![0.0, 1.0, 0.0, 0.0])).unwrap();
    s.link_episodes(a, b, LinkType::Reference).unwrap();

    assert!(s.delete(&b));
    let row_a = s.get_by_id(&a).unwrap();
    assert!(!row_a.linked_episodes.contains(&b));
}

#[test]
fn save_rows_then_load_rows_round_trips_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("episodes.json");
    let mut s = store();
    let a = s.create_episode(opts("t1", vec![1.0, 0.0, 0.0, 0.0])).unwrap();
    let b = s.create_episode(opts("t1", vec![0.0, 1.0, 0.0, 0.0])).unwrap();
    s.link_episodes(a, b, LinkType::Reference).unwrap();
    s.save_rows(&path).unwrap();

    let mut loaded = EpisodeStore::load_rows(&path, VectorIndexConfig::new(4, Metric::Cosine)).unwrap();
    assert_eq!(loaded.len(), 2);
    let row_a = loaded.get_by_id(&a).unwrap();
    assert!(row_a.linked_episodes.contains(&b));
}

#[test]
fn episode_context_has_direct_temporal_and_semantic_lists() {
    let mut s = store();
    s.create_episode(opts("t1", vec![1.0, 0.0, 0.0, 0.0])).unwrap();

    let ctx = s.get_episode_context("t1");
    assert!(!ctx.direct.is_empty());
}
