use super::*;
use recall_core::distance::Metric;
use recall_core::episode::types::CreateEpisodeOptions;

fn vector_config() -> VectorIndexConfig {
    VectorIndexConfig::new(4, Metric::Cosine)
}

#[test]
fn save_all_then_open_recovers_every_store() {
    let dir = tempfile::tempdir().unwrap();
    let config = StorageConfig::new(dir.path());

    let mut store = RecallStore::new(vector_config(), config.clone());
    store
        .episodes
        .create_episode(CreateEpisodeOptions {
            task_id: "t1".into(),
            embedding: vec![1.0, 0.0, 0.0, 0.0],
            ..Default::default()
        })
        .unwrap();
    store.graph.create_node("root", None, None, serde_json::json!({}), None).unwrap();
    store.save_all().unwrap();

    let reopened = RecallStore::open(vector_config(), config).unwrap();
    assert_eq!(reopened.episodes.len(), 1);
    assert!(reopened.graph.root().is_some());
}

#[test]
fn open_with_no_existing_files_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let config = StorageConfig::new(dir.path());
    let store = RecallStore::open(vector_config(), config).unwrap();
    assert!(store.episodes.is_empty());
}
