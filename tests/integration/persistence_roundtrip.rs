//! Round-trips every store through `RecallStore::save_all` / `RecallStore::open`.

use recall_core::distance::Metric;
use recall_core::types::VectorIndexConfig;
use recall_storage::{RecallStore, StorageConfig};
use serde_json::json;
use std::time::Duration;
use test_utils::{test_episode_options, test_pattern};

fn storage_config(dir: &std::path::Path) -> StorageConfig {
    StorageConfig {
        root_dir: dir.to_path_buf(),
        autosave_interval: Duration::from_secs(60),
        lock_timeout: Duration::from_secs(5),
        save_retry_attempts: 2,
    }
}

#[test]
fn episodes_patterns_and_graph_survive_a_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let vector_config = VectorIndexConfig::new(8, Metric::Cosine);

    let episode_id;
    let node_id;
    {
        let mut store = RecallStore::new(vector_config.clone(), storage_config(dir.path()));

        episode_id = store
            .episodes
            .create_episode(test_episode_options("task-1", 8))
            .unwrap();
        store.patterns.insert(test_pattern("fixture-pattern", 8)).unwrap();
        node_id = store
            .graph
            .create_node("root-child", Some("system".to_string()), None, json!({}), None)
            .unwrap();
        store.vectors.insert("standalone-1".to_string(), vec![0.1; 8]).unwrap();

        store.save_all().unwrap();
    }

    let mut reopened = RecallStore::open(vector_config, storage_config(dir.path())).unwrap();
    assert_eq!(reopened.episodes.len(), 1);
    assert!(reopened.episodes.get_by_id(&episode_id).is_some());
    assert_eq!(reopened.patterns.find_by_task_type("testing").len(), 1);
    assert!(reopened.graph.get_node(&node_id).is_some());
    assert!(reopened.vectors.has("standalone-1"));
}
