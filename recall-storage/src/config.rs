//! Storage configuration: where each store's snapshot lives and how often
//! the background task persists it.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub root_dir: PathBuf,
    pub autosave_interval: Duration,
    pub lock_timeout: Duration,
    pub save_retry_attempts: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            autosave_interval: Duration::from_secs(60),
            lock_timeout: Duration::from_secs(5),
            save_retry_attempts: 3,
        }
    }
}

impl StorageConfig {
    #[must_use]
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn episodes_path(&self) -> PathBuf {
        self.root_dir.join("episodes.json")
    }

    #[must_use]
    pub fn graph_path(&self) -> PathBuf {
        self.root_dir.join("hypergraph.json")
    }

    #[must_use]
    pub fn patterns_path(&self) -> PathBuf {
        self.root_dir.join("patterns.json")
    }

    #[must_use]
    pub fn feedback_path(&self) -> PathBuf {
        self.root_dir.join("feedback.json")
    }

    #[must_use]
    pub fn vectors_path(&self) -> PathBuf {
        self.root_dir.join("vectors.bin")
    }
}
