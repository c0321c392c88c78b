//! Persistence orchestration for the recall engine.
//!
//! Composes the four `recall-core` stores behind one configuration and a
//! background autosave task that periodically snapshots each store to its
//! own independently-pathed file (episodes, hypergraph, patterns, feedback)
//! and recovers them on startup.

pub mod config;
pub mod manager;

#[cfg(test)]
mod tests;

pub use config::StorageConfig;
pub use manager::PersistenceManager;

use recall_core::episode::EpisodeStore;
use recall_core::hypergraph::HypergraphStore;
use recall_core::pattern::{FeedbackStore, PatternStore};
use recall_core::types::VectorIndexConfig;
use recall_core::vector_index::{self, VectorIndex};
use recall_core::Result;
use std::time::Duration;
use tracing::{info, warn};

/// The four composed stores plus the configuration that locates their
/// snapshot files on disk. `vectors` is a standalone index independent of
/// the Episode Store's own, used for ad hoc embeddings such as a graph
/// node's `vector_id`.
pub struct RecallStore {
    pub episodes: EpisodeStore,
    pub graph: HypergraphStore,
    pub patterns: PatternStore,
    pub feedback: FeedbackStore,
    pub vectors: Box<dyn VectorIndex>,
    config: StorageConfig,
}

impl RecallStore {
    /// Create an empty store rooted at `config`'s directory.
    #[must_use]
    pub fn new(vector_config: VectorIndexConfig, config: StorageConfig) -> Self {
        let mut graph = HypergraphStore::new();
        graph.add_root_namespace("system");
        Self {
            episodes: EpisodeStore::new(vector_config.clone()),
            graph,
            patterns: PatternStore::new(),
            feedback: FeedbackStore::new(),
            vectors: vector_index::open(vector_config),
            config,
        }
    }

    /// Recover every store whose snapshot file exists under `config`'s
    /// directory; stores without an existing file start empty.
    pub fn open(vector_config: VectorIndexConfig, config: StorageConfig) -> Result<Self> {
        let episodes = if config.episodes_path().exists() {
            EpisodeStore::load_rows(&config.episodes_path(), vector_config.clone())?
        } else {
            EpisodeStore::new(vector_config.clone())
        };

        let graph = if config.graph_path().exists() {
            HypergraphStore::load(&config.graph_path(), config.lock_timeout)?
        } else {
            let mut g = HypergraphStore::new();
            g.add_root_namespace("system");
            g
        };

        let patterns = if config.patterns_path().exists() {
            PatternStore::load(&config.patterns_path())?
        } else {
            PatternStore::new()
        };

        let feedback = if config.feedback_path().exists() {
            FeedbackStore::load(&config.feedback_path())?
        } else {
            FeedbackStore::new()
        };

        let mut vectors = vector_index::open(vector_config);
        vectors.load(&config.vectors_path())?;

        Ok(Self {
            episodes,
            graph,
            patterns,
            feedback,
            vectors,
            config,
        })
    }

    /// Save every store to its own file, retrying each write independently
    /// with a short backoff. Returns the first error encountered after
    /// retries exhaust, having already attempted every store rather than
    /// bailing out early.
    pub fn save_all(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config.root_dir)?;

        let mut first_error = None;
        let attempts = self.config.save_retry_attempts;

        if let Err(e) = retry(attempts, || self.episodes.save_rows(&self.config.episodes_path())) {
            warn!(error = %e, "failed to save episode rows after retries");
            first_error.get_or_insert(e);
        }
        if let Err(e) = retry(attempts, || self.graph.save(&self.config.graph_path())) {
            warn!(error = %e, "failed to save hypergraph snapshot after retries");
            first_error.get_or_insert(e);
        }
        if let Err(e) = retry(attempts, || self.patterns.save(&self.config.patterns_path())) {
            warn!(error = %e, "failed to save pattern store after retries");
            first_error.get_or_insert(e);
        }
        if let Err(e) = retry(attempts, || self.feedback.save(&self.config.feedback_path())) {
            warn!(error = %e, "failed to save feedback log after retries");
            first_error.get_or_insert(e);
        }
        if let Err(e) = retry(attempts, || self.vectors.save(&self.config.vectors_path())) {
            warn!(error = %e, "failed to save vector index after retries");
            first_error.get_or_insert(e);
        }

        if let Some(e) = first_error {
            return Err(e);
        }
        info!(dir = %self.config.root_dir.display(), "saved all stores");
        Ok(())
    }
}

fn retry<F: Fn() -> Result<()>>(attempts: u32, op: F) -> Result<()> {
    let mut last = op();
    for attempt in 1..attempts {
        if last.is_ok() {
            return last;
        }
        std::thread::sleep(Duration::from_millis(50 * u64::from(attempt)));
        last = op();
    }
    last
}
