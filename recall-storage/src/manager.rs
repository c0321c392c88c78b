//! Background autosave task wrapping a [`RecallStore`]: periodic save,
//! graceful shutdown flush, and startup recovery across four independently
//! persisted stores.

use crate::{RecallStore, StorageConfig};
use parking_lot::RwLock;
use recall_core::types::VectorIndexConfig;
use recall_core::Result;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, info};

pub struct PersistenceManager {
    store: Arc<RwLock<RecallStore>>,
    background_task: RwLock<Option<JoinHandle<()>>>,
}

impl PersistenceManager {
    /// Recover from disk if a snapshot exists, otherwise start empty.
    pub fn open(vector_config: VectorIndexConfig, config: StorageConfig) -> Result<Self> {
        let store = RecallStore::open(vector_config, config)?;
        Ok(Self {
            store: Arc::new(RwLock::new(store)),
            background_task: RwLock::new(None),
        })
    }

    #[must_use]
    pub fn store(&self) -> Arc<RwLock<RecallStore>> {
        Arc::clone(&self.store)
    }

    /// Spawn a task that calls `save_all` on the configured interval until
    /// [`Self::shutdown`] is called.
    pub fn start_background_task(&self) {
        let store = Arc::clone(&self.store);
        let interval_duration = store.read().config.autosave_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = interval(interval_duration);
            loop {
                ticker.tick().await;
                let result = store.read().save_all();
                match result {
                    Ok(()) => debug!("autosave completed"),
                    Err(e) => error!(error = %e, "autosave failed"),
                }
            }
        });

        *self.background_task.write() = Some(handle);
        info!(interval = ?interval_duration, "started recall-storage autosave task");
    }

    /// Stop the background task and perform one final save.
    pub fn shutdown(&self) -> Result<()> {
        if let Some(handle) = self.background_task.write().take() {
            handle.abort();
        }
        info!("shutting down, flushing final snapshot");
        self.store.read().save_all()
    }
}

impl Drop for PersistenceManager {
    fn drop(&mut self) {
        if let Some(handle) = self.background_task.write().take() {
            handle.abort();
        }
    }
}
