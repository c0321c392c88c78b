use recall_core::RecallConfig;
use recall_ipc::{IpcServer, ServerConfig};
use recall_storage::{PersistenceManager, StorageConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Recover (or create) the stores, start the autosave task, and run the IPC
/// server in the foreground until interrupted with Ctrl+C.
pub async fn run(config: RecallConfig) -> anyhow::Result<()> {
    let storage_config = StorageConfig {
        root_dir: config.data_dir.clone(),
        autosave_interval: Duration::from_secs(config.autosave_interval_secs),
        lock_timeout: Duration::from_secs(config.lock_timeout_secs),
        save_retry_attempts: config.save_retry_attempts,
    };

    let manager = PersistenceManager::open(config.vector_index_config(), storage_config)?;
    manager.start_background_task();
    let store = manager.store();

    let server_config = ServerConfig {
        socket_path: config.socket_path.clone(),
        max_clients: config.max_clients,
        keepalive: Duration::from_millis(config.keepalive_ms),
        graceful_shutdown: Duration::from_millis(config.graceful_shutdown_ms),
    };

    let server = Arc::new(IpcServer::new(server_config).with_registry(
        |state, connected_clients, request_count| {
            recall_ipc::build_registry(store.clone(), state, connected_clients, request_count)
        },
    ));

    let (handle, shutdown_tx) = server.spawn();

    tokio::signal::ctrl_c().await?;
    info!("received interrupt, shutting down");
    let _ = shutdown_tx.send(());
    handle.await??;

    manager.shutdown()?;
    Ok(())
}
