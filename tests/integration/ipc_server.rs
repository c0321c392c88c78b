//! Drives `IpcServer` over a real Unix-domain socket: connect, issue
//! `health.ping` and `episode.create`/`episode.get`, then shut down cleanly.

use parking_lot::RwLock;
use recall_core::distance::Metric;
use recall_core::types::VectorIndexConfig;
use recall_ipc::{build_registry, IpcServer, ServerConfig};
use recall_storage::{RecallStore, StorageConfig};
use serde_json::{json, Value};
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

async fn roundtrip(stream: &mut UnixStream, request: Value) -> Value {
    let mut payload = serde_json::to_vec(&request).unwrap();
    payload.push(b'\n');
    stream.write_all(&payload).await.unwrap();

    let (read_half, _write_half) = stream.split();
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    serde_json::from_str(line.trim()).unwrap()
}

#[tokio::test]
#[serial]
async fn health_ping_and_episode_roundtrip_over_the_socket() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("recall-test.sock");

    let storage_config = StorageConfig {
        root_dir: dir.path().to_path_buf(),
        autosave_interval: Duration::from_secs(60),
        lock_timeout: Duration::from_secs(5),
        save_retry_attempts: 1,
    };
    let vector_config = VectorIndexConfig::new(4, Metric::Cosine);
    let store = Arc::new(RwLock::new(RecallStore::new(vector_config, storage_config)));

    let server_config = ServerConfig {
        socket_path: socket_path.clone(),
        max_clients: 4,
        keepalive: Duration::from_secs(5),
        graceful_shutdown: Duration::from_millis(500),
    };
    let server = Arc::new(
        IpcServer::new(server_config)
            .with_registry(|state, connected, request_count| {
                build_registry(store.clone(), state, connected, request_count)
            }),
    );

    let (handle, shutdown_tx) = server.clone().spawn();
    // Give the listener a moment to bind before connecting.
    for _ in 0..50 {
        if socket_path.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let mut client = UnixStream::connect(&socket_path).await.unwrap();

    let ping = roundtrip(
        &mut client,
        json!({"jsonrpc": "2.0", "method": "health.ping", "params": {}, "id": 1}),
    )
    .await;
    assert_eq!(ping["result"]["pong"], json!(true));

    let created = roundtrip(
        &mut client,
        json!({
            "jsonrpc": "2.0",
            "method": "episode.create",
            "params": {
                "taskId": "ipc-test-task",
                "embedding": [0.1, 0.2, 0.3, 0.4],
                "metadata": {},
            },
            "id": 2,
        }),
    )
    .await;
    let episode_id = created["result"]["id"].as_str().unwrap().to_string();

    let fetched = roundtrip(
        &mut client,
        json!({
            "jsonrpc": "2.0",
            "method": "episode.get",
            "params": {"id": episode_id},
            "id": 3,
        }),
    )
    .await;
    assert_eq!(fetched["result"]["taskId"], json!("ipc-test-task"));

    let status = roundtrip(
        &mut client,
        json!({"jsonrpc": "2.0", "method": "health.status", "params": {}, "id": 4}),
    )
    .await;
    assert_eq!(status["result"]["totalRequests"], json!(4));

    let mut payload = serde_json::to_vec(&json!([
        {"jsonrpc": "2.0", "method": "health.ping", "params": {}, "id": 5},
        {"jsonrpc": "2.0", "method": "health.ping", "params": {}, "id": 6},
    ]))
    .unwrap();
    payload.push(b'\n');
    client.write_all(&payload).await.unwrap();
    let (read_half, _write_half) = client.split();
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    let batch: Vec<Value> = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0]["result"]["pong"], json!(true));
    assert_eq!(batch[1]["result"]["pong"], json!(true));

    let _ = shutdown_tx.send(());
    handle.await.unwrap().unwrap();
}
