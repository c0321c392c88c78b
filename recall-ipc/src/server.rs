//! Unix-domain-socket JSON-RPC server: accepts connections, frames
//! newline-delimited messages, and dispatches them through a
//! [`ServiceRegistry`].

use crate::lifecycle::{LifecycleEvent, ServerState};
use crate::protocol::{
    parse_line, parse_value, JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
    ParsedLine,
};
use crate::registry::ServiceRegistry;
use recall_core::constants::{
    DEFAULT_GRACEFUL_SHUTDOWN_MS, DEFAULT_KEEPALIVE_MS, DEFAULT_MAX_CLIENTS, MAX_MESSAGE_BYTES,
};
use parking_lot::RwLock;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub socket_path: PathBuf,
    pub max_clients: usize,
    pub keepalive: Duration,
    pub graceful_shutdown: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(recall_core::constants::DEFAULT_SOCKET_PATH),
            max_clients: DEFAULT_MAX_CLIENTS,
            keepalive: Duration::from_millis(DEFAULT_KEEPALIVE_MS),
            graceful_shutdown: Duration::from_millis(DEFAULT_GRACEFUL_SHUTDOWN_MS),
        }
    }
}

/// Drives the lifecycle state machine and owns the listening socket.
pub struct IpcServer {
    config: ServerConfig,
    registry: Arc<ServiceRegistry>,
    state: Arc<RwLock<ServerState>>,
    connected_clients: Arc<RwLock<usize>>,
    /// Count of dispatched requests (one per element of a batch), not
    /// connections; reported by `health.status`.
    request_count: Arc<AtomicU64>,
    events: broadcast::Sender<LifecycleEvent>,
    /// Dedicated drain signal for connected clients, distinct from `events`
    /// (which is for external observers): fired the moment the server enters
    /// `Stopping`, before the drain-timeout wait begins.
    client_stop: broadcast::Sender<()>,
    next_client_id: AtomicU64,
}

impl IpcServer {
    /// Construct a server with an empty registry. Use [`Self::with_registry`]
    /// to install one built from [`Self::state_handle`]/
    /// [`Self::connected_clients_handle`] (the `health` service reports on
    /// the server's own state, so it needs these handles before the registry
    /// can be built).
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let (events, _) = broadcast::channel(256);
        let (client_stop, _) = broadcast::channel(1);
        Self {
            config,
            registry: Arc::new(ServiceRegistry::new()),
            state: Arc::new(RwLock::new(ServerState::Stopped)),
            connected_clients: Arc::new(RwLock::new(0)),
            request_count: Arc::new(AtomicU64::new(0)),
            events,
            client_stop,
            next_client_id: AtomicU64::new(1),
        }
    }

    /// Install a registry built from this server's own state handles.
    #[must_use]
    pub fn with_registry(
        mut self,
        build: impl FnOnce(Arc<RwLock<ServerState>>, Arc<RwLock<usize>>, Arc<AtomicU64>) -> ServiceRegistry,
    ) -> Self {
        self.registry = Arc::new(build(
            self.state.clone(),
            self.connected_clients.clone(),
            self.request_count.clone(),
        ));
        self
    }

    #[must_use]
    pub fn state_handle(&self) -> Arc<RwLock<ServerState>> {
        self.state.clone()
    }

    #[must_use]
    pub fn connected_clients_handle(&self) -> Arc<RwLock<usize>> {
        self.connected_clients.clone()
    }

    #[must_use]
    pub fn request_count_handle(&self) -> Arc<AtomicU64> {
        self.request_count.clone()
    }

    /// Subscribe to observable lifecycle events (never sent to clients).
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    fn transition(&self, next: ServerState) -> bool {
        let mut state = self.state.write();
        if !state.can_transition_to(next) {
            return false;
        }
        *state = next;
        true
    }

    /// Remove a stale socket file, bind, and accept connections until
    /// [`Self::shutdown`] is called. Returns once the listener is closed.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> recall_core::Result<()> {
        if !self.transition(ServerState::Starting) {
            return Err(recall_core::Error::InvalidState(
                "server must be stopped before starting".into(),
            ));
        }

        if self.config.socket_path.exists() {
            std::fs::remove_file(&self.config.socket_path)?;
        }

        let listener = match UnixListener::bind(&self.config.socket_path) {
            Ok(l) => l,
            Err(e) => {
                self.transition(ServerState::Stopped);
                let _ = self.events.send(LifecycleEvent::Error {
                    message: e.to_string(),
                });
                return Err(recall_core::Error::Io(e));
            }
        };

        self.transition(ServerState::Running);
        let _ = self.events.send(LifecycleEvent::Start);
        info!(path = %self.config.socket_path.display(), "ipc server listening");

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, _addr) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            warn!(error = %e, "accept failed");
                            continue;
                        }
                    };
                    self.handle_new_connection(stream);
                }
                _ = shutdown.recv() => {
                    break;
                }
            }
        }

        self.graceful_shutdown().await;
        let _ = std::fs::remove_file(&self.config.socket_path);
        self.transition(ServerState::Stopped);
        let _ = self.events.send(LifecycleEvent::Stop);
        Ok(())
    }

    fn handle_new_connection(&self, stream: UnixStream) {
        let current = *self.connected_clients.read();
        if current >= self.config.max_clients {
            let _ = self.events.send(LifecycleEvent::ClientRejected {
                reason: "max_clients_exceeded".to_string(),
            });
            drop(stream);
            return;
        }

        let client_id = self.next_client_id.fetch_add(1, Ordering::SeqCst);
        *self.connected_clients.write() += 1;
        let _ = self.events.send(LifecycleEvent::ClientConnect { client_id });

        let registry = self.registry.clone();
        let connected_clients = self.connected_clients.clone();
        let request_count = self.request_count.clone();
        let events = self.events.clone();
        let keepalive = self.config.keepalive;
        let mut client_stop = self.client_stop.subscribe();

        tokio::spawn(async move {
            handle_client(client_id, stream, registry, request_count, keepalive, &mut client_stop).await;
            *connected_clients.write() -= 1;
            let _ = events.send(LifecycleEvent::ClientDisconnect { client_id });
        });
    }

    async fn graceful_shutdown(&self) {
        if !self.transition(ServerState::Stopping) {
            return;
        }
        debug!("broadcasting shutdown notice to connected clients");
        let _ = self.client_stop.send(());

        let deadline = tokio::time::Instant::now() + self.config.graceful_shutdown;
        while *self.connected_clients.read() > 0 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// Spawn [`Self::run`] on the current runtime, returning a handle plus a
    /// sender the caller uses to request a graceful stop.
    pub fn spawn(self: Arc<Self>) -> (JoinHandle<recall_core::Result<()>>, broadcast::Sender<()>) {
        let (tx, rx) = broadcast::channel(1);
        let server = self;
        let handle = tokio::spawn(async move { server.run(rx).await });
        (handle, tx)
    }
}

async fn handle_client(
    client_id: u64,
    stream: UnixStream,
    registry: Arc<ServiceRegistry>,
    request_count: Arc<AtomicU64>,
    keepalive: Duration,
    shutdown: &mut broadcast::Receiver<()>,
) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();

    loop {
        line.clear();
        let read = tokio::time::timeout(keepalive, reader.read_line(&mut line));
        let n = tokio::select! {
            result = read => match result {
                Ok(Ok(n)) => n,
                Ok(Err(e)) => {
                    debug!(client_id, error = %e, "read error, closing connection");
                    return;
                }
                Err(_) => {
                    debug!(client_id, "keepalive expired, closing idle connection");
                    return;
                }
            },
            _ = shutdown.recv() => {
                let notice = JsonRpcNotification::new("server.shutdown", serde_json::json!({}));
                if let Ok(mut payload) = serde_json::to_vec(&notice) {
                    payload.push(b'\n');
                    let _ = write_half.write_all(&payload).await;
                }
                return;
            }
        };

        if n == 0 {
            return;
        }
        if line.len() > MAX_MESSAGE_BYTES {
            let _ = write_response(&mut write_half, &JsonRpcResponse::failure(
                Value::Null,
                JsonRpcError::new(crate::protocol::INVALID_REQUEST, "message too large"),
            )).await;
            line.clear();
            continue;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match parse_line(trimmed) {
            Ok(ParsedLine::Single(request)) => {
                if let Some(response) = dispatch_request(&registry, request, &request_count).await {
                    if write_response(&mut write_half, &response).await.is_err() {
                        return;
                    }
                }
            }
            Ok(ParsedLine::Batch(items)) => {
                let mut responses = Vec::with_capacity(items.len());
                for item in items {
                    match parse_value(item) {
                        Ok(request) => {
                            if let Some(response) =
                                dispatch_request(&registry, request, &request_count).await
                            {
                                responses.push(response);
                            }
                        }
                        Err(err) => responses.push(JsonRpcResponse::failure(Value::Null, err)),
                    }
                }
                if !responses.is_empty() && write_batch_response(&mut write_half, &responses).await.is_err() {
                    return;
                }
            }
            Err(err) => {
                if write_response(&mut write_half, &JsonRpcResponse::failure(Value::Null, err))
                    .await
                    .is_err()
                {
                    return;
                }
            }
        }
    }
}

/// Dispatch one already-parsed request, counting it toward `health.status`'s
/// live stats. Returns `None` for notifications, which produce no response.
async fn dispatch_request(
    registry: &ServiceRegistry,
    request: JsonRpcRequest,
    request_count: &AtomicU64,
) -> Option<JsonRpcResponse> {
    request_count.fetch_add(1, Ordering::Relaxed);
    let is_notification = request.is_notification();
    let id = request.id.clone().unwrap_or(Value::Null);
    let method = request
        .split_method()
        .map(|(service, method)| (service.to_string(), method.to_string()));
    let response = match method {
        Some((service, method)) => match registry.dispatch(&service, &method, request.params).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(err) => JsonRpcResponse::failure(id, err),
        },
        None => JsonRpcResponse::failure(
            id,
            JsonRpcError::new(crate::protocol::INVALID_REQUEST, "method must be \"service.method\""),
        ),
    };
    if is_notification {
        None
    } else {
        Some(response)
    }
}

async fn write_response(
    writer: &mut (impl AsyncWriteExt + Unpin),
    response: &JsonRpcResponse,
) -> std::io::Result<()> {
    let mut payload = match serde_json::to_vec(response) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(error = %e, "failed to serialize response");
            return Ok(());
        }
    };
    payload.push(b'\n');
    writer.write_all(&payload).await
}

/// Write a batch's responses as a single JSON array line, mirroring the
/// request batch (notifications already filtered out by the caller).
async fn write_batch_response(
    writer: &mut (impl AsyncWriteExt + Unpin),
    responses: &[JsonRpcResponse],
) -> std::io::Result<()> {
    let mut payload = match serde_json::to_vec(responses) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(error = %e, "failed to serialize batch response");
            return Ok(());
        }
    };
    payload.push(b'\n');
    writer.write_all(&payload).await
}
