//! Tunable defaults, referenced throughout `recall-core` and by `recall-ipc`/`recall-cli`
//! configuration loaders.

/// Default HNSW neighbor count per node above layer 0.
pub const DEFAULT_M: usize = 16;

/// Default beam width used while building the graph.
pub const DEFAULT_EF_CONSTRUCTION: usize = 200;

/// Default beam width used while searching the graph.
pub const DEFAULT_EF_SEARCH: usize = 50;

/// Layer-0 neighbor count is always `2 * M`.
#[must_use]
pub const fn m0(m: usize) -> usize {
    2 * m
}

/// Tolerance for the "L2-normalized" insertion/query contract.
pub const NORMALIZATION_EPSILON: f32 = 1e-4;

/// LEANN: fraction of nodes (by degree) kept in the hub cache.
pub const DEFAULT_HUB_CACHE_RATIO: f32 = 0.10;

/// LEANN: minimum degree for a node to be eligible as a hub.
pub const DEFAULT_HUB_DEGREE_THRESHOLD: usize = 10;

/// LEANN: fraction of `M` outgoing edges retained per node after pruning.
pub const DEFAULT_GRAPH_PRUNING_RATIO: f32 = 0.5;

/// LEANN: below this many stored vectors, search falls back to brute force.
pub const LEANN_BRUTE_FORCE_THRESHOLD: usize = 128;

/// Int8 quantization re-rank candidate multiplier.
pub const QUANT_RERANK_MULTIPLIER: usize = 4;

/// B+ tree branching order default.
pub const DEFAULT_BTREE_ORDER: usize = 32;

/// Maximum unique linked episodes per episode.
pub const MAX_LINKED_EPISODES: usize = 100;

/// Maximum outgoing episode links per source.
pub const MAX_OUT_DEGREE: usize = 100;

/// Maximum episode metadata JSON payload size in bytes.
pub const MAX_METADATA_BYTES: usize = 100 * 1024;

/// Hypergraph minimum node arity.
pub const MIN_HYPEREDGE_ARITY: usize = 3;

/// Hypergraph advisory lock: maximum retry attempts.
pub const LOCK_MAX_ATTEMPTS: u32 = 5;

/// Hypergraph advisory lock: initial backoff before doubling toward `lockTimeout`.
pub const LOCK_INITIAL_BACKOFF_MS: u64 = 100;

/// Quad-Fusion: default per-source timeout.
pub const DEFAULT_SOURCE_TIMEOUT_MS: u64 = 800;

/// Quad-Fusion: default result count after fusion + truncation.
pub const DEFAULT_TOP_K: usize = 10;

/// IPC: maximum JSON-RPC message size.
pub const MAX_MESSAGE_BYTES: usize = 10 * 1024 * 1024;

/// IPC: default maximum concurrent clients.
pub const DEFAULT_MAX_CLIENTS: usize = 10;

/// IPC: default keepalive interval.
pub const DEFAULT_KEEPALIVE_MS: u64 = 30_000;

/// IPC: default graceful shutdown budget.
pub const DEFAULT_GRACEFUL_SHUTDOWN_MS: u64 = 5_000;

/// IPC: default local stream-socket path.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/recall-engine.sock";

/// Current on-disk snapshot format version for vector-index and hypergraph files.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Episode context retrieval: temporal window for "recent" episodes, in seconds.
pub const CONTEXT_TEMPORAL_WINDOW_SECS: i64 = 3600;

/// Episode context retrieval: number of semantic neighbors returned.
pub const CONTEXT_SEMANTIC_NEIGHBORS: usize = 10;
