//! Error taxonomy for the recall engine core.
//!
//! One flat `thiserror` enum covering every failure kind, plus an
//! `is_recoverable()` classifier used by retrying callers (the Pattern/Feedback
//! DAOs, the hypergraph advisory-lock retry loop).

use uuid::Uuid;

/// Result type alias used throughout `recall-core`.
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds for vector indexing, episodic storage, hypergraph, and fusion search.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // --- Validation ---
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("vector contains a non-finite component")]
    NotFinite,

    #[error("vector is not L2-normalized (norm {norm:.6}, tolerance {tolerance:.6})")]
    NotNormalized { norm: f32, tolerance: f32 },

    #[error("invalid id: {0}")]
    InvalidId(String),

    #[error("self-link is not allowed for episode {0}")]
    SelfLink(Uuid),

    #[error("link would introduce a cycle in the sequence subgraph")]
    SequenceCycle,

    #[error("out-degree limit of {limit} exceeded for episode {id}")]
    OutDegreeExceeded { id: Uuid, limit: usize },

    #[error("forbidden mutation: {0}")]
    ForbiddenMutation(String),

    #[error("value out of range: {0}")]
    OutOfRange(String),

    #[error("metadata payload too large: {size} bytes (limit {limit})")]
    MetadataTooLarge { size: usize, limit: usize },

    #[error("hyperedge must reference at least {min} nodes, got {actual}")]
    HyperedgeArity { min: usize, actual: usize },

    #[error("node would be orphaned: no edge to an existing node or root namespace")]
    OrphanNode,

    // --- Not found ---
    #[error("id not found: {0}")]
    NotFound(String),

    #[error("unknown service: {0}")]
    UnknownService(String),

    #[error("unknown method: {service}.{method}")]
    UnknownMethod { service: String, method: String },

    // --- State ---
    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("vector index not initialized")]
    IndexNotInitialized,

    // --- Persistence ---
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("snapshot version mismatch: expected {expected}, found {found}")]
    SnapshotVersion { expected: u32, found: u32 },

    #[error("persistence error: {0}")]
    Persistence(String),

    // --- Transport ---
    #[error("message exceeds maximum size of {limit} bytes")]
    MessageTooLarge { limit: usize },

    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("connection capacity exceeded (max {max})")]
    MaxClientsExceeded { max: usize },

    // --- Timeout ---
    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    // --- Concurrency ---
    #[error("advisory lock contention after {attempts} attempts")]
    LockContention { attempts: u32 },
}

impl Error {
    /// Whether a retry with backoff is likely to help.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Io(_)
                | Error::Persistence(_)
                | Error::Timeout(_)
                | Error::LockContention { .. }
        )
    }

    /// JSON-RPC error-code band this error maps to.
    #[must_use]
    pub fn rpc_code(&self) -> i64 {
        match self {
            Error::DimensionMismatch { .. }
            | Error::NotFinite
            | Error::NotNormalized { .. }
            | Error::InvalidId(_)
            | Error::SelfLink(_)
            | Error::SequenceCycle
            | Error::OutDegreeExceeded { .. }
            | Error::ForbiddenMutation(_)
            | Error::OutOfRange(_)
            | Error::MetadataTooLarge { .. }
            | Error::HyperedgeArity { .. }
            | Error::OrphanNode
            | Error::MalformedRequest(_) => -32602,
            Error::NotFound(_) | Error::UnknownService(_) | Error::UnknownMethod { .. } => -32601,
            _ => -32000,
        }
    }
}
