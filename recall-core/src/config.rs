//! `RecallConfig`: the single source of runtime configuration, covering the
//! vector index, storage paths, and IPC server knobs. Layering (CLI flags >
//! environment > TOML file > these defaults) is applied by `recall-cli`;
//! this type only carries the merged result and the schema-at-open-time
//! validation every store relies on.

use crate::distance::Metric;
use crate::types::{BackendPreference, VectorIndexConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecallConfig {
    pub dimension: usize,
    pub metric: Metric,
    pub backend: BackendPreference,
    pub m: usize,
    pub ef_construction: usize,
    pub ef_search: usize,
    pub quantize: bool,

    pub data_dir: PathBuf,
    pub autosave_interval_secs: u64,
    pub lock_timeout_secs: u64,
    pub save_retry_attempts: u32,

    pub socket_path: PathBuf,
    pub max_clients: usize,
    pub keepalive_ms: u64,
    pub graceful_shutdown_ms: u64,
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            dimension: 768,
            metric: Metric::Cosine,
            backend: BackendPreference::default(),
            m: crate::constants::DEFAULT_M,
            ef_construction: crate::constants::DEFAULT_EF_CONSTRUCTION,
            ef_search: crate::constants::DEFAULT_EF_SEARCH,
            quantize: false,
            data_dir: PathBuf::from("."),
            autosave_interval_secs: 60,
            lock_timeout_secs: 5,
            save_retry_attempts: 3,
            socket_path: PathBuf::from(crate::constants::DEFAULT_SOCKET_PATH),
            max_clients: crate::constants::DEFAULT_MAX_CLIENTS,
            keepalive_ms: crate::constants::DEFAULT_KEEPALIVE_MS,
            graceful_shutdown_ms: crate::constants::DEFAULT_GRACEFUL_SHUTDOWN_MS,
        }
    }
}

impl RecallConfig {
    /// The `VectorIndexConfig` this configuration implies.
    #[must_use]
    pub fn vector_index_config(&self) -> VectorIndexConfig {
        VectorIndexConfig {
            dimension: self.dimension,
            metric: self.metric,
            m: self.m,
            ef_construction: self.ef_construction,
            ef_search: self.ef_search,
            backend: self.backend,
            quantize: self.quantize,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_dimension_has_no_implicit_override() {
        let cfg = RecallConfig::default();
        assert_eq!(cfg.dimension, 768);
        assert_eq!(cfg.vector_index_config().dimension, 768);
    }

    #[test]
    fn partial_toml_fills_remaining_fields_from_defaults() {
        let toml_src = r#"
            dimension = 1536
            data_dir = "/var/lib/recall"
        "#;
        let cfg: RecallConfig = toml::from_str(toml_src).unwrap();
        assert_eq!(cfg.dimension, 1536);
        assert_eq!(cfg.data_dir, PathBuf::from("/var/lib/recall"));
        assert_eq!(cfg.max_clients, crate::constants::DEFAULT_MAX_CLIENTS);
    }

    #[test]
    fn round_trips_through_toml() {
        let cfg = RecallConfig::default();
        let serialized = toml::to_string(&cfg).unwrap();
        let reloaded: RecallConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(reloaded.dimension, cfg.dimension);
        assert_eq!(reloaded.socket_path, cfg.socket_path);
        assert_eq!(reloaded.backend, cfg.backend);
    }
}
