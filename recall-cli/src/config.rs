//! Configuration loading: CLI flags > `RECALL_*` environment variables > an
//! optional TOML file > [`RecallConfig::default`].

use anyhow::{Context, Result};
use recall_core::RecallConfig;
use std::path::{Path, PathBuf};

use crate::Cli;

/// Load and merge configuration from every layer, flags taking precedence.
pub fn load_config(cli: &Cli) -> Result<RecallConfig> {
    let mut config = match &cli.config {
        Some(path) => load_file(path)?,
        None => default_config_path()
            .filter(|p| p.exists())
            .map(|p| load_file(&p))
            .transpose()?
            .unwrap_or_default(),
    };

    apply_env(&mut config);
    apply_flags(&mut config, cli);
    Ok(config)
}

fn load_file(path: &Path) -> Result<RecallConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("parsing config file {}", path.display()))
}

fn default_config_path() -> Option<PathBuf> {
    Some(PathBuf::from("recall-cli.toml"))
}

fn apply_env(config: &mut RecallConfig) {
    if let Ok(v) = std::env::var("RECALL_DATA_DIR") {
        config.data_dir = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("RECALL_SOCKET_PATH") {
        config.socket_path = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("RECALL_DIMENSION") {
        if let Ok(dim) = v.parse() {
            config.dimension = dim;
        }
    }
    if let Ok(v) = std::env::var("RECALL_MAX_CLIENTS") {
        if let Ok(n) = v.parse() {
            config.max_clients = n;
        }
    }
}

fn apply_flags(config: &mut RecallConfig, cli: &Cli) {
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(socket) = &cli.socket_path {
        config.socket_path = socket.clone();
    }
}
