// Service configuration
// Defaults, optional JSON config file, then environment overrides

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::TrainingConfig;
use crate::state::storage::default_data_dir;

pub const CONFIG_PATH_ENV: &str = "PLAYER_PERFORMANCE_CONFIG";
pub const BIND_ENV: &str = "PLAYER_PERFORMANCE_BIND";
pub const DATABASE_ENV: &str = "PLAYER_PERFORMANCE_DB";
pub const MODEL_ENV: &str = "PLAYER_PERFORMANCE_MODEL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid bind address {0:?}")]
    BindAddr(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// host:port the HTTP server listens on
    pub bind_addr: String,
    pub database_path: PathBuf,
    pub model_path: PathBuf,
    /// JSONL training trace
    pub trace_path: PathBuf,
    /// Epochs and batch size; the architecture is not configurable
    pub training: TrainingConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let data_dir = default_data_dir();
        ServiceConfig {
            bind_addr: "127.0.0.1:8080".to_string(),
            database_path: data_dir.join("player_performance.db"),
            model_path: data_dir.join("player_model.json"),
            trace_path: data_dir.join("training_trace.jsonl"),
            training: TrainingConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Config file named by `PLAYER_PERFORMANCE_CONFIG` (or defaults),
    /// then the individual environment overrides
    pub fn load() -> ConfigResult<Self> {
        let mut config = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.socket_addr()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let bytes = std::fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_bytes(&bytes)
    }

    /// Missing fields keep their defaults
    pub fn from_json_bytes(data: &[u8]) -> ConfigResult<Self> {
        Ok(serde_json::from_slice(data)?)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup(BIND_ENV) {
            self.bind_addr = bind;
        }
        if let Some(db) = lookup(DATABASE_ENV) {
            self.database_path = PathBuf::from(db);
        }
        if let Some(model) = lookup(MODEL_ENV) {
            self.model_path = PathBuf::from(model);
        }
    }

    pub fn socket_addr(&self) -> ConfigResult<SocketAddr> {
        self.bind_addr
            .parse()
            .map_err(|_| ConfigError::BindAddr(self.bind_addr.clone()))
    }
}
