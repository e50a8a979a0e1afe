use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use idr_store::{InMemoryContactStore, RetryPolicy, SqliteContactStore};

use crate::backend::ContactBackend;
use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub store: StoreConfig,
    /// `tracing` filter directive, e.g. `info` or `idr_engine=debug`.
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 3000)),
            store: StoreConfig::default(),
            log_filter: "info".into(),
        }
    }
}

impl ServerConfig {
    /// Read a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }
}

/// Which contact store to run against.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Process-local store; contents are lost on exit.
    #[default]
    Memory,
    Sqlite {
        path: PathBuf,
        #[serde(default = "default_max_retries")]
        max_retries: u32,
        #[serde(default = "default_busy_backoff_ms")]
        busy_backoff_ms: u64,
    },
}

fn default_max_retries() -> u32 {
    RetryPolicy::default().max_retries
}

fn default_busy_backoff_ms() -> u64 {
    RetryPolicy::default().backoff.as_millis() as u64
}

impl StoreConfig {
    /// SQLite store at `path` with default retry settings.
    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self::Sqlite {
            path: path.into(),
            max_retries: default_max_retries(),
            busy_backoff_ms: default_busy_backoff_ms(),
        }
    }

    /// Open the configured backend.
    pub fn open(&self) -> ServerResult<ContactBackend> {
        match self {
            Self::Memory => {
                info!("using in-memory contact store");
                Ok(ContactBackend::Memory(InMemoryContactStore::new()))
            }
            Self::Sqlite {
                path,
                max_retries,
                busy_backoff_ms,
            } => {
                info!(path = %path.display(), "opening sqlite contact store");
                let store = SqliteContactStore::open(path)?.with_retry_policy(RetryPolicy {
                    max_retries: *max_retries,
                    backoff: Duration::from_millis(*busy_backoff_ms),
                });
                Ok(ContactBackend::Sqlite(store))
            }
        }
    }
}
