//! Store configuration, a thin builder over `sled::Config`
use super::error::StockError;
use sled::Db;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Environment variable that overrides the store location.
pub const STORE_PATH_ENV: &str = "ORDER_STORE_PATH";
pub const DEFAULT_STORE_PATH: &str = "database";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    path: PathBuf,
    temporary: bool,
    cache_capacity: Option<u64>,
    flush_every_ms: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_STORE_PATH),
            temporary: false,
            cache_capacity: None,
            flush_every_ms: Some(500),
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }
    /// Defaults, with the path taken from `ORDER_STORE_PATH` when set
    pub fn from_env() -> Self {
        match std::env::var_os(STORE_PATH_ENV) {
            Some(path) if !path.is_empty() => Self::new().set_path(path),
            _ => Self::new(),
        }
    }
    pub fn set_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }
    /// Temporary stores ignore the path and are removed when the last handle
    /// drops.
    pub fn set_temporary(mut self, temporary: bool) -> Self {
        self.temporary = temporary;
        self
    }
    pub fn set_cache_capacity(mut self, bytes: u64) -> Self {
        self.cache_capacity = Some(bytes);
        self
    }
    /// `None` disables background flushing, the caller then owns `flush`.
    pub fn set_flush_every_ms(mut self, every: Option<u64>) -> Self {
        self.flush_every_ms = every;
        self
    }
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the store. The returned handle is shared by the stock and
    /// sequence trees.
    pub fn open(&self) -> Result<Arc<Db>, StockError> {
        let mut config = sled::Config::new()
            .temporary(self.temporary)
            .flush_every_ms(self.flush_every_ms);
        // left unset, sled picks a fresh scratch directory per temporary store
        if !self.temporary {
            config = config.path(&self.path);
        }
        if let Some(bytes) = self.cache_capacity {
            config = config.cache_capacity(bytes);
        }

        let db = config.open()?;
        info!(path = %self.path.display(), temporary = self.temporary, "opened order store");

        Ok(Arc::new(db))
    }
}
