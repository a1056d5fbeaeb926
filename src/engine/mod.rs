//! The two engines under test, behind the narrow interface the workloads need.

#[cfg(feature = "lmdb")]
mod lmdb_engine;
#[cfg(feature = "mdbx")]
mod mdbx_engine;

#[cfg(feature = "lmdb")]
pub use lmdb_engine::LmdbEngine;
#[cfg(feature = "mdbx")]
pub use mdbx_engine::MdbxEngine;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::batch::Pair;
use crate::config::{EngineConfig, PutMode};
use crate::{Error, Result};

/// An embedded key-value engine the workloads can be pointed at.
pub trait Engine: Sync + Send {
    /// Creates the data directory if needed, applies `config` and creates the
    /// table named by [`EngineConfig::table`].
    fn open(config: &EngineConfig) -> Result<Self>
    where
        Self: Sized;

    fn config(&self) -> &EngineConfig;

    /// Inserts all pairs through one cursor inside one write transaction.
    /// Nothing is committed if any put fails.
    fn insert_batch(&self, pairs: &[Pair], mode: PutMode) -> Result<()>;

    /// Runs `f` with a cursor over a single read transaction that lives for
    /// the whole call.
    fn with_read_cursor<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn PointLookup) -> Result<T>;

    /// Walks the whole table forward in one read transaction.
    fn scan(&self) -> Result<ScanStats>;

    fn data_file(&self) -> PathBuf {
        self.config().data_file()
    }

    fn data_file_size(&self) -> Result<u64> {
        let path = self.data_file();
        std::fs::metadata(&path)
            .map(|m| m.len())
            .map_err(|e| Error::io(path, e))
    }
}

/// Cursor positioning used by the `read` workload.
///
/// Both methods return `Ok(false)` when the engine reports "not found"; any
/// other engine error is returned as is.
pub trait PointLookup {
    fn set(&mut self, key: &[u8]) -> Result<bool>;

    fn get_both_range(&mut self, key: &[u8], value: &[u8]) -> Result<bool>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub keys: u64,
    pub values: u64,
    /// Sum of key and value lengths over every visited value.
    pub bytes: u64,
}

impl ScanStats {
    pub(crate) fn first_value(&mut self, key_len: usize, value_len: usize) {
        self.keys += 1;
        self.dup_value(key_len, value_len);
    }

    pub(crate) fn dup_value(&mut self, key_len: usize, value_len: usize) {
        self.values += 1;
        self.bytes += (key_len + value_len) as u64;
    }
}

impl std::fmt::Display for ScanStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "keys: {}, values: {}, bytes: {}",
            self.keys, self.values, self.bytes
        )
    }
}
