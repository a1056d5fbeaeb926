//! Command line, engine and workload configuration.
//!
//! Every flag defaults to the parameters of the canonical reproduction run:
//! 100 batches of 1 000 keys, 20-byte keys, 32 KiB values, a 1 TiB map and
//! 4 KiB pages.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const KIB: usize = 1024;
pub const MIB: usize = 1024 * KIB;
pub const GIB: usize = 1024 * MIB;
pub const TIB: usize = 1024 * GIB;

pub const DEFAULT_BATCHES: usize = 100;
pub const DEFAULT_KEYS_PER_BATCH: usize = 1_000;
pub const DEFAULT_KEY_LEN: usize = 20;
pub const DEFAULT_VALUE_SIZE: usize = 32 * KIB;
pub const DEFAULT_MAP_SIZE: usize = TIB;
pub const DEFAULT_GROWTH_STEP: usize = 512 * MIB;
pub const DEFAULT_PAGE_SIZE: usize = 4 * KIB;
pub const DEFAULT_MAX_DBS: u32 = 100;
pub const DEFAULT_MAX_READERS: u32 = 100;
pub const DEFAULT_RP_AUGMENT_LIMIT: u64 = 32 * 1024 * 1024;
pub const DEFAULT_MONITOR_INTERVAL_SECS: u64 = 5;
/// `MDB_MAXKEYSIZE` of the bundled LMDB build.
pub const LMDB_MAX_KEY_SIZE: usize = 511;

pub const PLAIN_TABLE: &str = "PLAIN-CST2";
pub const DUPSORT_TABLE: &str = "PLAIN-CST2-DUPSORT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Mdbx,
    Lmdb,
}

impl EngineKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Mdbx => "mdbx",
            Self::Lmdb => "lmdb",
        }
    }

    /// Directory holding the engine's files, relative to the data root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Mdbx => "data_mdbx",
            Self::Lmdb => "data_lmdb",
        }
    }

    /// Name of the main data file the engine creates inside its directory.
    pub fn data_file_name(&self) -> &'static str {
        match self {
            Self::Mdbx => "mdbx.dat",
            Self::Lmdb => "data.mdb",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Point lookups driven by `set` / `getBothRange` lines on stdin.
    Read,
    /// Batched bulk insert.
    Write,
    /// Full forward scan, including duplicate sub-scans.
    Scan,
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Scan => "scan",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyOrder {
    Sequential,
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PutMode {
    Upsert,
    Append,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "inblocks-bench",
    version,
    about = "Reproduce and compare MDBX / LMDB disk I/O under bulk inserts and scans",
    after_help = "Without ENGINE and MODE the full scenario runs: write then scan, for mdbx and then lmdb."
)]
pub struct Args {
    /// Engine to drive.
    #[arg(value_enum, requires = "mode")]
    pub engine: Option<EngineKind>,

    /// Workload to run against the engine.
    #[arg(value_enum)]
    pub mode: Option<Mode>,

    /// Directory under which `data_mdbx/` and `data_lmdb/` are created.
    #[arg(long, default_value = ".", env = "INBLOCKS_DATA_ROOT")]
    pub data_root: PathBuf,

    #[arg(long, default_value_t = DEFAULT_BATCHES)]
    pub batches: usize,

    #[arg(long, default_value_t = DEFAULT_KEYS_PER_BATCH)]
    pub keys_per_batch: usize,

    #[arg(long, default_value_t = DEFAULT_KEY_LEN)]
    pub key_len: usize,

    #[arg(long, default_value_t = DEFAULT_VALUE_SIZE)]
    pub value_size: usize,

    /// Values stored per key. Anything above 1 switches the table to sorted duplicates.
    #[arg(long, default_value_t = 1)]
    pub dups: usize,

    #[arg(long, value_enum, default_value_t = KeyOrder::Sequential)]
    pub key_order: KeyOrder,

    #[arg(long, value_enum, default_value_t = PutMode::Upsert)]
    pub put_mode: PutMode,

    /// Seed for random key generation.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Concurrent read transactions used by `scan`.
    #[arg(long, default_value_t = 1)]
    pub readers: usize,

    /// Upper bound of the memory map in bytes.
    #[arg(long, default_value_t = DEFAULT_MAP_SIZE)]
    pub map_size: usize,

    /// MDBX geometry growth step in bytes.
    #[arg(long, default_value_t = DEFAULT_GROWTH_STEP)]
    pub growth_step: usize,

    /// MDBX page size in bytes.
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    /// Open MDBX in its default (non-durable) sync mode.
    #[arg(long)]
    pub no_durable: bool,

    #[arg(
        long,
        default_value_t = DEFAULT_MONITOR_INTERVAL_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub monitor_interval_secs: u64,

    /// Where JSON run reports are written.
    #[arg(long, default_value = "results")]
    pub results_dir: PathBuf,

    /// Skip writing the JSON run report.
    #[arg(long)]
    pub no_report: bool,
}

impl Args {
    pub fn workload(&self) -> WorkloadConfig {
        WorkloadConfig {
            batches: self.batches,
            keys_per_batch: self.keys_per_batch,
            key_len: self.key_len,
            value_size: self.value_size,
            dups: self.dups,
            key_order: self.key_order,
            put_mode: self.put_mode,
            seed: self.seed,
            readers: self.readers,
        }
    }

    pub fn engine_config(&self, kind: EngineKind) -> EngineConfig {
        EngineConfig {
            kind,
            data_dir: self.data_root.join(kind.dir_name()),
            map_size: self.map_size,
            growth_step: self.growth_step,
            page_size: self.page_size,
            max_dbs: DEFAULT_MAX_DBS,
            max_readers: DEFAULT_MAX_READERS,
            rp_augment_limit: DEFAULT_RP_AUGMENT_LIMIT,
            durable: !self.no_durable,
            no_readahead: true,
            dup_sort: self.dups > 1,
        }
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub kind: EngineKind,
    pub data_dir: PathBuf,
    pub map_size: usize,
    pub growth_step: usize,
    pub page_size: usize,
    pub max_dbs: u32,
    pub max_readers: u32,
    pub rp_augment_limit: u64,
    pub durable: bool,
    pub no_readahead: bool,
    pub dup_sort: bool,
}

impl EngineConfig {
    /// Defaults of the canonical run, rooted at `data_dir`.
    pub fn new(kind: EngineKind, data_dir: impl AsRef<Path>) -> Self {
        Self {
            kind,
            data_dir: data_dir.as_ref().to_path_buf(),
            map_size: DEFAULT_MAP_SIZE,
            growth_step: DEFAULT_GROWTH_STEP,
            page_size: DEFAULT_PAGE_SIZE,
            max_dbs: DEFAULT_MAX_DBS,
            max_readers: DEFAULT_MAX_READERS,
            rp_augment_limit: DEFAULT_RP_AUGMENT_LIMIT,
            durable: true,
            no_readahead: true,
            dup_sort: false,
        }
    }

    pub fn table(&self) -> &'static str {
        if self.dup_sort {
            DUPSORT_TABLE
        } else {
            PLAIN_TABLE
        }
    }

    pub fn data_file(&self) -> PathBuf {
        self.data_dir.join(self.kind.data_file_name())
    }

    /// Largest key the engine accepts. Values in a sorted-duplicate table are
    /// stored like keys and share the same bound.
    ///
    /// LMDB is compiled with a fixed 511-byte limit. MDBX allows roughly half
    /// a page, minus page and node headers; this stays a little below it.
    pub fn max_key_size(&self) -> usize {
        match self.kind {
            EngineKind::Lmdb => LMDB_MAX_KEY_SIZE,
            EngineKind::Mdbx => (self.page_size / 2).saturating_sub(64),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.map_size == 0 {
            return Err(Error::InvalidConfig("map size must be positive".into()));
        }
        if !self.page_size.is_power_of_two() || !(256..=65536).contains(&self.page_size) {
            return Err(Error::InvalidConfig(format!(
                "page size {} must be a power of two between 256 and 65536",
                self.page_size
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadConfig {
    pub batches: usize,
    pub keys_per_batch: usize,
    pub key_len: usize,
    pub value_size: usize,
    pub dups: usize,
    pub key_order: KeyOrder,
    pub put_mode: PutMode,
    pub seed: u64,
    pub readers: usize,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            batches: DEFAULT_BATCHES,
            keys_per_batch: DEFAULT_KEYS_PER_BATCH,
            key_len: DEFAULT_KEY_LEN,
            value_size: DEFAULT_VALUE_SIZE,
            dups: 1,
            key_order: KeyOrder::Sequential,
            put_mode: PutMode::Upsert,
            seed: 0,
            readers: 1,
        }
    }
}

impl WorkloadConfig {
    pub fn total_keys(&self) -> u64 {
        (self.batches * self.keys_per_batch) as u64
    }

    pub fn total_pairs(&self) -> u64 {
        self.total_keys() * self.dups as u64
    }

    pub fn validate(&self, engine: &EngineConfig) -> Result<()> {
        if self.keys_per_batch == 0 {
            return Err(Error::InvalidConfig("keys per batch must be positive".into()));
        }
        if self.key_len == 0 {
            return Err(Error::InvalidConfig("key length must be positive".into()));
        }
        if self.dups == 0 {
            return Err(Error::InvalidConfig("dups must be at least 1".into()));
        }
        if self.key_len > engine.max_key_size() {
            return Err(Error::InvalidConfig(format!(
                "{}-byte keys exceed the {} limit of {} bytes",
                self.key_len,
                engine.kind.label(),
                engine.max_key_size()
            )));
        }
        if self.dups > 1 {
            if self.value_size > engine.max_key_size() {
                return Err(Error::InvalidConfig(format!(
                    "{}-byte values exceed the {} limit of {} bytes for duplicate tables",
                    self.value_size,
                    engine.kind.label(),
                    engine.max_key_size()
                )));
            }
            // The dup index is written big-endian into the first value bytes.
            let distinct = self
                .value_size
                .checked_mul(8)
                .and_then(|bits| u32::try_from(bits).ok())
                .and_then(|bits| 1u64.checked_shl(bits));
            if distinct.is_some_and(|distinct| self.dups as u64 > distinct) {
                return Err(Error::InvalidConfig(format!(
                    "{} duplicates do not fit in {}-byte values",
                    self.dups, self.value_size
                )));
            }
        }
        if self.readers == 0 || self.readers > engine.max_readers as usize {
            return Err(Error::InvalidConfig(format!(
                "readers must be between 1 and {}",
                engine.max_readers
            )));
        }
        if self.key_order == KeyOrder::Random && self.put_mode == PutMode::Append {
            return Err(Error::InvalidConfig(
                "append mode needs monotonic keys, use --key-order sequential".into(),
            ));
        }
        // The batch id is stored in the first key byte, the counter in the rest.
        if self.key_order == KeyOrder::Sequential {
            if self.batches > 256 {
                return Err(Error::InvalidConfig(format!(
                    "at most 256 sequential batches are supported, got {}",
                    self.batches
                )));
            }
            if self.key_len < 2 {
                return Err(Error::InvalidConfig(
                    "sequential keys need at least 2 bytes".into(),
                ));
            }
            let room = u32::try_from(self.key_len - 1)
                .ok()
                .and_then(|bytes| 256usize.checked_pow(bytes));
            if room.is_some_and(|room| self.keys_per_batch >= room) {
                return Err(Error::InvalidConfig(format!(
                    "{} keys per batch overflow a {}-byte sequential key",
                    self.keys_per_batch, self.key_len
                )));
            }
        }
        Ok(())
    }
}
