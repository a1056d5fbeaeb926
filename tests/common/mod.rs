//! Shared helpers: small engine configurations rooted in temp directories.

#![allow(dead_code)]

use std::path::Path;

use inblocks_bench::batch::Pair;
use inblocks_bench::config::{EngineConfig, EngineKind, WorkloadConfig, MIB};
use inblocks_bench::engine::Engine;
use tempfile::TempDir;

pub const TEST_MAP_SIZE: usize = 64 * MIB;

/// Engine configuration small enough for a test run.
pub fn engine_config(kind: EngineKind, root: &Path, dup_sort: bool) -> EngineConfig {
    let mut config = EngineConfig::new(kind, root.join(kind.dir_name()));
    config.map_size = TEST_MAP_SIZE;
    config.growth_step = MIB;
    config.durable = false;
    config.dup_sort = dup_sort;
    config
}

/// 4 batches of 50 keys with 128-byte values.
pub fn tiny_workload() -> WorkloadConfig {
    WorkloadConfig {
        batches: 4,
        keys_per_batch: 50,
        value_size: 128,
        ..Default::default()
    }
}

pub fn fresh<E: Engine>(kind: EngineKind, dup_sort: bool) -> (TempDir, E) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let engine = E::open(&engine_config(kind, dir.path(), dup_sort)).expect("failed to open engine");
    (dir, engine)
}

pub fn pair(key: &[u8], value: &[u8]) -> Pair {
    Pair {
        key: key.to_vec(),
        value: value.to_vec(),
    }
}

/// First sequential key of batch `batch` with the default 20-byte length.
pub fn first_key(batch: u8) -> Vec<u8> {
    let mut key = vec![0u8; 20];
    key[0] = batch;
    key[19] = 1;
    key
}
