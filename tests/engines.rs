//! The same write, lookup and scan checks against both engines.

mod common;

use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};

use common::{engine_config, first_key, fresh, pair, tiny_workload};
use inblocks_bench::batch::{dup_value, Pair};
use inblocks_bench::config::{EngineConfig, EngineKind, KeyOrder, PutMode, WorkloadConfig};
use inblocks_bench::engine::{Engine, PointLookup, ScanStats};
use inblocks_bench::{workload, Error};

fn write_then_scan_counts_everything<E: Engine>(kind: EngineKind) {
    let (_dir, engine) = fresh::<E>(kind, false);
    let wl = tiny_workload();

    let summary = workload::write(&engine, &wl).unwrap();
    assert_eq!(summary.batches, 4);
    assert_eq!(summary.pairs, 200);
    assert!(summary.file_size > 0);

    let scan = workload::scan(&engine, 1).unwrap();
    assert_eq!(
        scan.stats,
        ScanStats {
            keys: 200,
            values: 200,
            bytes: 200 * (20 + 128),
        }
    );
}

fn duplicates_are_sub_scanned<E: Engine>(kind: EngineKind) {
    let (_dir, engine) = fresh::<E>(kind, true);
    let wl = WorkloadConfig { dups: 3, ..tiny_workload() };

    let summary = workload::write(&engine, &wl).unwrap();
    assert_eq!(summary.pairs, wl.total_pairs());

    let stats = workload::scan(&engine, 1).unwrap().stats;
    assert_eq!(stats.keys, 200);
    assert_eq!(stats.values, 600);
    assert_eq!(stats.bytes, 600 * (20 + 128));
}

fn rewriting_is_idempotent<E: Engine>(kind: EngineKind) {
    let (_dir, engine) = fresh::<E>(kind, true);
    let wl = WorkloadConfig { dups: 2, ..tiny_workload() };

    workload::write(&engine, &wl).unwrap();
    workload::write(&engine, &wl).unwrap();

    let stats = workload::scan(&engine, 1).unwrap().stats;
    assert_eq!(stats.keys, 200);
    assert_eq!(stats.values, 400);
}

fn append_mode_accepts_sequential_batches<E: Engine>(kind: EngineKind) {
    let (_dir, engine) = fresh::<E>(kind, true);
    let wl = WorkloadConfig {
        dups: 2,
        put_mode: PutMode::Append,
        ..tiny_workload()
    };

    workload::write(&engine, &wl).unwrap();
    assert_eq!(workload::scan(&engine, 1).unwrap().stats.values, 400);
}

fn append_out_of_order_is_fatal<E: Engine>(kind: EngineKind) {
    let (_dir, engine) = fresh::<E>(kind, false);
    engine
        .insert_batch(&[pair(&[5], &[0])], PutMode::Append)
        .unwrap();

    let err = engine
        .insert_batch(&[pair(&[6], &[0]), pair(&[1], &[0])], PutMode::Append)
        .unwrap_err();
    assert!(!matches!(err, Error::InvalidConfig(_)));

    // The failed batch was not committed.
    assert_eq!(workload::scan(&engine, 1).unwrap().stats.keys, 1);
}

fn random_keys_round_trip<E: Engine>(kind: EngineKind) {
    let (_dir, engine) = fresh::<E>(kind, false);
    let wl = WorkloadConfig {
        key_order: KeyOrder::Random,
        seed: 42,
        ..tiny_workload()
    };

    workload::write(&engine, &wl).unwrap();
    // 200 random 20-byte keys do not collide.
    assert_eq!(workload::scan(&engine, 1).unwrap().stats.keys, 200);
}

fn lookups_count_found_and_missing<E: Engine>(kind: EngineKind) {
    let (_dir, engine) = fresh::<E>(kind, true);
    let wl = WorkloadConfig { dups: 3, ..tiny_workload() };
    workload::write(&engine, &wl).unwrap();

    let key = hex::encode(first_key(1));
    let missing = hex::encode(first_key(9));
    let input = format!(
        "set {key}\n\
         set {missing}\n\
         getBothRange {key}, {dup1}\n\
         getBothRange {key}, {past_end}\n\
         getBothRange {missing}, 00\n\
         bogus line\n\
         set not-hex\n",
        dup1 = hex::encode(dup_value(1, 128)),
        past_end = hex::encode([0xff; 128]),
    );

    let stats = workload::lookup(&engine, Cursor::new(input)).unwrap();
    assert_eq!(stats.lines, 7);
    assert_eq!(stats.set, 2);
    assert_eq!(stats.get_both_range, 3);
    assert_eq!(stats.found, 2);
    assert_eq!(stats.not_found, 3);
    assert_eq!(stats.skipped, 2);
}

fn get_both_range_on_plain_table<E: Engine>(kind: EngineKind) {
    let (_dir, engine) = fresh::<E>(kind, false);
    engine
        .insert_batch(&[pair(b"k", &[0x10, 0x20])], PutMode::Upsert)
        .unwrap();

    let (below, equal, above) = engine
        .with_read_cursor(|cursor| {
            Ok((
                cursor.get_both_range(b"k", &[0x01])?,
                cursor.get_both_range(b"k", &[0x10, 0x20])?,
                cursor.get_both_range(b"k", &[0x11])?,
            ))
        })
        .unwrap();
    assert!(below);
    assert!(equal);
    assert!(!above);
}

fn concurrent_scans_agree<E: Engine>(kind: EngineKind) {
    let (_dir, engine) = fresh::<E>(kind, true);
    let wl = WorkloadConfig { dups: 2, ..tiny_workload() };
    workload::write(&engine, &wl).unwrap();

    let summary = workload::scan(&engine, 4).unwrap();
    assert_eq!(summary.readers, 4);
    assert_eq!(summary.stats.values, 400);
}

fn scan_readers_are_bounded<E: Engine>(kind: EngineKind) {
    let (_dir, engine) = fresh::<E>(kind, false);
    assert!(matches!(workload::scan(&engine, 0), Err(Error::InvalidConfig(_))));
    assert!(matches!(workload::scan(&engine, 101), Err(Error::InvalidConfig(_))));
}

fn empty_table_scans_to_zero<E: Engine>(kind: EngineKind) {
    let (_dir, engine) = fresh::<E>(kind, true);
    assert_eq!(workload::scan(&engine, 1).unwrap().stats, ScanStats::default());
}

fn data_survives_reopen<E: Engine>(kind: EngineKind) {
    let dir = tempfile::tempdir().unwrap();
    let config = engine_config(kind, dir.path(), false);
    {
        let engine = E::open(&config).unwrap();
        workload::write(&engine, &tiny_workload()).unwrap();
    }
    let engine = E::open(&config).unwrap();
    assert_eq!(engine.data_file(), config.data_file());
    assert!(engine.data_file_size().unwrap() > 0);
    assert_eq!(workload::scan(&engine, 1).unwrap().stats.keys, 200);
}

fn invalid_workload_is_rejected_before_writing<E: Engine>(kind: EngineKind) {
    let (_dir, engine) = fresh::<E>(kind, false);
    let wl = WorkloadConfig {
        key_order: KeyOrder::Random,
        put_mode: PutMode::Append,
        ..tiny_workload()
    };
    assert!(matches!(workload::write(&engine, &wl), Err(Error::InvalidConfig(_))));
    assert_eq!(workload::scan(&engine, 1).unwrap().stats.keys, 0);
}

fn oversized_duplicates_are_rejected_before_writing<E: Engine>(kind: EngineKind) {
    let (_dir, engine) = fresh::<E>(kind, true);
    let wl = WorkloadConfig {
        dups: 3,
        value_size: 32 * 1024,
        ..tiny_workload()
    };
    assert!(matches!(workload::write(&engine, &wl), Err(Error::InvalidConfig(_))));
    assert_eq!(workload::scan(&engine, 1).unwrap().stats.values, 0);
}

fn colliding_duplicates_are_rejected_before_writing<E: Engine>(kind: EngineKind) {
    let (_dir, engine) = fresh::<E>(kind, true);
    for put_mode in [PutMode::Upsert, PutMode::Append] {
        let wl = WorkloadConfig {
            dups: 3,
            value_size: 0,
            put_mode,
            ..tiny_workload()
        };
        assert!(matches!(workload::write(&engine, &wl), Err(Error::InvalidConfig(_))));
    }
    assert_eq!(workload::scan(&engine, 1).unwrap().stats.values, 0);
}

/// Reports the same value count on every scan but a different byte count
/// from the second scan on.
struct DriftingEngine {
    config: EngineConfig,
    scans: AtomicU64,
}

impl Engine for DriftingEngine {
    fn open(config: &EngineConfig) -> inblocks_bench::Result<Self> {
        Ok(Self {
            config: config.clone(),
            scans: AtomicU64::new(0),
        })
    }

    fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn insert_batch(&self, _pairs: &[Pair], _mode: PutMode) -> inblocks_bench::Result<()> {
        Ok(())
    }

    fn with_read_cursor<T, F>(&self, _f: F) -> inblocks_bench::Result<T>
    where
        F: FnOnce(&mut dyn PointLookup) -> inblocks_bench::Result<T>,
    {
        Err(Error::EngineDisabled("drifting"))
    }

    fn scan(&self) -> inblocks_bench::Result<ScanStats> {
        let n = self.scans.fetch_add(1, Ordering::SeqCst);
        Ok(ScanStats {
            keys: 10,
            values: 10,
            bytes: 100 + n.min(1),
        })
    }
}

#[test]
fn scans_disagreeing_on_any_count_are_fatal() {
    let engine = DriftingEngine::open(&EngineConfig::new(EngineKind::Mdbx, "unused")).unwrap();
    match workload::scan(&engine, 2) {
        Err(Error::ScanMismatch { reader, expected, got }) => {
            assert_eq!(reader, 1);
            assert_eq!(expected.values, got.values);
            assert_ne!(expected.bytes, got.bytes);
        }
        other => panic!("expected ScanMismatch, got {other:?}"),
    }
}

macro_rules! engine_suite {
    ($name:ident, $feature:literal, $engine:ty, $kind:expr) => {
        #[cfg(feature = $feature)]
        mod $name {
            use super::*;

            type E = $engine;
            const KIND: EngineKind = $kind;

            #[test]
            fn write_then_scan() {
                write_then_scan_counts_everything::<E>(KIND);
            }

            #[test]
            fn duplicates() {
                duplicates_are_sub_scanned::<E>(KIND);
            }

            #[test]
            fn rewrite() {
                rewriting_is_idempotent::<E>(KIND);
            }

            #[test]
            fn append() {
                append_mode_accepts_sequential_batches::<E>(KIND);
            }

            #[test]
            fn append_out_of_order() {
                append_out_of_order_is_fatal::<E>(KIND);
            }

            #[test]
            fn random_keys() {
                random_keys_round_trip::<E>(KIND);
            }

            #[test]
            fn lookups() {
                lookups_count_found_and_missing::<E>(KIND);
            }

            #[test]
            fn get_both_range_plain() {
                get_both_range_on_plain_table::<E>(KIND);
            }

            #[test]
            fn concurrent_scans() {
                concurrent_scans_agree::<E>(KIND);
            }

            #[test]
            fn scan_reader_bounds() {
                scan_readers_are_bounded::<E>(KIND);
            }

            #[test]
            fn empty_scan() {
                empty_table_scans_to_zero::<E>(KIND);
            }

            #[test]
            fn reopen() {
                data_survives_reopen::<E>(KIND);
            }

            #[test]
            fn invalid_workload() {
                invalid_workload_is_rejected_before_writing::<E>(KIND);
            }

            #[test]
            fn oversized_duplicates() {
                oversized_duplicates_are_rejected_before_writing::<E>(KIND);
            }

            #[test]
            fn colliding_duplicates() {
                colliding_duplicates_are_rejected_before_writing::<E>(KIND);
            }
        }
    };
}

engine_suite!(mdbx, "mdbx", inblocks_bench::engine::MdbxEngine, EngineKind::Mdbx);
engine_suite!(lmdb, "lmdb", inblocks_bench::engine::LmdbEngine, EngineKind::Lmdb);
