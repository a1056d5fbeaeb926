//! Writer and reader loops shared by both engines.

use std::io::BufRead;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::batch::{create_batch, sort_pairs};
use crate::command::{parse_line, Command, ParsedLine};
use crate::config::{PutMode, WorkloadConfig, GIB};
use crate::engine::{Engine, ScanStats};
use crate::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteSummary {
    pub batches: usize,
    pub pairs: u64,
    pub elapsed: Duration,
    pub file_size: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupStats {
    pub lines: u64,
    pub set: u64,
    pub get_both_range: u64,
    pub found: u64,
    pub not_found: u64,
    pub skipped: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSummary {
    pub readers: usize,
    /// Counts seen by one reader; every reader sees the same.
    pub stats: ScanStats,
    pub elapsed: Duration,
}

/// Inserts `workload.batches` batches, one write transaction each, logging
/// progress and the data file size before every batch.
pub fn write<E: Engine>(engine: &E, workload: &WorkloadConfig) -> Result<WriteSummary> {
    workload.validate(engine.config())?;

    info!("=== insert started");
    let start = Instant::now();
    let mut pairs = 0u64;
    for i in 0..workload.batches {
        let file_size = engine.data_file_size()?;
        info!(
            "=== insert progress: {}%, fileSize: {}Gb",
            i * 100 / workload.batches,
            file_size / GIB as u64
        );

        let mut batch = create_batch(i, workload);
        if workload.put_mode == PutMode::Append {
            sort_pairs(&mut batch);
        }
        engine.insert_batch(&batch, workload.put_mode)?;
        pairs += batch.len() as u64;
        debug!(batch = i, pairs = batch.len(), "batch committed");
    }

    let elapsed = start.elapsed();
    let file_size = engine.data_file_size()?;
    info!(
        "=== insert done: {} pairs in {:?}, fileSize: {}Gb",
        pairs,
        elapsed,
        file_size / GIB as u64
    );

    Ok(WriteSummary {
        batches: workload.batches,
        pairs,
        elapsed,
        file_size,
    })
}

/// Serves every command read from `input` through one read transaction.
pub fn lookup<E: Engine, R: BufRead>(engine: &E, input: R) -> Result<LookupStats> {
    let start = Instant::now();
    let stats = engine.with_read_cursor(|cursor| {
        let mut stats = LookupStats::default();
        for line in input.lines() {
            let line = line.map_err(|e| Error::io("<stdin>", e))?;
            stats.lines += 1;
            let hit = match parse_line(&line) {
                ParsedLine::Skip => {
                    stats.skipped += 1;
                    continue;
                }
                ParsedLine::Command(Command::Set { key }) => {
                    stats.set += 1;
                    cursor.set(&key)?
                }
                ParsedLine::Command(Command::GetBothRange { key, value }) => {
                    stats.get_both_range += 1;
                    cursor.get_both_range(&key, &value)?
                }
            };
            if hit {
                stats.found += 1;
            } else {
                stats.not_found += 1;
            }
        }
        Ok(stats)
    })?;

    info!("read loop took: {:?}", start.elapsed());
    info!(
        lines = stats.lines,
        found = stats.found,
        not_found = stats.not_found,
        skipped = stats.skipped,
        "lookups finished"
    );
    Ok(stats)
}

/// Runs `readers` full scans concurrently, each in its own read transaction.
pub fn scan<E: Engine>(engine: &E, readers: usize) -> Result<ScanSummary> {
    if readers == 0 || readers > engine.config().max_readers as usize {
        return Err(Error::InvalidConfig(format!(
            "readers must be between 1 and {}",
            engine.config().max_readers
        )));
    }

    info!(readers, "=== scan started");
    let start = Instant::now();
    let results = std::thread::scope(|s| -> Result<Vec<ScanStats>> {
        let mut handles = Vec::with_capacity(readers);
        for r in 0..readers {
            let handle = std::thread::Builder::new()
                .name(format!("scan-{r}"))
                .spawn_scoped(s, move || engine.scan())
                .map_err(Error::Spawn)?;
            handles.push(handle);
        }
        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(result) => result,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })?;
    let elapsed = start.elapsed();

    let stats = results[0];
    for (reader, other) in results.iter().enumerate().skip(1) {
        if *other != stats {
            return Err(Error::ScanMismatch {
                reader,
                expected: stats,
                got: *other,
            });
        }
    }

    info!("read loop took: {:?}", elapsed);
    info!("entries: {}", stats);
    Ok(ScanSummary {
        readers,
        stats,
        elapsed,
    })
}
