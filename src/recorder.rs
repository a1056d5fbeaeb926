//! Result recorder for saving run reports to JSON files.
//!
//! Files follow the schema in [`crate::schema`] and land in the results
//! directory (`results/` by default).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use sysinfo::System;
use tracing::info;

use crate::config::{EngineConfig, EngineKind, Mode, WorkloadConfig, GIB};
use crate::rusage::RUsage;
use crate::schema::{HardwareInfo, RunMetadata, RunMetrics, RunReport, SCHEMA_VERSION};
use crate::workload::{LookupStats, ScanSummary, WriteSummary};
use crate::{Error, Result};

/// Accumulates the outcome of one run and writes it as a [`RunReport`].
pub struct ResultRecorder {
    report: RunReport,
}

impl ResultRecorder {
    /// Captures metadata (hardware, git, timestamp) at construction time.
    pub fn new(engine: EngineKind, mode: Mode) -> Self {
        Self {
            report: RunReport {
                schema_version: SCHEMA_VERSION,
                metadata: RunMetadata {
                    timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                    git_commit: git(&["rev-parse", "--short", "HEAD"]),
                    git_branch: git(&["rev-parse", "--abbrev-ref", "HEAD"]),
                    git_dirty: git(&["status", "--porcelain"]).map(|out| !out.is_empty()),
                    tool_version: env!("CARGO_PKG_VERSION").to_string(),
                    hardware: capture_hardware(),
                },
                engine,
                mode,
                parameters: BTreeMap::new(),
                metrics: RunMetrics::default(),
            },
        }
    }

    /// Records the workload and engine configuration as report parameters.
    pub fn parameters(&mut self, workload: &WorkloadConfig, engine: &EngineConfig) -> Result<()> {
        for value in [serde_json::to_value(workload)?, serde_json::to_value(engine)?] {
            if let serde_json::Value::Object(map) = value {
                self.report.parameters.extend(map);
            }
        }
        Ok(())
    }

    pub fn record_write(&mut self, summary: &WriteSummary, rusage: RUsage) {
        self.report.metrics = RunMetrics {
            elapsed_ms: summary.elapsed.as_millis() as u64,
            pairs_written: Some(summary.pairs),
            file_size_bytes: Some(summary.file_size),
            rusage,
            ..Default::default()
        };
    }

    pub fn record_scan(&mut self, summary: &ScanSummary, rusage: RUsage) {
        self.report.metrics = RunMetrics {
            elapsed_ms: summary.elapsed.as_millis() as u64,
            keys_scanned: Some(summary.stats.keys),
            values_scanned: Some(summary.stats.values),
            bytes_scanned: Some(summary.stats.bytes),
            rusage,
            ..Default::default()
        };
    }

    pub fn record_lookup(
        &mut self,
        stats: &LookupStats,
        elapsed: std::time::Duration,
        rusage: RUsage,
    ) {
        self.report.metrics = RunMetrics {
            elapsed_ms: elapsed.as_millis() as u64,
            lookups_found: Some(stats.found),
            lookups_not_found: Some(stats.not_found),
            rusage,
            ..Default::default()
        };
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    /// Writes the report into `dir`, creating it if needed.
    ///
    /// File naming: `<engine>-<mode>-<timestamp>-<commit>.json`
    pub fn save(self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        let meta = &self.report.metadata;
        let commit = meta.git_commit.as_deref().unwrap_or("unknown");
        let ts = meta.timestamp.replace(':', "-");
        let filename = format!(
            "{}-{}-{}-{}.json",
            self.report.engine.label(),
            self.report.mode.label(),
            ts,
            commit
        );

        std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        let path = dir.join(filename);
        let json = serde_json::to_string_pretty(&self.report)?;
        std::fs::write(&path, json).map_err(|e| Error::io(&path, e))?;

        info!("results saved to {}", path.display());
        Ok(path)
    }
}

fn git(args: &[&str]) -> Option<String> {
    std::process::Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
}

fn capture_hardware() -> HardwareInfo {
    let mut sys = System::new();
    sys.refresh_cpu();
    sys.refresh_memory();
    HardwareInfo {
        cpu: sys
            .cpus()
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .unwrap_or_default(),
        cores: std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(0),
        ram_gb: sys.total_memory() / GIB as u64,
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
    }
}
