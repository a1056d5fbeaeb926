//! JSON report types written after every run.
//!
//! One file per engine and mode, so an MDBX run and an LMDB run of the same
//! workload can be put side by side with `bench-compare`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::{EngineKind, Mode};
use crate::rusage::RUsage;

pub const SCHEMA_VERSION: u32 = 1;

/// Top-level report written to a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Schema version for forward compatibility.
    pub schema_version: u32,
    pub metadata: RunMetadata,
    pub engine: EngineKind,
    pub mode: Mode,
    /// Workload and engine parameters the run used.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, serde_json::Value>,
    pub metrics: RunMetrics,
}

/// Metadata captured at the start of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    /// RFC 3339 timestamp of the run start.
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_commit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_dirty: Option<bool>,
    pub tool_version: String,
    pub hardware: HardwareInfo,
}

/// Hardware information for reproducibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareInfo {
    pub cpu: String,
    /// Number of logical cores.
    pub cores: usize,
    pub ram_gb: u64,
    pub os: String,
    pub arch: String,
}

/// Measurements of a single run.
///
/// Fields that do not apply to a mode are omitted from the JSON output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunMetrics {
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pairs_written: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys_scanned: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values_scanned: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_scanned: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookups_found: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookups_not_found: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size_bytes: Option<u64>,
    /// Counters accumulated while the workload ran.
    pub rusage: RUsage,
}

impl RunMetrics {
    /// Numeric metrics by name, in a stable order, for tabular comparison.
    pub fn named(&self) -> Vec<(&'static str, Option<u64>)> {
        vec![
            ("elapsed_ms", Some(self.elapsed_ms)),
            ("pairs_written", self.pairs_written),
            ("keys_scanned", self.keys_scanned),
            ("values_scanned", self.values_scanned),
            ("bytes_scanned", self.bytes_scanned),
            ("lookups_found", self.lookups_found),
            ("lookups_not_found", self.lookups_not_found),
            ("file_size_bytes", self.file_size_bytes),
            ("in_blocks", Some(self.rusage.in_blocks)),
            ("out_blocks", Some(self.rusage.out_blocks)),
            ("nvcsw", Some(self.rusage.nvcsw)),
            ("nivcsw", Some(self.rusage.nivcsw)),
        ]
    }
}
