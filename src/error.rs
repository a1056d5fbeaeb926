use std::path::PathBuf;

use crate::engine::ScanStats;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[cfg(feature = "mdbx")]
    #[error("mdbx: {0}")]
    Mdbx(#[from] libmdbx::Error),

    #[cfg(feature = "lmdb")]
    #[error("lmdb: {0}")]
    Lmdb(#[from] lmdb::Error),

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("concurrent scans disagree: reader {reader} saw ({got}), reader 0 saw ({expected})")]
    ScanMismatch {
        reader: usize,
        expected: ScanStats,
        got: ScanStats,
    },

    #[error("{0} support is not enabled in this build, rebuild with --features `{0}`")]
    EngineDisabled(&'static str),

    #[error("getrusage failed: {0}")]
    Rusage(std::io::Error),

    #[error("failed to spawn thread: {0}")]
    Spawn(std::io::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
