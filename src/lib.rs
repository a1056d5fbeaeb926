//! Bulk-insert and scan workloads that reproduce the disk-I/O behavior of two
//! embedded key-value engines, MDBX and LMDB, on large duplicate-heavy
//! datasets.
//!
//! The storage logic belongs entirely to the engines. This crate generates the
//! data, drives the transactions and cursors, samples `getrusage` counters and
//! records the results so two runs can be compared.

pub mod batch;
pub mod command;
pub mod config;
pub mod engine;
mod error;
pub mod recorder;
pub mod rusage;
pub mod schema;
pub mod workload;

pub use error::{Error, Result};
