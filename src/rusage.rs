//! Process resource-usage sampling.
//!
//! Block counters come from `getrusage(RUSAGE_SELF)` and count reads and
//! writes that actually reached the block layer. Page-cache hits are not
//! counted, which is exactly the disk traffic the engines are compared on.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RUsage {
    pub in_blocks: u64,
    pub out_blocks: u64,
    /// Voluntary context switches.
    pub nvcsw: u64,
    /// Involuntary context switches.
    pub nivcsw: u64,
}

impl RUsage {
    pub fn current() -> Result<Self> {
        let mut ru: libc::rusage = unsafe { std::mem::zeroed() };
        // SAFETY: `ru` is a valid, writable rusage struct for the call.
        let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut ru) };
        if rc != 0 {
            return Err(Error::Rusage(std::io::Error::last_os_error()));
        }
        Ok(Self {
            in_blocks: ru.ru_inblock.max(0) as u64,
            out_blocks: ru.ru_oublock.max(0) as u64,
            nvcsw: ru.ru_nvcsw.max(0) as u64,
            nivcsw: ru.ru_nivcsw.max(0) as u64,
        })
    }

    /// Counters accumulated since `earlier`.
    pub fn delta(&self, earlier: &RUsage) -> RUsage {
        RUsage {
            in_blocks: self.in_blocks.saturating_sub(earlier.in_blocks),
            out_blocks: self.out_blocks.saturating_sub(earlier.out_blocks),
            nvcsw: self.nvcsw.saturating_sub(earlier.nvcsw),
            nivcsw: self.nivcsw.saturating_sub(earlier.nivcsw),
        }
    }
}

fn log_sample() {
    match RUsage::current() {
        Ok(ru) => info!(
            "rusage inblocks={}K, outblocks={}K",
            ru.in_blocks / 1000,
            ru.out_blocks / 1000
        ),
        Err(e) => warn!(error = %e, "failed to sample rusage"),
    }
}

/// Background thread logging block I/O counters at a fixed interval.
///
/// The first sample is logged immediately. Dropping the monitor stops it.
pub struct ResourceMonitor {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ResourceMonitor {
    pub fn spawn(interval: Duration) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<()>();
        let handle = std::thread::Builder::new()
            .name("rusage-monitor".into())
            .spawn(move || loop {
                log_sample();
                match rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })
            .map_err(Error::Spawn)?;

        Ok(Self {
            stop: Some(tx),
            handle: Some(handle),
        })
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.stop.take() {
            _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            _ = handle.join();
        }
    }
}

impl Drop for ResourceMonitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
