//! Drives MDBX or LMDB through a bulk-insert, lookup or scan workload while
//! logging process block I/O.
//!
//! Usage:
//!   `inblocks-bench mdbx write`
//!   `inblocks-bench mdbx read < commands.txt`
//!   `inblocks-bench lmdb scan --readers 4`
//!   `inblocks-bench` (write then scan, for mdbx and then lmdb)

use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use inblocks_bench::config::{Args, EngineKind, Mode};
use inblocks_bench::engine::Engine;
use inblocks_bench::recorder::ResultRecorder;
use inblocks_bench::rusage::{RUsage, ResourceMonitor};
use inblocks_bench::{workload, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let monitor = match ResourceMonitor::spawn(args.monitor_interval()) {
        Ok(m) => m,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = match (args.engine, args.mode) {
        (Some(engine), Some(mode)) => run(&args, engine, mode),
        _ => run_scenario(&args),
    };
    monitor.stop();

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// The fixed sequential scenario used when no engine is named.
fn run_scenario(args: &Args) -> Result<()> {
    info!("no engine given, running write + scan for mdbx and lmdb");
    for engine in [EngineKind::Mdbx, EngineKind::Lmdb] {
        for mode in [Mode::Write, Mode::Scan] {
            run(args, engine, mode)?;
        }
    }
    Ok(())
}

fn run(args: &Args, engine: EngineKind, mode: Mode) -> Result<()> {
    info!("testing {} {}", engine.label(), mode.label());
    match engine {
        EngineKind::Mdbx => {
            #[cfg(feature = "mdbx")]
            {
                use inblocks_bench::engine::MdbxEngine;
                run_with::<MdbxEngine>(args, engine, mode)
            }
            #[cfg(not(feature = "mdbx"))]
            {
                Err(inblocks_bench::Error::EngineDisabled("mdbx"))
            }
        }
        EngineKind::Lmdb => {
            #[cfg(feature = "lmdb")]
            {
                use inblocks_bench::engine::LmdbEngine;
                run_with::<LmdbEngine>(args, engine, mode)
            }
            #[cfg(not(feature = "lmdb"))]
            {
                Err(inblocks_bench::Error::EngineDisabled("lmdb"))
            }
        }
    }
}

#[cfg_attr(not(any(feature = "mdbx", feature = "lmdb")), allow(dead_code))]
fn run_with<E: Engine>(args: &Args, kind: EngineKind, mode: Mode) -> Result<()> {
    let engine_config = args.engine_config(kind);
    let workload = args.workload();
    workload.validate(&engine_config)?;

    let engine = E::open(&engine_config)?;
    let mut recorder = ResultRecorder::new(kind, mode);
    recorder.parameters(&workload, &engine_config)?;

    let before = RUsage::current()?;
    match mode {
        Mode::Write => {
            let summary = workload::write(&engine, &workload)?;
            recorder.record_write(&summary, RUsage::current()?.delta(&before));
        }
        Mode::Scan => {
            let summary = workload::scan(&engine, workload.readers)?;
            recorder.record_scan(&summary, RUsage::current()?.delta(&before));
        }
        Mode::Read => {
            let start = Instant::now();
            let stats = workload::lookup(&engine, std::io::stdin().lock())?;
            recorder.record_lookup(&stats, start.elapsed(), RUsage::current()?.delta(&before));
        }
    }

    let rusage = recorder.report().metrics.rusage;
    info!(
        "run rusage: inblocks={}K, outblocks={}K, nvcsw={}, nivcsw={}",
        rusage.in_blocks / 1000,
        rusage.out_blocks / 1000,
        rusage.nvcsw,
        rusage.nivcsw
    );

    if !args.no_report {
        recorder.save(&args.results_dir)?;
    }
    Ok(())
}
