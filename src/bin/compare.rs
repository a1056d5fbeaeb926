//! Run report comparison tool.
//!
//! Compares two JSON run reports, typically the same workload against MDBX
//! and LMDB, and prints a table of metric deltas.
//!
//! Usage: `cargo run --bin bench-compare -- <baseline.json> <candidate.json>`

use inblocks_bench::schema::RunReport;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <baseline.json> <candidate.json>", args[0]);
        std::process::exit(1);
    }

    let baseline = load_report(&args[1]);
    let candidate = load_report(&args[2]);

    eprintln!(
        "Baseline: {} ({} {}, {})",
        args[1],
        baseline.engine.label(),
        baseline.mode.label(),
        baseline.metadata.timestamp
    );
    eprintln!(
        "Candidate: {} ({} {}, {})",
        args[2],
        candidate.engine.label(),
        candidate.mode.label(),
        candidate.metadata.timestamp
    );
    if baseline.mode != candidate.mode {
        eprintln!("warning: comparing different modes");
    }
    eprintln!();

    println!(
        "{:<20} | {:>16} | {:>16} | {:>10}",
        "Metric", "Baseline", "Candidate", "Delta"
    );
    println!("{}", "-".repeat(72));

    let base = baseline.metrics.named();
    let cand = candidate.metrics.named();
    let mut compared = 0u32;
    for ((name, b), (_, c)) in base.into_iter().zip(cand) {
        if let (Some(b), Some(c)) = (b, c) {
            compared += 1;
            println!(
                "{:<20} | {:>16} | {:>16} | {:>10}",
                name,
                format_num(b),
                format_num(c),
                format_delta(b, c),
            );
        }
    }

    println!("{}", "-".repeat(72));
    println!("Compared: {} metrics", compared);
}

fn load_report(path: &str) -> RunReport {
    let contents = std::fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading {}: {}", path, e);
        std::process::exit(1);
    });
    serde_json::from_str(&contents).unwrap_or_else(|e| {
        eprintln!("Error parsing {}: {}", path, e);
        std::process::exit(1);
    })
}

fn format_delta(base: u64, cand: u64) -> String {
    if base == 0 {
        return if cand == 0 { "~same".into() } else { "new".into() };
    }
    let pct = (cand as f64 - base as f64) / base as f64 * 100.0;
    format!("{:+.1}%", pct)
}

fn format_num(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}
