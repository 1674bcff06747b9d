//! Turnstile benchmark driver.
//!
//! Usage: turnstile-bench [producers] [consumers] [items] [capacity]
//!                        [--baseline] [--pin] [--wait=<spin|yield|backoff|block>]
//!
//! Runs the lock-free queue, and with `--baseline` the mutex queue as well,
//! under the same load. Exits non-zero if any run loses or duplicates values.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use turnstile::BoundedMpmcQueue;
use turnstile_test_support::{print_summary, run_benchmark, BenchConfig, BenchReport, BlockingQueue, WaitKind};

struct Args {
    config: BenchConfig,
    wait: WaitKind,
    baseline: bool,
}

fn parse_args() -> Result<Args> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let baseline = args.iter().any(|a| a == "--baseline");
    let pin = args.iter().any(|a| a == "--pin");
    let wait = match args.iter().find_map(|a| a.strip_prefix("--wait=")) {
        Some(kind) => kind.parse::<WaitKind>()?,
        None => WaitKind::Yield,
    };
    if let Some(unknown) = args
        .iter()
        .filter(|a| a.starts_with('-'))
        .find(|a| !(*a == "--baseline" || *a == "--pin" || a.starts_with("--wait=")))
    {
        bail!("unknown flag: {}", unknown);
    }

    let positional: Vec<&str> = args
        .iter()
        .filter(|a| !a.starts_with('-'))
        .map(|s| s.as_str())
        .collect();
    let defaults = BenchConfig::default();
    let producers = match positional.first() {
        Some(s) => s.parse().with_context(|| format!("invalid producers: {}", s))?,
        None => defaults.producers,
    };
    let consumers = match positional.get(1) {
        Some(s) => s.parse().with_context(|| format!("invalid consumers: {}", s))?,
        None => defaults.consumers,
    };
    let items = match positional.get(2) {
        Some(s) => s.parse().with_context(|| format!("invalid items: {}", s))?,
        None => defaults.items_per_producer,
    };
    let capacity = match positional.get(3) {
        Some(s) => s.parse().with_context(|| format!("invalid capacity: {}", s))?,
        None => defaults.capacity,
    };

    let config = BenchConfig::new(producers, consumers, items)
        .with_capacity(capacity)
        .with_pinning(pin);
    config.validate()?;

    Ok(Args { config, wait, baseline })
}

fn print_comparison(reports: &[BenchReport]) {
    println!();
    println!("{:<24} {:>12} {:>14} {:>12}", "Queue", "Time (s)", "M ops/sec", "p99 deq ns");
    for report in reports {
        println!(
            "{:<24} {:>12.4} {:>14.4} {:>12}",
            report.name,
            report.elapsed.as_secs_f64(),
            report.mops(),
            report.dequeue_latency.p99
        );
    }
    if let [fast, base] = reports {
        if base.mops() > 0.0 {
            println!("Speedup: {:.2}x", fast.mops() / base.mops());
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let Args { config, wait, baseline } = parse_args()
        .context("usage: turnstile-bench [producers] [consumers] [items] [capacity] [--baseline] [--pin] [--wait=<spin|yield|backoff|block>]")?;

    println!(
        "turnstile-bench {}P/{}C, {} items/producer, capacity {}, wait {:?}",
        config.producers, config.consumers, config.items_per_producer, config.capacity, wait
    );

    let mut reports = Vec::new();

    let queue = Arc::new(BoundedMpmcQueue::<u64>::new(config.capacity)?);
    let report = run_benchmark(queue, &config, wait.build())?;
    print_summary(&report);
    reports.push(report);

    if baseline {
        let queue = Arc::new(BlockingQueue::<u64>::new(config.capacity)?);
        let report = run_benchmark(queue, &config, wait.build())?;
        print_summary(&report);
        reports.push(report);
    }

    print_comparison(&reports);

    if let Some(failed) = reports.iter().find(|r| !r.is_success()) {
        bail!("{} failed verification: {:?}", failed.name, failed.verification);
    }
    Ok(())
}
