//! Hit calibration app - finds a good progress point
//!
//! Worker threads run a small pipeline with three instrumented lines:
//! a steady per-item line, a per-batch line and a rare flush line.
//! On Ctrl+C (or after 5 seconds) the aggregator is dumped and the
//! steadiest lines are suggested as progress points.
//!
//! Run with: cargo run --example hit-calibration

use cozctl::hits::{hook, HitAggregator, Partitioning};
use cozctl::progress_hit;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let aggregator = Arc::new(HitAggregator::new(Partitioning::PerThread));
    hook::install(Arc::clone(&aggregator))?;

    println!("🔬 Hit Calibration App");
    println!("   4 workers, Ctrl+C or 5s to stop\n");

    let stop = Arc::new(AtomicBool::new(false));
    let workers: Vec<_> = (0..4)
        .map(|id| {
            let stop = Arc::clone(&stop);
            std::thread::Builder::new()
                .name(format!("worker-{id}"))
                .spawn(move || pipeline(&stop))
        })
        .collect::<Result<_, _>>()?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => println!("\nInterrupted"),
        () = tokio::time::sleep(Duration::from_secs(5)) => println!("\nTime limit reached"),
    }

    stop.store(true, Ordering::Relaxed);
    for worker in workers {
        let _ = worker.join();
    }

    // Shutdown sequence: dump once, after all workers have stopped
    let mut stdout = std::io::stdout().lock();
    aggregator.dump(&mut stdout)?;

    println!("\nSuggested progress points:");
    for candidate in aggregator.rank_candidates(3) {
        println!(
            "  {}:{} ({} hits, max interval {})",
            candidate.class_name, candidate.line_number, candidate.hits, candidate.max_interval
        );
    }
    Ok(())
}

fn pipeline(stop: &AtomicBool) {
    let mut item: u64 = 0;
    while !stop.load(Ordering::Relaxed) {
        for _ in 0..64 {
            progress_hit!(); // per item
            item = item.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        }
        progress_hit!(); // per batch
        if item % 97 == 0 {
            progress_hit!(); // rare flush
            std::thread::sleep(Duration::from_millis(1));
        }
        std::thread::sleep(Duration::from_micros(200));
    }
}
