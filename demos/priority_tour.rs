//! Walks through every priority, schedules a mix of work, and prints the
//! per-priority counters and latency summary.
//!
//! Run with `RUST_LOG=queue_centre=debug cargo run --example priority_tour`.

use queue_centre::prelude::*;
use queue_centre::telemetry::{JsonExporter, LogExporter, MetricsExporter};
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::builder().thread_name_prefix("tour").build()?;
    let registry = SchedulerRegistry::new(config)?;

    for priority in Priority::ALL {
        let scheduler = registry.async_scheduler(priority)?;
        let handles: Vec<_> = (0..10u64)
            .map(|i| scheduler.schedule(i, |i| (0..=i * 1_000).sum::<u64>()))
            .collect();
        for handle in handles {
            handle.join()?;
        }
        println!(
            "{:<10} {:<10} weight={}",
            priority.to_string(),
            scheduler.kind().to_string(),
            priority
                .weight_class()
                .map_or_else(|| "-".to_string(), |w| w.to_string())
        );
    }

    let ticker = registry.scheduler(Priority::Background)?;
    let ticks = ticker.schedule_periodic(0u32, Duration::ZERO, Duration::from_millis(25), |n| {
        println!("tick {}", n);
        n + 1
    });
    thread::sleep(Duration::from_millis(120));
    ticks.cancel();

    let urgent = registry.scheduler(Priority::Highest)?;
    let late = urgent.schedule_relative("late", Duration::from_millis(30), |s| s.to_uppercase());
    println!("delayed result: {}", late.join()?);

    println!();
    for (priority, count) in registry.counters() {
        println!("{:<10} {}", priority.to_string(), count);
    }

    let snapshot = registry.metrics().snapshot_all();
    LogExporter.export(&snapshot)?;
    JsonExporter::new(std::env::temp_dir().join("priority_tour.json")).export(&snapshot)?;

    Ok(())
}
