//! agecache demo - drives a cache with a synthetic workload
//!
//! Reads the cache configuration from the environment, runs a burst of sets
//! and gets once per second and logs the statistics delta of each round.

use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agecache::{Cache, Config, Stats};

/// Operations issued per round
const OPS_PER_ROUND: u64 = 500;

/// Main entry point for the demo.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache (starting the sweeper for active expiration)
/// 4. Run workload rounds until `DEMO_ROUNDS` is reached or Ctrl+C
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agecache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting agecache demo");

    let config = Config::<String, u64>::from_env()
        .on_eviction(|key, _| debug!(%key, "evicted"))
        .on_expiration(|key, _| debug!(%key, "expired"));
    info!(?config, "Configuration loaded");

    let rounds: u64 = std::env::var("DEMO_ROUNDS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(5);
    let key_space = (config.capacity as u64).saturating_mul(2).max(1);

    let cache = Cache::new(config).context("failed to build cache")?;

    tokio::select! {
        result = run_workload(&cache, rounds, key_space) => result?,
        _ = signal::ctrl_c() => info!("Received Ctrl+C, stopping workload"),
    }

    cache.stop_sweeper();
    info!(final_stats = %serde_json::to_string(&cache.stats())?, "Demo complete");
    Ok(())
}

async fn run_workload(
    cache: &Cache<String, u64>,
    rounds: u64,
    key_space: u64,
) -> anyhow::Result<()> {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut previous = Stats::default();

    for round in 0..rounds {
        ticker.tick().await;

        for op in 0..OPS_PER_ROUND {
            let key = format!("key-{}", (round * OPS_PER_ROUND + op * 7) % key_space);
            if op % 3 == 0 {
                cache.set(key, op);
            } else {
                cache.get(&key);
            }
        }

        let current = cache.stats();
        let delta = current.delta(&previous);
        previous = current;

        info!(
            round,
            hit_rate = delta.hit_rate(),
            stats = %serde_json::to_string(&delta)?,
            "Workload round complete"
        );
    }

    Ok(())
}
