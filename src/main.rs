//! mcache demo - drives a configured cache with a synthetic workload
//!
//! Builds the cache chosen by `MCACHE_*` environment variables, runs a
//! concurrent read/write workload with some short-lived entries, lets the
//! background purge task clear them, and prints a JSON report.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mcache::{
    expires_after, spawn_purge_task, CacheConfig, CacheStats, ConcurrentCache, Policy, NO_EXPIRY,
};

const WORKERS: usize = 4;
const OPS_PER_WORKER: usize = 2_000;
const KEY_SPACE: usize = 512;
const SHORT_TTL: Duration = Duration::from_millis(200);

/// Final report printed to stdout.
#[derive(Debug, Serialize)]
struct Report {
    policy: Policy,
    size: usize,
    len: usize,
    hit_rate: f64,
    stats: CacheStats,
}

/// Main entry point for the mcache demo.
///
/// # Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the configured cache
/// 4. Start the background overdue purge task
/// 5. Run the workload, wait for short-lived entries to be purged
/// 6. Print the JSON report
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mcache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CacheConfig::from_env();
    info!(
        "Configuration loaded: policy={}, size={}, shards={}, purge_interval={}ms",
        config.policy, config.size, config.shard_count, config.purge_interval_ms
    );

    let cache: Arc<dyn ConcurrentCache<String, String>> = config
        .build()
        .with_context(|| format!("failed to build {} cache", config.policy))?;

    let purge_handle = spawn_purge_task(cache.clone(), config.purge_interval());

    run_workload(cache.clone()).await?;
    info!("Workload finished with {} entries cached", cache.len());

    // Give short-lived entries time to expire and the purge task a pass
    tokio::time::sleep(SHORT_TTL + config.purge_interval() * 2).await;

    purge_handle.abort();
    warn!("Purge task aborted");

    let stats = cache.stats();
    let report = Report {
        policy: config.policy,
        size: config.size,
        len: cache.len(),
        hit_rate: stats.hit_rate(),
        stats,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

/// Spawns workers that mix writes and reads over a shared key space. Every
/// fifth write gets a short TTL.
async fn run_workload(cache: Arc<dyn ConcurrentCache<String, String>>) -> anyhow::Result<()> {
    let mut handles = Vec::with_capacity(WORKERS);

    for worker in 0..WORKERS {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..OPS_PER_WORKER {
                // Skewed access: low keys are hot
                let slot = (i * (worker + 1) * 7919) % KEY_SPACE;
                let slot = slot * slot / KEY_SPACE;
                let key = format!("key:{slot}");

                if cache.get(&key).is_none() {
                    let expiration_time = if i % 5 == 0 {
                        expires_after(SHORT_TTL)
                    } else {
                        NO_EXPIRY
                    };
                    cache.add(key, format!("value-{worker}-{i}"), expiration_time);
                }

                if i % 256 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        }));
    }

    for handle in handles {
        handle.await.context("workload task panicked")?;
    }
    Ok(())
}
