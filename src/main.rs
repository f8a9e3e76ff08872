//! File Memo - watch files through a memoizing cache
//!
//! Loads each file given on the command line as a list of lines, re-reads
//! them on a fixed poll interval, and logs whether each read was served from
//! the cache or required a reload.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use file_memo::{
    spawn_sweep_task, CacheConfig, ContentHash, FileCache, ModifiedTime, SharedFileCache,
    StalenessPolicy,
};

type Lines = Vec<String>;

/// Main entry point.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the shared cache with the configured staleness policy
/// 4. Start background sweep task
/// 5. Poll the files until Ctrl+C/SIGTERM, then print statistics
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "file_memo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let paths: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    if paths.is_empty() {
        bail!("usage: file_memo <file>...");
    }

    let config = CacheConfig::from_env();
    info!(
        "Configuration loaded: max_retained={}, retain_ttl={}s, sweep_interval={}s, poll_interval={}s, content_hash={}",
        config.max_retained,
        config.retain_ttl,
        config.sweep_interval,
        config.poll_interval,
        config.content_hash
    );

    if config.content_hash {
        let cache = FileCache::from_config(read_lines, ContentHash::new(), &config);
        run(SharedFileCache::new(cache), &paths, &config).await
    } else {
        let cache = FileCache::from_config(read_lines, ModifiedTime, &config);
        run(SharedFileCache::new(cache), &paths, &config).await
    }
}

fn read_lines(path: &Path) -> anyhow::Result<Lines> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(text.lines().map(str::to_string).collect())
}

async fn run<P>(
    cache: SharedFileCache<Lines, P>,
    paths: &[PathBuf],
    config: &CacheConfig,
) -> anyhow::Result<()>
where
    P: StalenessPolicy + 'static,
{
    let sweep_handle = spawn_sweep_task(cache.clone(), config.sweep_interval);
    info!("Background sweep task started");

    let poll = poll_loop(cache.clone(), paths.to_vec(), config.poll_interval);
    tokio::select! {
        _ = poll => {}
        _ = shutdown_signal() => {}
    }

    sweep_handle.abort();
    warn!("Sweep task aborted");

    let stats = cache.stats()?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    info!("Hit rate: {:.1}%", stats.hit_rate() * 100.0);
    Ok(())
}

/// Reads every path each interval, reporting reloads.
async fn poll_loop<P>(cache: SharedFileCache<Lines, P>, paths: Vec<PathBuf>, interval_secs: u64)
where
    P: StalenessPolicy + 'static,
{
    let mut last_seen: HashMap<PathBuf, Arc<Lines>> = HashMap::new();
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));

    loop {
        ticker.tick().await;

        for path in &paths {
            let worker = cache.clone();
            let target = path.clone();
            let result = tokio::task::spawn_blocking(move || worker.get_or_load(&target)).await;

            match result {
                Ok(Ok(lines)) => {
                    let reloaded = last_seen
                        .get(path)
                        .map_or(true, |previous| !Arc::ptr_eq(previous, &lines));
                    if reloaded {
                        info!("{}: loaded {} lines", path.display(), lines.len());
                    }
                    last_seen.insert(path.clone(), lines);
                }
                Ok(Err(e)) => {
                    // Keep polling: the file may come back
                    warn!("{}: {}", path.display(), e);
                    last_seen.remove(path);
                }
                Err(e) => warn!("{}: worker failed: {}", path.display(), e),
            }
        }
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}
