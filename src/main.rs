//! Pilot Cache - session driver
//!
//! Reads commands from stdin and applies them to a cache context backed by a
//! JSON file store.

use std::sync::Arc;

use anyhow::Context as _;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pilot_cache::cache::StaticDocument;
use pilot_cache::session::{execute, Command};
use pilot_cache::{CacheContext, Config, FileStore, TokioScheduler};

/// Main entry point for the cache session.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the file store
/// 4. Create the cache context on a tokio scheduler
/// 5. Start the memo cleanup timer
/// 6. Process stdin commands until EOF, `quit`, SIGINT or SIGTERM
/// 7. Flush the write queue before exiting
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pilot_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting Pilot Cache session");

    let config = Config::from_env();
    info!(
        "Configuration loaded: flush_delay={}ms, memo_ttl={}ms, cleanup_interval={}ms, store={}",
        config.flush_delay_ms, config.memo_ttl_ms, config.cleanup_interval_ms, config.store_path
    );

    let store = FileStore::open(&config.store_path, Some(config.store_quota_bytes))
        .with_context(|| format!("opening store {}", config.store_path))?;
    let scheduler = TokioScheduler::new().context("creating scheduler")?;

    let ctx = CacheContext::new(
        config,
        StaticDocument::<String>::new(),
        Arc::new(store),
        Arc::new(scheduler),
    );
    ctx.start_default_auto_cleanup();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    info!("Input closed");
                    break;
                };

                match Command::parse(&line) {
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(command)) => match execute(&ctx, &command) {
                        Ok(reply) => println!("{}", reply),
                        Err(e) => println!("error: {}", e),
                    },
                    Ok(None) => {}
                    Err(e) => println!("error: {}", e),
                }
            }
        }
    }

    let report = ctx.shutdown();
    if !report.failed.is_empty() {
        warn!("Unsaved keys at shutdown: {:?}", report.failed);
    }
    info!("Session shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
