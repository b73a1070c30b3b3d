use std::process;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use simplemq::logging::init_logging;
use simplemq::signal::shutdown_signal;
use simplemq::{Config, Overrides, QueueService, QueueStore};

#[derive(Debug, Parser)]
#[command(name = "simplemq", version, about = "In-memory message queue over HTTP")]
struct Cli {
    /// Address to listen on, for instance 127.0.0.1:8080 (env SIMPLEMQ_ADDR)
    #[arg(long)]
    addr: Option<String>,

    /// Path to config TOML (env SIMPLEMQ_CONFIG)
    #[arg(short, long)]
    config: Option<String>,

    /// Maximum messages held per queue; 0 disables the limit
    #[arg(long)]
    max_queue_depth: Option<usize>,
}

#[tokio::main]
async fn main() {
    if let Err(e) = init_logging() {
        eprintln!("[WARN] Failed to initialise logging: {e}");
    }

    let cli = Cli::parse();
    let overrides = Overrides {
        addr: cli.addr,
        max_queue_depth: cli.max_queue_depth,
    };

    let config: Config = match Config::load(cli.config.as_deref(), overrides) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("[FATAL] Failed to load config: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        error!("{:#}", e);
        eprintln!("[FATAL] {e:#}");
        process::exit(1);
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let store = Arc::new(QueueStore::with_capacity(config.max_queue_depth));
    let service = Arc::new(QueueService::new(store, config.api_config()));

    let mut server = {
        let service = Arc::clone(&service);
        let addr = config.addr.clone();
        tokio::spawn(async move { service.start(&addr).await })
    };

    tokio::select! {
        _ = shutdown_signal() => {}
        joined = &mut server => {
            // Only `stop` closes the listener cleanly, so reaching here is a failure.
            joined
                .context("server task panicked")?
                .context("server failed")?;
            return Ok(());
        }
    }

    info!("stopping simplemq");
    service.stop().await.context("error closing the queue")?;
    server
        .await
        .context("server task panicked")?
        .context("server failed")?;
    Ok(())
}
