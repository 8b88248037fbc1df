use anyhow::Result;
use clap::Parser;
use domovik_core::platform::{
    get_default_config_path, get_default_snapshot_dir, get_default_state_path,
};
use domovik_core::{
    ClientConfig, DomovikService, LogNotifier, SnapshotHost, SqliteStore, StateStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Domovik daemon - refreshes peers and opens received links in the background
#[derive(Parser)]
#[command(name = "domovik-daemon")]
#[command(about = "Background refresher for Domovik browser sync", long_about = None)]
struct Args {
    /// Configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Local state database
    #[arg(long)]
    state: Option<PathBuf>,

    /// Directory holding tabs.json and bookmarks.json snapshots
    #[arg(long)]
    snapshots: Option<PathBuf>,

    /// Override the refresh interval, in seconds
    #[arg(long)]
    interval: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let args = Args::parse();
    info!("Starting Domovik daemon v{}", VERSION);

    let config_path = args.config.unwrap_or_else(get_default_config_path);
    let mut config = ClientConfig::load_or_default(&config_path)?;
    if let Some(secs) = args.interval {
        config.refresh_interval_secs = secs;
    }

    let state_path = args.state.unwrap_or_else(get_default_state_path);
    let store: Arc<dyn StateStore> = Arc::new(SqliteStore::open(&state_path)?);
    let snapshots = args
        .snapshots
        .unwrap_or_else(get_default_snapshot_dir);
    let host = Arc::new(SnapshotHost::new(snapshots));

    let service = DomovikService::new(config, store, host, Arc::new(LogNotifier))?;

    let status = service.status()?;
    if !status.linked {
        warn!("This browser is not linked yet. Link it with: domovik link --email <email>");
    } else {
        info!("Linked as {} ({})", status.browser_name, status.uuid);
        // Push local state once before settling into the periodic cycle.
        let report = service.refresh().await;
        if !report.is_clean() {
            error!("Initial refresh had {} failing flows", report.failures().len());
        }
    }

    info!(
        "Refreshing every {} seconds. Press Ctrl+C to exit.",
        service.config().refresh_interval_secs
    );
    service
        .run_periodic(async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
            }
        })
        .await;

    info!("Daemon stopped");
    Ok(())
}
