use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use domovik_core::platform::{
    get_default_config_path, get_default_snapshot_dir, get_default_state_path,
};
use domovik_core::{
    ClientConfig, DomovikService, LocalTab, LogNotifier, SnapshotHost, SqliteStore, StateStore,
};
use rpassword::prompt_password;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Domovik CLI - keep tabs, bookmarks and reading lists in sync across browsers
#[derive(Parser)]
#[command(name = "domovik")]
#[command(about = "End-to-end encrypted browser sync", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Local state database
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Directory holding tabs.json and bookmarks.json snapshots
    #[arg(long, global = true)]
    snapshots: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Link this browser to an account
    Link {
        /// Account email
        #[arg(long)]
        email: String,

        /// Relay URL (defaults to the configured server)
        #[arg(long)]
        server: Option<String>,

        /// Name shown to other browsers
        #[arg(long)]
        name: Option<String>,
    },

    /// Enter the password again after the session was revoked
    Reauth,

    /// Unlink this browser and forget every local secret
    Unlink,

    /// Show link and connection state
    Status,

    /// Run every sync flow once
    Refresh,

    /// Show the other browsers and their tabs
    Peers,

    /// Open a URL on another browser
    Send {
        /// Peer uuid or name
        target: String,

        url: String,
    },

    /// Pull and open the links other browsers sent here
    Inbox,

    /// Rename this browser
    Rename { name: String },

    /// Show the synced bookmarks
    Bookmarks,

    /// Show reading lists
    Lists,

    /// Create a reading list
    ListCreate { name: String },

    /// Save a page into a reading list
    ListAdd {
        /// Reading list uuid
        list: String,

        url: String,

        #[arg(long)]
        title: Option<String>,
    },

    /// Remove a link from a reading list
    ListRemove {
        /// Reading list uuid
        list: String,

        /// Link id
        id: i64,
    },

    /// Search peer tabs and bookmarks
    Search { keywords: Vec<String> },
}

fn build_service(cli: &Cli) -> Result<DomovikService> {
    let config_path = cli.config.clone().unwrap_or_else(get_default_config_path);
    let config = ClientConfig::load_or_default(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    let state_path = cli.state.clone().unwrap_or_else(get_default_state_path);
    let store: Arc<dyn StateStore> = Arc::new(
        SqliteStore::open(&state_path)
            .with_context(|| format!("opening {}", state_path.display()))?,
    );

    let snapshots = cli
        .snapshots
        .clone()
        .unwrap_or_else(get_default_snapshot_dir);
    let host = Arc::new(SnapshotHost::new(snapshots));

    Ok(DomovikService::new(config, store, host, Arc::new(LogNotifier))?)
}

/// Resolve a peer given by uuid or, case-insensitively, by name.
fn resolve_peer(service: &DomovikService, target: &str) -> Result<String> {
    let peers = service.sync().cached_peers()?;
    if let Some(peer) = peers.iter().find(|p| p.uuid == target) {
        return Ok(peer.uuid.clone());
    }
    let named: Vec<_> = peers
        .iter()
        .filter(|p| p.name.eq_ignore_ascii_case(target))
        .collect();
    match named.as_slice() {
        [peer] => Ok(peer.uuid.clone()),
        [] => bail!("No browser named {}; run `domovik peers` to refresh", target),
        _ => bail!("Several browsers are named {}; use the uuid", target),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let service = build_service(&cli)?;

    match cli.command {
        Commands::Link {
            email,
            server,
            name,
        } => {
            let password = prompt_password("Password: ")?;
            let browser = service
                .link(server.as_deref(), &email, &password, name.as_deref())
                .await?;
            println!("Linked as {} ({})", browser.name, browser.uuid);
        }
        Commands::Reauth => {
            let password = prompt_password("Password: ")?;
            let browser = service.reauthorize(&password).await?;
            println!("Re-authorized {}", browser.name);
        }
        Commands::Unlink => {
            service.unlink().await?;
            println!("Unlinked");
        }
        Commands::Status => {
            let status = service.status()?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Commands::Refresh => {
            let report = service.refresh().await;
            for (flow, e) in report.failures() {
                eprintln!("{}: {}", flow, e);
            }
            if !report.is_clean() {
                bail!("Refresh finished with errors");
            }
            info!("Refresh complete");
        }
        Commands::Peers => {
            for peer in service.sync().sync_browsers().await? {
                println!("{} ({})", peer.name, peer.uuid);
                for tab in peer.tabs {
                    println!("  {}  {}", tab.title, tab.url);
                }
            }
        }
        Commands::Send { target, url } => {
            let uuid = resolve_peer(&service, &target)?;
            service.sync().send_command(&uuid, &url).await?;
            println!("Sent {}", url);
        }
        Commands::Inbox => {
            for url in service.sync().get_commands().await? {
                println!("{}", url);
            }
        }
        Commands::Rename { name } => {
            let browser = service.rename(&name).await?;
            println!("Renamed to {}", browser.name);
        }
        Commands::Bookmarks => {
            for bookmark in service.sync().sync_bookmarks().await? {
                println!("{}  {}", bookmark.title, bookmark.url);
            }
        }
        Commands::Lists => {
            for list in service.sync().sync_lists().await? {
                println!("{} ({})", list.name, list.uuid);
                for link in list.links {
                    println!("  [{}] {}  {}", link.id, link.title, link.url);
                }
            }
        }
        Commands::ListCreate { name } => {
            let uuid = service.sync().create_list(&name).await?;
            println!("Created {} ({})", name, uuid);
        }
        Commands::ListAdd { list, url, title } => {
            let tab = LocalTab {
                title,
                url,
                ..LocalTab::default()
            };
            service.sync().add_link_to_list(&list, &tab).await?;
            service.sync().sync_lists().await?;
            println!("Saved {}", tab.url);
        }
        Commands::ListRemove { list, id } => {
            service.sync().remove_link_from_list(&list, id).await?;
            service.sync().sync_lists().await?;
            println!("Removed link {}", id);
        }
        Commands::Search { keywords } => {
            for hit in service.sync().search(&keywords.join(" "))? {
                println!("{}\n  {}", hit.description, hit.content);
            }
        }
    }

    Ok(())
}
