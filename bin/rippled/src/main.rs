//! Ripple Daemon - a long-running ripple node.
//!
//! Provides:
//! - The `hello` / `query` / `fetch` RPC endpoint
//! - Seed-file bootstrap
//! - Graceful shutdown on Ctrl+C

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use ripple_core::{PeerAddr, WriteSecret, DEFAULT_LISTEN_PORT, DEFAULT_MAX_HISTORY};
use ripple_net::{TransportConfig, DEFAULT_CALL_TIMEOUT_SECS, DEFAULT_CONNECT_TIMEOUT_SECS};
use ripple_node::{read_seed_file, Node, NodeConfig};
use ripple_store::StoreConfig;

/// Ripple node daemon.
#[derive(Parser)]
#[command(name = "rippled")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file path
    #[arg(short, long, default_value = "~/.ripple/config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the node (default)
    Run {
        /// Advertised address
        #[arg(short, long)]
        address: Option<String>,

        /// Listen address
        #[arg(short, long)]
        listen: Option<SocketAddr>,

        /// Sandbox directory
        #[arg(short, long)]
        directory: Option<PathBuf>,

        /// Write secret for fetch
        #[arg(short, long)]
        secret: Option<String>,

        /// Seed file, one peer address per line
        #[arg(long)]
        seeds: Option<PathBuf>,
    },

    /// Print a freshly generated write secret
    Secret,
}

/// Daemon configuration.
#[derive(Debug, Clone)]
struct DaemonConfig {
    /// Advertised address
    address: Option<String>,
    /// Listen address, derived from `address` when unset
    listen_addr: Option<SocketAddr>,
    /// Sandbox directory
    directory: PathBuf,
    /// Write secret
    secret: Option<String>,
    /// Seed file
    seeds: Option<PathBuf>,
    /// Per-hop timeout
    call_timeout_secs: u64,
    /// Connect timeout
    connect_timeout_secs: u64,
    /// Hop bound
    max_history: usize,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            address: None,
            listen_addr: None,
            directory: PathBuf::from("~/.ripple/files"),
            secret: None,
            seeds: None,
            call_timeout_secs: DEFAULT_CALL_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            max_history: DEFAULT_MAX_HISTORY,
        }
    }
}

impl DaemonConfig {
    /// Returns the address to bind.
    fn listen_addr(&self) -> SocketAddr {
        if let Some(listen) = self.listen_addr {
            return listen;
        }
        let default = SocketAddr::from(([127, 0, 0, 1], DEFAULT_LISTEN_PORT));
        let Some(address) = self.address.as_deref().and_then(|a| PeerAddr::new(a).ok()) else {
            return default;
        };
        match address.dial_target().parse() {
            Ok(addr) => addr,
            // Hostname: listen on every interface at the advertised port
            Err(_) => SocketAddr::from(([0, 0, 0, 0], address.port().unwrap_or(DEFAULT_LISTEN_PORT))),
        }
    }

    /// Builds the node configuration.
    fn node_config(&self) -> Result<(NodeConfig, bool)> {
        let address = self
            .address
            .as_deref()
            .map(PeerAddr::new)
            .transpose()
            .context("Invalid node address")?;

        let (secret, generated) = match &self.secret {
            Some(secret) => (WriteSecret::new(secret.as_str()), false),
            None => (WriteSecret::random(), true),
        };

        let config = NodeConfig {
            address,
            listen_addr: self.listen_addr(),
            store: StoreConfig::new(expand_tilde(&self.directory)),
            secret,
            max_history: self.max_history,
            transport: TransportConfig {
                connect_timeout: Duration::from_secs(self.connect_timeout_secs),
                call_timeout: Duration::from_secs(self.call_timeout_secs),
                ..TransportConfig::default()
            },
        };
        Ok((config, generated))
    }
}

/// Load configuration from TOML file.
fn load_config(path: &Path) -> Result<DaemonConfig> {
    let path = expand_tilde(path);

    if !path.exists() {
        info!("No config file found at {:?}, using defaults", path);
        return Ok(DaemonConfig::default());
    }

    let content = std::fs::read_to_string(&path).context("Failed to read config file")?;
    parse_config(&content)
}

/// Parse configuration from TOML text.
fn parse_config(content: &str) -> Result<DaemonConfig> {
    let toml: toml::Value = content.parse().context("Failed to parse config file")?;

    let mut config = DaemonConfig::default();

    // Parse [node] section
    if let Some(node) = toml.get("node") {
        if let Some(address) = node.get("address").and_then(|v| v.as_str()) {
            config.address = Some(address.to_string());
        }
        if let Some(listen) = node.get("listen").and_then(|v| v.as_str()) {
            config.listen_addr = Some(listen.parse().context("Invalid listen address")?);
        }
        if let Some(directory) = node.get("directory").and_then(|v| v.as_str()) {
            config.directory = PathBuf::from(directory);
        }
        if let Some(secret) = node.get("secret").and_then(|v| v.as_str()) {
            config.secret = Some(secret.to_string());
        }
    }

    // Parse [network] section
    if let Some(network) = toml.get("network") {
        if let Some(seeds) = network.get("seeds").and_then(|v| v.as_str()) {
            config.seeds = Some(PathBuf::from(seeds));
        }
        if let Some(secs) = network.get("call_timeout_secs").and_then(|v| v.as_integer()) {
            config.call_timeout_secs = u64::try_from(secs).context("Invalid call_timeout_secs")?;
        }
        if let Some(secs) = network.get("connect_timeout_secs").and_then(|v| v.as_integer()) {
            config.connect_timeout_secs =
                u64::try_from(secs).context("Invalid connect_timeout_secs")?;
        }
        if let Some(max) = network.get("max_history").and_then(|v| v.as_integer()) {
            config.max_history = usize::try_from(max).context("Invalid max_history")?;
        }
    }

    Ok(config)
}

/// Expand ~ to home directory.
fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set up logging")?;

    // Load configuration
    let mut config = load_config(&cli.config)?;

    match cli.command.unwrap_or(Commands::Run {
        address: None,
        listen: None,
        directory: None,
        secret: None,
        seeds: None,
    }) {
        Commands::Run {
            address,
            listen,
            directory,
            secret,
            seeds,
        } => {
            // Command-line flags override the file
            if address.is_some() {
                config.address = address;
            }
            if listen.is_some() {
                config.listen_addr = listen;
            }
            if let Some(directory) = directory {
                config.directory = directory;
            }
            if secret.is_some() {
                config.secret = secret;
            }
            if seeds.is_some() {
                config.seeds = seeds;
            }

            run(config).await?;
        }

        Commands::Secret => {
            println!("{}", WriteSecret::random().expose());
        }
    }

    Ok(())
}

async fn run(config: DaemonConfig) -> Result<()> {
    let (node_config, generated) = config.node_config()?;

    info!("Starting ripple daemon");
    info!("Listen address: {}", node_config.listen_addr);
    info!("Sandbox directory: {:?}", node_config.store.root);

    let secret = node_config.secret.clone();
    let node = Node::start(node_config)
        .await
        .context("Failed to start node")?;

    if let Some(seeds) = &config.seeds {
        let seeds = read_seed_file(expand_tilde(seeds)).context("Failed to read seed file")?;
        if seeds.is_empty() {
            warn!("Seed file lists no peers");
        }
        node.join(&seeds).await;
    } else {
        info!("No seed file configured");
    }

    println!("ripple daemon running");
    println!("  Address: {}", node.address());
    println!("  Listen: {}", node.local_addr());
    if generated {
        println!("  Secret: {}", secret.expose());
    }
    println!();
    println!("Press Ctrl+C to stop");

    match signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }

    node.shutdown().await;
    info!("Daemon stopped");
    Ok(())
}
