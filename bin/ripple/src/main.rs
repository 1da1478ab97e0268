//! Ripple CLI - interactive operator tool.
//!
//! Starts a node in-process, joins the peers listed in a url file, then
//! reads commands from stdin:
//! - `fetch <name>` copies a file from the network into the sandbox
//! - `exit` quits

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use ripple_core::{PeerAddr, WriteSecret, DEFAULT_MAX_HISTORY, PROTOCOL_VERSION};
use ripple_net::{CallError, PeerClient, TcpPeerClient, TransportConfig};
use ripple_node::{read_seed_file, Node, NodeConfig};
use ripple_proto::FaultCode;
use ripple_store::StoreConfig;

/// Interactive ripple operator tool.
#[derive(Parser)]
#[command(name = "ripple")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// File listing peer addresses, one per line
    urlfile: PathBuf,

    /// Sandbox directory served and written by this node
    directory: PathBuf,

    /// Address of this node, e.g. 127.0.0.1:4242
    url: String,
}

/// A parsed operator command.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Fetch(String),
    Exit,
    Empty,
    Unknown(String),
}

impl Command {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        let (verb, arg) = match line.split_once(char::is_whitespace) {
            Some((verb, arg)) => (verb, arg.trim()),
            None => (line, ""),
        };
        match verb {
            "" => Command::Empty,
            "exit" | "quit" => Command::Exit,
            "fetch" if !arg.is_empty() => Command::Fetch(arg.to_string()),
            _ => Command::Unknown(line.to_string()),
        }
    }
}

/// Returns the socket address to bind for `address`.
fn listen_addr(address: &PeerAddr) -> Result<SocketAddr> {
    if let Ok(addr) = address.dial_target().parse() {
        return Ok(addr);
    }
    match address.port() {
        Some(port) => Ok(SocketAddr::from(([0, 0, 0, 0], port))),
        None => bail!("No port in address {}", address),
    }
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

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set up logging")?;

    let address = PeerAddr::new(&cli.url).context("Invalid node address")?;
    let secret = WriteSecret::random();
    let transport = TransportConfig::default();

    let config = NodeConfig {
        address: Some(address.clone()),
        listen_addr: listen_addr(&address)?,
        store: StoreConfig::new(cli.directory.clone()),
        secret: secret.clone(),
        max_history: DEFAULT_MAX_HISTORY,
        transport: transport.clone(),
    };
    let node = Node::start(config).await.context("Failed to start node")?;

    let seeds = read_seed_file(&cli.urlfile).context("Failed to read url file")?;
    node.join(&seeds).await;

    println!("ripple (protocol v{})", PROTOCOL_VERSION);
    println!("  Address: {}", node.address());
    println!("  Directory: {:?}", cli.directory);
    println!("  Peers: {}", node.registry().len());
    println!();
    println!("Commands: fetch <name>, exit");

    // A fetch waits for the whole flood it starts
    let client = TcpPeerClient::new(TransportConfig {
        call_timeout: transport.flood_budget(DEFAULT_MAX_HISTORY),
        ..transport
    });
    let result = repl(&client, node.address(), secret.expose()).await;

    node.shutdown().await;
    result
}

/// Reads commands until `exit` or end of input.
async fn repl(client: &TcpPeerClient, address: &PeerAddr, secret: &str) -> Result<()> {
    let mut lines = BufReader::new(io::stdin()).lines();
    let mut stdout = io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match Command::parse(&line) {
            Command::Empty => {}
            Command::Exit => break,
            Command::Fetch(name) => {
                debug!(name = %name, "fetch");
                match client.fetch(address, &name, secret).await {
                    Ok(()) => println!("fetched {}", name),
                    Err(CallError::Fault(fault)) if fault.code == FaultCode::Unhandled => {
                        println!("could not find the file");
                    }
                    Err(e) => return Err(e).with_context(|| format!("fetch {} failed", name)),
                }
            }
            Command::Unknown(line) => {
                println!("unknown command: {} (try `fetch <name>` or `exit`)", line);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("fetch a.txt"), Command::Fetch("a.txt".into()));
        assert_eq!(
            Command::parse("  fetch   dir/b.txt  \n"),
            Command::Fetch("dir/b.txt".into())
        );
        assert_eq!(Command::parse("exit"), Command::Exit);
        assert_eq!(Command::parse(""), Command::Empty);
        assert_eq!(Command::parse("fetch"), Command::Unknown("fetch".into()));
        assert_eq!(Command::parse("get x"), Command::Unknown("get x".into()));
    }

    #[test]
    fn test_listen_addr() {
        let addr = PeerAddr::new("127.0.0.1:4300").unwrap();
        assert_eq!(listen_addr(&addr).unwrap(), "127.0.0.1:4300".parse().unwrap());

        let url = PeerAddr::new("http://localhost:4301/").unwrap();
        assert_eq!(listen_addr(&url).unwrap(), "0.0.0.0:4301".parse().unwrap());
    }
}
