//! Test node implementation for integration testing.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use ripple_core::{History, PeerAddr, WriteSecret, DEFAULT_MAX_HISTORY};
use ripple_net::{CallError, PeerClient, TcpPeerClient, TransportConfig};
use ripple_node::{Node, NodeConfig, PeerRegistry};
use ripple_store::StoreConfig;
use tempfile::TempDir;
use tracing::info;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Configuration for a test node.
#[derive(Debug, Clone)]
pub struct TestNodeConfig {
    /// Secret accepted by `fetch`
    pub secret: String,
    /// Hop bound
    pub max_history: usize,
    /// Timeouts, kept short so dead peers fail fast. `call_timeout` is the
    /// per-hop timeout.
    pub transport: TransportConfig,
}

impl Default for TestNodeConfig {
    fn default() -> Self {
        Self {
            secret: "test-secret".to_string(),
            max_history: DEFAULT_MAX_HISTORY,
            transport: TransportConfig {
                connect_timeout: Duration::from_secs(1),
                call_timeout: Duration::from_secs(5),
                idle_timeout: Duration::from_secs(2),
            },
        }
    }
}

/// TCP peer client that counts the calls a node makes.
pub struct CountingClient {
    inner: TcpPeerClient,
    calls: AtomicUsize,
}

impl CountingClient {
    /// Wraps a TCP client with the given timeouts.
    pub fn new(config: TransportConfig) -> Self {
        Self {
            inner: TcpPeerClient::new(config),
            calls: AtomicUsize::new(0),
        }
    }

    /// Returns the number of outgoing calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn count(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PeerClient for CountingClient {
    async fn hello(&self, peer: &PeerAddr, address: &PeerAddr) -> Result<(), CallError> {
        self.count();
        self.inner.hello(peer, address).await
    }

    async fn query(
        &self,
        peer: &PeerAddr,
        name: &str,
        history: &History,
        budget: Duration,
    ) -> Result<Bytes, CallError> {
        self.count();
        self.inner.query(peer, name, history, budget).await
    }

    async fn fetch(&self, peer: &PeerAddr, name: &str, secret: &str) -> Result<(), CallError> {
        self.count();
        self.inner.fetch(peer, name, secret).await
    }
}

/// A real node on loopback with a temporary sandbox.
pub struct TestNode {
    node: Node,
    secret: String,
    outgoing: Arc<CountingClient>,
    /// Client for driving this node from the outside, like the operator tool
    operator: TcpPeerClient,
    /// Time the operator waits for a flood started here
    flood_budget: Duration,
    root: PathBuf,
    _temp_dir: TempDir,
}

impl TestNode {
    /// Starts a node with the given configuration.
    pub async fn start(config: TestNodeConfig) -> Result<Self, BoxError> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().join("files");

        let outgoing = Arc::new(CountingClient::new(config.transport.clone()));
        let node_config = NodeConfig {
            address: None,
            listen_addr: "127.0.0.1:0".parse()?,
            store: StoreConfig::new(root.clone()),
            secret: WriteSecret::new(config.secret.as_str()),
            max_history: config.max_history,
            transport: config.transport.clone(),
        };
        let node = Node::start_with_client(node_config, outgoing.clone()).await?;

        info!(address = %node.address(), root = ?root, "Test node started");

        let flood_budget = config.transport.flood_budget(config.max_history);
        let operator = TcpPeerClient::new(TransportConfig {
            call_timeout: flood_budget,
            ..config.transport
        });

        Ok(Self {
            node,
            secret: config.secret,
            outgoing,
            operator,
            flood_budget,
            root,
            _temp_dir: temp_dir,
        })
    }

    /// Returns the node's address.
    pub fn address(&self) -> &PeerAddr {
        self.node.address()
    }

    /// Returns the node's secret.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Returns the sandbox root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the node's peer registry.
    pub fn registry(&self) -> &Arc<PeerRegistry> {
        self.node.registry()
    }

    /// Returns the number of calls this node has made to peers.
    pub fn outgoing_calls(&self) -> usize {
        self.outgoing.calls()
    }

    /// Tells this node about `other` over RPC.
    pub async fn introduce(&self, other: &TestNode) -> Result<(), CallError> {
        self.operator.hello(self.address(), other.address()).await
    }

    /// Sends `hello(address)` to this node over RPC.
    pub async fn hello(&self, address: &PeerAddr) -> Result<(), CallError> {
        self.operator.hello(self.address(), address).await
    }

    /// Queries this node over RPC as a flood originator.
    pub async fn query(&self, name: &str) -> Result<Bytes, CallError> {
        self.query_with_history(name, &History::new()).await
    }

    /// Queries this node over RPC with an explicit history.
    pub async fn query_with_history(
        &self,
        name: &str,
        history: &History,
    ) -> Result<Bytes, CallError> {
        self.operator
            .query(self.address(), name, history, self.flood_budget)
            .await
    }

    /// Fetches over RPC with the given secret.
    pub async fn fetch_with(&self, name: &str, secret: &str) -> Result<(), CallError> {
        self.operator.fetch(self.address(), name, secret).await
    }

    /// Fetches over RPC with this node's own secret.
    pub async fn fetch(&self, name: &str) -> Result<(), CallError> {
        self.fetch_with(name, &self.secret).await
    }

    /// Writes a file into the sandbox.
    pub fn write_file(&self, name: &str, content: &str) -> std::io::Result<()> {
        let path = self.root.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
    }

    /// Writes a file next to the sandbox, outside of it.
    pub fn write_outside(&self, name: &str, content: &str) -> std::io::Result<()> {
        std::fs::write(self.outside().join(name), content)
    }

    /// Links `name` inside the sandbox to `target`.
    #[cfg(unix)]
    pub fn symlink(&self, target: &Path, name: &str) -> std::io::Result<()> {
        std::os::unix::fs::symlink(target, self.root.join(name))
    }

    /// Returns the directory holding the sandbox.
    pub fn outside(&self) -> &Path {
        self.root.parent().unwrap_or(&self.root)
    }

    /// Reads a file from the sandbox.
    pub fn read_file(&self, name: &str) -> Option<String> {
        std::fs::read_to_string(self.root.join(name)).ok()
    }

    /// Returns true if the sandbox holds `name`.
    pub fn has_file(&self, name: &str) -> bool {
        self.root.join(name).is_file()
    }

    /// Stops the node's server.
    pub async fn shutdown(self) {
        self.node.shutdown().await;
    }
}
