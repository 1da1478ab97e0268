//! Node lifecycle: wiring, bootstrap and shutdown.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use ripple_core::{PeerAddr, WriteSecret, DEFAULT_LISTEN_PORT, DEFAULT_MAX_HISTORY};
use ripple_net::{PeerClient, RpcServer, ServerHandle, TcpPeerClient, TransportConfig};
use ripple_store::{LocalStore, StoreConfig};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::{AccessGate, NodeError, NodeService, PeerRegistry, QueryRouter};

/// Node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Advertised identity. Derived from the bound address when unset.
    pub address: Option<PeerAddr>,
    /// Address the RPC server binds
    pub listen_addr: SocketAddr,
    /// Sandbox settings
    pub store: StoreConfig,
    /// Secret required by `fetch`
    pub secret: WriteSecret,
    /// Hop bound for floods
    pub max_history: usize,
    /// Timeouts for outgoing and incoming calls
    pub transport: TransportConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            address: None,
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_LISTEN_PORT),
            store: StoreConfig::default(),
            secret: WriteSecret::random(),
            max_history: DEFAULT_MAX_HISTORY,
            transport: TransportConfig::default(),
        }
    }
}

/// A running node.
pub struct Node {
    address: PeerAddr,
    service: Arc<NodeService>,
    client: Arc<dyn PeerClient>,
    server: ServerHandle,
}

impl Node {
    /// Starts a node that talks to peers over TCP.
    pub async fn start(config: NodeConfig) -> Result<Self, NodeError> {
        let client = Arc::new(TcpPeerClient::new(config.transport.clone()));
        Self::start_with_client(config, client).await
    }

    /// Starts a node using `client` for outgoing calls.
    pub async fn start_with_client(
        config: NodeConfig,
        client: Arc<dyn PeerClient>,
    ) -> Result<Self, NodeError> {
        let store = Arc::new(LocalStore::open(&config.store)?);

        let listener = TcpListener::bind(config.listen_addr).await?;
        let local_addr = listener.local_addr()?;
        let address = match config.address {
            Some(address) => address,
            None => PeerAddr::from(advertised(local_addr)),
        };

        let registry = Arc::new(PeerRegistry::new());
        let router = Arc::new(QueryRouter::new(
            address.clone(),
            store.clone(),
            registry.clone(),
            client.clone(),
            config.max_history,
            config.transport.call_timeout,
        ));
        let gate = Arc::new(AccessGate::new(config.secret, router.clone(), store));
        let service = Arc::new(NodeService::new(registry, router, gate));

        let server = RpcServer::from_listener(
            listener,
            service.clone(),
            config.transport.idle_timeout,
        )?
        .spawn();

        info!(
            address = %address,
            listen = %local_addr,
            max_history = config.max_history,
            "Node started"
        );

        Ok(Self {
            address,
            service,
            client,
            server,
        })
    }

    /// Returns the advertised address.
    pub fn address(&self) -> &PeerAddr {
        &self.address
    }

    /// Returns the bound socket address.
    pub fn local_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    /// Returns the request handler.
    pub fn service(&self) -> &Arc<NodeService> {
        &self.service
    }

    /// Returns the peer registry.
    pub fn registry(&self) -> &Arc<PeerRegistry> {
        self.service.registry()
    }

    /// Registers each seed locally and announces this node to it.
    ///
    /// Announce failures are logged and skipped. Returns the number of seeds
    /// that acknowledged.
    pub async fn join(&self, seeds: &[PeerAddr]) -> usize {
        let mut announced = 0;
        for seed in seeds {
            if *seed == self.address {
                continue;
            }
            self.service.hello(seed.clone());
            match self.client.hello(seed, &self.address).await {
                Ok(()) => announced += 1,
                Err(e) => warn!(seed = %seed, error = %e, "Could not announce to seed"),
            }
        }
        info!(seeds = seeds.len(), announced, peers = self.registry().len(), "Joined network");
        announced
    }

    /// Stops the RPC server, letting in-flight calls finish.
    pub async fn shutdown(self) {
        self.server.shutdown().await;
        info!(address = %self.address, "Node stopped");
    }
}

/// Replaces a wildcard bind address with loopback so peers can dial it.
fn advertised(local_addr: SocketAddr) -> SocketAddr {
    if local_addr.ip().is_unspecified() {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), local_addr.port())
    } else {
        local_addr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{addr, Reply, ScriptedClient};

    fn config(root: &std::path::Path) -> NodeConfig {
        NodeConfig {
            listen_addr: "127.0.0.1:0".parse().unwrap(),
            store: StoreConfig::new(root.to_path_buf()),
            ..NodeConfig::default()
        }
    }

    #[test]
    fn test_advertised_replaces_wildcard() {
        let wildcard: SocketAddr = "0.0.0.0:4242".parse().unwrap();
        assert_eq!(advertised(wildcard).to_string(), "127.0.0.1:4242");

        let bound: SocketAddr = "10.1.2.3:4242".parse().unwrap();
        assert_eq!(advertised(bound), bound);
    }

    #[tokio::test]
    async fn test_start_derives_address_from_bound_port() {
        let dir = tempfile::tempdir().unwrap();
        let node = Node::start(config(dir.path())).await.unwrap();

        assert_ne!(node.local_addr().port(), 0);
        assert_eq!(node.address().port(), Some(node.local_addr().port()));

        node.shutdown().await;
    }

    #[tokio::test]
    async fn test_configured_address_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.address = Some(addr("node.example:9000"));

        let node = Node::start(config).await.unwrap();
        assert_eq!(node.address(), &addr("node.example:9000"));
        node.shutdown().await;
    }

    #[tokio::test]
    async fn test_start_creates_sandbox() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("files");

        let node = Node::start(config(&root)).await.unwrap();
        assert!(root.is_dir());
        node.shutdown().await;
    }

    #[tokio::test]
    async fn test_join_registers_and_announces() {
        let dir = tempfile::tempdir().unwrap();
        let client = ScriptedClient::new();
        client.script(&addr("up:1"), Reply::Unhandled);
        let node = Node::start_with_client(config(dir.path()), client.clone())
            .await
            .unwrap();

        let own = node.address().clone();
        let announced = node.join(&[addr("up:1"), addr("down:1"), own.clone()]).await;

        assert_eq!(announced, 1);
        assert_eq!(node.registry().snapshot(), vec![addr("down:1"), addr("up:1")]);
        let hellos = client.hellos.lock().clone();
        assert_eq!(hellos.len(), 2);
        assert!(hellos.iter().all(|(_, announced)| *announced == own));

        node.shutdown().await;
    }
}
