//! Test network harness for multi-node integration testing.

use ripple_core::PeerAddr;
use ripple_net::CallError;
use tracing::info;

use crate::node::{TestNode, TestNodeConfig};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A test network containing multiple nodes.
pub struct TestNetwork {
    config: TestNodeConfig,
    nodes: Vec<TestNode>,
}

impl TestNetwork {
    /// Creates an empty network whose nodes use `config`.
    pub fn new(config: TestNodeConfig) -> Self {
        Self {
            config,
            nodes: Vec::new(),
        }
    }

    /// Creates a network of `count` default nodes.
    pub async fn with_nodes(count: usize) -> Result<Self, BoxError> {
        Self::with_config(count, TestNodeConfig::default()).await
    }

    /// Creates a network of `count` nodes using `config`.
    pub async fn with_config(count: usize, config: TestNodeConfig) -> Result<Self, BoxError> {
        let mut network = Self::new(config);
        for _ in 0..count {
            network.add_node().await?;
        }
        Ok(network)
    }

    /// Starts and adds a node. Returns its index.
    pub async fn add_node(&mut self) -> Result<usize, BoxError> {
        let node = TestNode::start(self.config.clone()).await?;
        info!(address = %node.address(), total = self.nodes.len() + 1, "Added node to test network");
        self.nodes.push(node);
        Ok(self.nodes.len() - 1)
    }

    /// Returns the number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns all nodes.
    pub fn nodes(&self) -> &[TestNode] {
        &self.nodes
    }

    /// Returns a node by index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn node(&self, index: usize) -> &TestNode {
        &self.nodes[index]
    }

    /// Returns all node addresses, in index order.
    pub fn addresses(&self) -> Vec<PeerAddr> {
        self.nodes.iter().map(|n| n.address().clone()).collect()
    }

    /// Makes every node know every other node.
    pub async fn connect_mesh(&self) -> Result<(), CallError> {
        for (i, from) in self.nodes.iter().enumerate() {
            for (j, to) in self.nodes.iter().enumerate() {
                if i != j {
                    from.introduce(to).await?;
                }
            }
        }
        info!(nodes = self.nodes.len(), "Connected nodes in mesh topology");
        Ok(())
    }

    /// Makes node `i` know node `i + 1`, wrapping around.
    pub async fn connect_ring(&self) -> Result<(), CallError> {
        if self.nodes.len() < 2 {
            return Ok(());
        }
        for i in 0..self.nodes.len() {
            let next = (i + 1) % self.nodes.len();
            self.nodes[i].introduce(&self.nodes[next]).await?;
        }
        info!(nodes = self.nodes.len(), "Connected nodes in ring topology");
        Ok(())
    }

    /// Makes node `i` know node `i + 1`, without wrapping.
    pub async fn connect_chain(&self) -> Result<(), CallError> {
        for pair in self.nodes.windows(2) {
            pair[0].introduce(&pair[1]).await?;
        }
        info!(nodes = self.nodes.len(), "Connected nodes in chain topology");
        Ok(())
    }

    /// Makes the hub (node 0) and every spoke know each other.
    pub async fn connect_star(&self) -> Result<(), CallError> {
        if self.nodes.len() < 2 {
            return Ok(());
        }
        let hub = &self.nodes[0];
        for spoke in &self.nodes[1..] {
            hub.introduce(spoke).await?;
            spoke.introduce(hub).await?;
        }
        info!(nodes = self.nodes.len(), "Connected nodes in star topology");
        Ok(())
    }

    /// Stops and removes the node at `index`. Other nodes keep it registered.
    pub async fn stop_node(&mut self, index: usize) -> PeerAddr {
        let node = self.nodes.remove(index);
        let address = node.address().clone();
        node.shutdown().await;
        info!(address = %address, "Stopped node");
        address
    }

    /// Stops every node.
    pub async fn shutdown(self) {
        for node in self.nodes {
            node.shutdown().await;
        }
    }
}
