//! Query flooding.
//!
//! A query is answered from the local sandbox when possible. Otherwise the
//! node appends itself to the history and asks its peers one at a time,
//! skipping anyone already in the history. The first content returned wins.
//! A peer answering `Unhandled` is kept; any other failure evicts it.
//!
//! Each flood runs against a deadline of one hop timeout per hop it may still
//! travel. A node deeper in the flood always has less time than its caller,
//! so a silent peer far away times out before anyone upstream gives up on a
//! healthy neighbour.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use ripple_core::{History, PeerAddr};
use ripple_net::PeerClient;
use ripple_store::{LocalStore, StoreError};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::{PeerRegistry, QueryError};

/// Resolves queries locally or by flooding them to peers.
pub struct QueryRouter {
    local_addr: PeerAddr,
    store: Arc<LocalStore>,
    registry: Arc<PeerRegistry>,
    client: Arc<dyn PeerClient>,
    max_history: usize,
    hop_timeout: Duration,
}

impl QueryRouter {
    /// Creates a router for the node at `local_addr`.
    pub fn new(
        local_addr: PeerAddr,
        store: Arc<LocalStore>,
        registry: Arc<PeerRegistry>,
        client: Arc<dyn PeerClient>,
        max_history: usize,
        hop_timeout: Duration,
    ) -> Self {
        Self {
            local_addr,
            store,
            registry,
            client,
            max_history,
            hop_timeout,
        }
    }

    /// Returns this node's address.
    pub fn local_addr(&self) -> &PeerAddr {
        &self.local_addr
    }

    /// Returns the hop bound.
    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Time a flood carrying `history` may spend on its remaining hops.
    pub fn budget(&self, history: &History) -> Duration {
        let hops = self.max_history.saturating_sub(history.len());
        self.hop_timeout
            .saturating_mul(u32::try_from(hops).unwrap_or(u32::MAX))
    }

    /// Resolves `name`. `history` lists the nodes this flood already visited
    /// and is empty for a locally originated query.
    pub async fn query(&self, name: &str, history: &History) -> Result<Bytes, QueryError> {
        match self.store.read(name) {
            Ok(content) => {
                debug!(name, hops = history.len(), "Answered query locally");
                return Ok(content);
            }
            Err(StoreError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        let history = history.extended(&self.local_addr);
        if history.len() >= self.max_history {
            debug!(name, hops = history.len(), "Hop limit reached");
            return Err(QueryError::Unhandled);
        }

        self.broadcast(name, &history).await
    }

    /// Asks every known peer not yet in `history`, in snapshot order, until
    /// one answers or the flood deadline passes.
    async fn broadcast(&self, name: &str, history: &History) -> Result<Bytes, QueryError> {
        let budget = self.budget(history);
        let deadline = Instant::now().checked_add(budget);

        for peer in self.registry.snapshot() {
            if history.contains(&peer) {
                continue;
            }

            let granted = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => budget,
            };
            if granted.is_zero() {
                debug!(name, hops = history.len(), "Flood deadline passed");
                break;
            }

            match self.client.query(&peer, name, history, granted).await {
                Ok(content) => {
                    debug!(name, peer = %peer, size = content.len(), "Peer answered query");
                    return Ok(content);
                }
                Err(e) if e.is_unhandled() => {
                    trace!(name, peer = %peer, "Peer could not handle query");
                }
                // Less than a hop left: the peer never had a fair chance
                Err(e) if e.is_timeout() && granted < self.hop_timeout => {
                    debug!(name, peer = %peer, "Flood deadline cut peer short");
                }
                Err(e) => {
                    warn!(name, peer = %peer, error = %e, "Evicting peer");
                    self.registry.remove(&peer);
                }
            }
        }

        debug!(name, hops = history.len(), "No peer could handle query");
        Err(QueryError::Unhandled)
    }
}
