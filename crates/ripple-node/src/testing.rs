//! Scripted peer client for unit tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use ripple_core::{History, PeerAddr};
use ripple_net::{CallError, PeerClient, TransportError};
use ripple_proto::{Fault, FaultCode};
use ripple_store::LocalStore;

use crate::{PeerRegistry, QueryRouter};

/// What a scripted peer answers.
#[derive(Debug, Clone)]
pub enum Reply {
    Content(&'static str),
    Unhandled,
    Denied,
    Fault(u32),
    Unreachable,
    Timeout,
    /// Waits out the whole budget, then times out
    Silent,
    /// Waits, then answers `Unhandled`
    Stall(Duration),
}

/// Hop timeout used by [`router`].
pub const TEST_HOP: Duration = Duration::from_secs(1);

/// Records every call and answers from a per-peer script.
#[derive(Default)]
pub struct ScriptedClient {
    replies: Mutex<HashMap<PeerAddr, Reply>>,
    pub queries: Mutex<Vec<(PeerAddr, String, History, Duration)>>,
    pub hellos: Mutex<Vec<(PeerAddr, PeerAddr)>>,
}

impl ScriptedClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, peer: &PeerAddr, reply: Reply) {
        self.replies.lock().insert(peer.clone(), reply);
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().len()
    }

    pub fn queried_peers(&self) -> Vec<PeerAddr> {
        self.queries.lock().iter().map(|(p, _, _, _)| p.clone()).collect()
    }

    fn reply_for(&self, peer: &PeerAddr) -> Reply {
        self.replies
            .lock()
            .get(peer)
            .cloned()
            .unwrap_or(Reply::Unreachable)
    }
}

#[async_trait]
impl PeerClient for ScriptedClient {
    async fn hello(&self, peer: &PeerAddr, address: &PeerAddr) -> Result<(), CallError> {
        self.hellos.lock().push((peer.clone(), address.clone()));
        match self.reply_for(peer) {
            Reply::Unreachable | Reply::Timeout | Reply::Silent => {
                Err(TransportError::Timeout.into())
            }
            _ => Ok(()),
        }
    }

    async fn query(
        &self,
        peer: &PeerAddr,
        name: &str,
        history: &History,
        budget: Duration,
    ) -> Result<Bytes, CallError> {
        self.queries
            .lock()
            .push((peer.clone(), name.to_string(), history.clone(), budget));
        match self.reply_for(peer) {
            Reply::Content(content) => Ok(Bytes::from_static(content.as_bytes())),
            Reply::Unhandled => Err(Fault::unhandled().into()),
            Reply::Denied => Err(Fault::access_denied().into()),
            Reply::Fault(code) => Err(Fault::new(FaultCode::from_code(code), "scripted").into()),
            Reply::Unreachable => {
                Err(TransportError::ConnectionFailed("connection refused".into()).into())
            }
            Reply::Timeout => Err(TransportError::Timeout.into()),
            Reply::Silent => {
                tokio::time::sleep(budget).await;
                Err(TransportError::Timeout.into())
            }
            Reply::Stall(delay) => {
                tokio::time::sleep(delay).await;
                Err(Fault::unhandled().into())
            }
        }
    }

    async fn fetch(&self, _peer: &PeerAddr, _name: &str, _secret: &str) -> Result<(), CallError> {
        Err(Fault::access_denied().into())
    }
}

pub fn addr(s: &str) -> PeerAddr {
    PeerAddr::new(s).unwrap()
}

/// Router over `root` with the given peers registered.
pub fn router(
    root: &Path,
    local: &str,
    peers: &[&str],
    client: Arc<ScriptedClient>,
    max_history: usize,
) -> (QueryRouter, Arc<PeerRegistry>, Arc<LocalStore>) {
    router_with_hop(root, local, peers, client, max_history, TEST_HOP)
}

/// Like [`router`], with an explicit hop timeout.
pub fn router_with_hop(
    root: &Path,
    local: &str,
    peers: &[&str],
    client: Arc<ScriptedClient>,
    max_history: usize,
    hop_timeout: Duration,
) -> (QueryRouter, Arc<PeerRegistry>, Arc<LocalStore>) {
    let registry = Arc::new(PeerRegistry::new());
    for peer in peers {
        registry.add(addr(peer));
    }
    let store = Arc::new(LocalStore::new(root));
    let router = QueryRouter::new(
        addr(local),
        store.clone(),
        registry.clone(),
        client,
        max_history,
        hop_timeout,
    );
    (router, registry, store)
}
