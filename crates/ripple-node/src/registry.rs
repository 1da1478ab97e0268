//! Known-peer set.
//!
//! Filled by `hello` and pruned when a flood finds a peer unreachable.
//! Floods iterate over a snapshot so their own evictions never disturb the
//! iteration in progress.

use std::collections::BTreeSet;

use parking_lot::RwLock;
use ripple_core::PeerAddr;
use tracing::{debug, info};

/// Thread-safe set of peer addresses.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: RwLock<BTreeSet<PeerAddr>>,
}

impl PeerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a peer. Returns true if it was not known before.
    pub fn add(&self, addr: PeerAddr) -> bool {
        let mut peers = self.peers.write();
        let inserted = peers.insert(addr.clone());
        if inserted {
            info!(peer = %addr, total = peers.len(), "Peer added");
        }
        inserted
    }

    /// Removes a peer. Returns true if it was known.
    pub fn remove(&self, addr: &PeerAddr) -> bool {
        let mut peers = self.peers.write();
        let removed = peers.remove(addr);
        if removed {
            debug!(peer = %addr, total = peers.len(), "Peer removed");
        }
        removed
    }

    /// Returns true if the peer is known.
    pub fn contains(&self, addr: &PeerAddr) -> bool {
        self.peers.read().contains(addr)
    }

    /// Returns a point-in-time copy of all peers, in address order.
    pub fn snapshot(&self) -> Vec<PeerAddr> {
        self.peers.read().iter().cloned().collect()
    }

    /// Returns the number of known peers.
    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    /// Returns true if no peer is known.
    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn addr(s: &str) -> PeerAddr {
        PeerAddr::new(s).unwrap()
    }

    #[test]
    fn test_add_is_idempotent() {
        let registry = PeerRegistry::new();
        assert!(registry.add(addr("a:1")));
        assert!(!registry.add(addr("a:1")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let registry = PeerRegistry::new();
        registry.add(addr("a:1"));
        assert!(registry.remove(&addr("a:1")));
        assert!(!registry.remove(&addr("a:1")));
        assert!(!registry.remove(&addr("never:1")));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let registry = PeerRegistry::new();
        registry.add(addr("b:1"));
        registry.add(addr("a:1"));

        let snapshot = registry.snapshot();
        registry.remove(&addr("a:1"));
        registry.add(addr("c:1"));

        assert_eq!(snapshot, vec![addr("a:1"), addr("b:1")]);
        assert_eq!(registry.snapshot(), vec![addr("b:1"), addr("c:1")]);
    }

    #[test]
    fn test_concurrent_add_remove_snapshot() {
        let registry = Arc::new(PeerRegistry::new());
        let mut handles = Vec::new();

        for t in 0..8 {
            let registry = registry.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..200 {
                    let peer = addr(&format!("host{}:{}", t, i));
                    registry.add(peer.clone());
                    let snapshot = registry.snapshot();
                    // A snapshot is always a sorted set without duplicates
                    assert!(snapshot.windows(2).all(|w| w[0] < w[1]));
                    if i % 2 == 0 {
                        registry.remove(&peer);
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 8 * 100);
    }
}
