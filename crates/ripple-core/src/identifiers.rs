//! Peer addresses and flood history.
//!
//! A node is identified by the address it listens on. The same string is used
//! as its advertised identity in flood histories and as the dial target for
//! remote calls.

use std::fmt;
use std::str::FromStr;

use bytes::{Bytes, BytesMut};
use thiserror::Error;

use crate::encoding::{CanonicalDecode, CanonicalEncode, DecodeError};

/// Error returned for unusable peer addresses.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddrError {
    /// Empty or whitespace-only address
    #[error("Empty peer address")]
    Empty,

    /// Address carries no port
    #[error("Peer address has no port: {0}")]
    MissingPort(String),
}

/// Network address of a node, used both as identity and as dial target.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeerAddr(String);

impl PeerAddr {
    /// Creates an address, trimming surrounding whitespace.
    pub fn new(addr: impl AsRef<str>) -> Result<Self, AddrError> {
        let addr = addr.as_ref().trim();
        if addr.is_empty() {
            return Err(AddrError::Empty);
        }
        let peer = Self(addr.to_string());
        let target = peer.dial_target();
        match target.rsplit_once(':') {
            Some((_, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => {
                Ok(peer)
            }
            _ => Err(AddrError::MissingPort(addr.to_string())),
        }
    }

    /// Returns the address as given.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the `host:port` part to connect to.
    ///
    /// URL-style addresses (`http://host:port/`) are accepted so that seed
    /// files written for other tools keep working.
    pub fn dial_target(&self) -> &str {
        let rest = match self.0.split_once("://") {
            Some((_, rest)) => rest,
            None => &self.0,
        };
        rest.split('/').next().unwrap_or(rest)
    }

    /// Returns the port component.
    pub fn port(&self) -> Option<u16> {
        self.dial_target()
            .rsplit_once(':')
            .and_then(|(_, port)| port.parse().ok())
    }
}

impl fmt::Debug for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerAddr({})", self.0)
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PeerAddr {
    type Err = AddrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl From<std::net::SocketAddr> for PeerAddr {
    fn from(addr: std::net::SocketAddr) -> Self {
        Self(addr.to_string())
    }
}

impl AsRef<str> for PeerAddr {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl CanonicalEncode for PeerAddr {
    fn encode(&self, buf: &mut BytesMut) {
        self.0.encode(buf);
    }
}

impl CanonicalDecode for PeerAddr {
    fn decode(buf: &mut Bytes) -> Result<Self, DecodeError> {
        let raw = String::decode(buf)?;
        Self::new(&raw).map_err(|e| DecodeError::Custom(e.to_string()))
    }
}

/// Ordered trail of nodes already visited by one flood.
///
/// Each forwarding node appends its own address before contacting peers, so
/// the length doubles as the hop count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History(Vec<PeerAddr>);

impl History {
    /// Creates an empty history for a freshly originated query.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Returns a copy of this history with `addr` appended.
    pub fn extended(&self, addr: &PeerAddr) -> Self {
        let mut hops = Vec::with_capacity(self.0.len() + 1);
        hops.extend_from_slice(&self.0);
        hops.push(addr.clone());
        Self(hops)
    }

    /// Returns true if `addr` was already visited.
    pub fn contains(&self, addr: &PeerAddr) -> bool {
        self.0.contains(addr)
    }

    /// Returns the number of visited nodes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if nothing was visited yet.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the visited addresses in visiting order.
    pub fn as_slice(&self) -> &[PeerAddr] {
        &self.0
    }
}

impl From<Vec<PeerAddr>> for History {
    fn from(hops: Vec<PeerAddr>) -> Self {
        Self(hops)
    }
}

impl CanonicalEncode for History {
    fn encode(&self, buf: &mut BytesMut) {
        self.0.encode(buf);
    }
}

impl CanonicalDecode for History {
    fn decode(buf: &mut Bytes) -> Result<Self, DecodeError> {
        Ok(Self(Vec::<PeerAddr>::decode(buf)?))
    }
}
