//! Transport errors, configuration and the peer client trait.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use ripple_core::{DecodeError, History, PeerAddr};
use ripple_proto::Fault;
use thiserror::Error;

/// Transport errors.
///
/// None of these reach the originator of a flood: a peer that fails at the
/// transport level is treated as unreachable.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Connect or call timeout
    #[error("Timeout")]
    Timeout,

    /// Frame exceeds the size limit
    #[error("Frame too large: {0} bytes")]
    FrameTooLarge(usize),

    /// Frame body could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Well-formed but unexpected response
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of a failed remote call.
#[derive(Debug, Error)]
pub enum CallError {
    /// The peer answered with a fault
    #[error("Remote fault: {0}")]
    Fault(#[from] Fault),

    /// The peer could not be reached or spoke nonsense
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl CallError {
    /// Returns the fault if the peer answered with one.
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            CallError::Fault(fault) => Some(fault),
            CallError::Transport(_) => None,
        }
    }

    /// Returns true if the peer answered with an `Unhandled` fault.
    pub fn is_unhandled(&self) -> bool {
        self.fault().map_or(false, Fault::is_unhandled)
    }

    /// Returns true if the call ran out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CallError::Transport(TransportError::Timeout))
    }
}

/// Transport configuration.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Time allowed to establish a connection
    pub connect_timeout: Duration,
    /// Time allowed for one hop. Hello and fetch calls get one hop; a query
    /// gets one hop for every hop left in its flood.
    pub call_timeout: Duration,
    /// Time a server waits for a request after accepting a connection
    pub idle_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(crate::DEFAULT_CONNECT_TIMEOUT_SECS),
            call_timeout: Duration::from_secs(crate::DEFAULT_CALL_TIMEOUT_SECS),
            idle_timeout: Duration::from_secs(crate::DEFAULT_IDLE_TIMEOUT_SECS),
        }
    }
}

impl TransportConfig {
    /// Time allowed for a call whose flood may still travel `hops` hops.
    pub fn flood_budget(&self, hops: usize) -> Duration {
        self.call_timeout
            .saturating_mul(u32::try_from(hops).unwrap_or(u32::MAX))
    }
}

/// Synchronous call/response access to remote nodes.
#[async_trait]
pub trait PeerClient: Send + Sync {
    /// Announces `address` to `peer`.
    async fn hello(&self, peer: &PeerAddr, address: &PeerAddr) -> Result<(), CallError>;

    /// Asks `peer` to resolve `name`, passing the flood history along.
    ///
    /// The call fails with a timeout once `budget` has elapsed.
    async fn query(
        &self,
        peer: &PeerAddr,
        name: &str,
        history: &History,
        budget: Duration,
    ) -> Result<Bytes, CallError>;

    /// Asks `peer` to fetch `name` into its own sandbox.
    async fn fetch(&self, peer: &PeerAddr, name: &str, secret: &str) -> Result<(), CallError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_error_classification() {
        let unhandled = CallError::from(Fault::unhandled());
        assert!(unhandled.is_unhandled());
        assert!(unhandled.fault().is_some());

        let denied = CallError::from(Fault::access_denied());
        assert!(!denied.is_unhandled());

        let timeout = CallError::from(TransportError::Timeout);
        assert!(!timeout.is_unhandled());
        assert!(timeout.is_timeout());
        assert!(timeout.fault().is_none());
        assert!(!denied.is_timeout());
    }

    #[test]
    fn test_default_timeouts_are_bounded() {
        let config = TransportConfig::default();
        assert!(config.connect_timeout <= config.call_timeout);
        assert!(config.call_timeout > Duration::ZERO);
    }
}
