//! Ripple Node - the query-flooding protocol.
//!
//! A node answers file queries from its sandbox, or floods them to known
//! peers with a bounded hop history:
//! - [`PeerRegistry`]: known peers, pruned on failure
//! - [`QueryRouter`]: local-first resolution, then sequential broadcast
//! - [`AccessGate`]: secret-gated fetch into the local sandbox
//! - [`NodeService`] / [`Node`]: RPC dispatch and service lifecycle

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod bootstrap;
pub mod gate;
pub mod node;
pub mod registry;
pub mod router;
pub mod service;

#[cfg(test)]
mod testing;

pub use bootstrap::{parse_seeds, read_seed_file};
pub use gate::AccessGate;
pub use node::{Node, NodeConfig};
pub use registry::PeerRegistry;
pub use router::QueryRouter;
pub use service::NodeService;

use ripple_core::AddrError;
use ripple_net::TransportError;
use ripple_proto::{Fault, FaultCode};
use ripple_store::StoreError;
use thiserror::Error;

pub use ripple_core::DEFAULT_MAX_HISTORY;

/// Failure of a query or fetch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Nobody within the hop budget could answer
    #[error("Couldn't handle the query")]
    Unhandled,

    /// Wrong secret or sandbox escape
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Local storage failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<StoreError> for QueryError {
    fn from(err: StoreError) -> Self {
        match err {
            // Only reachable when a caller skips the router's broadcast step
            StoreError::NotFound(_) => QueryError::Unhandled,
            StoreError::AccessDenied(name) => QueryError::AccessDenied(name),
            // Answered like a miss so the asking peer is kept
            StoreError::TooLarge { .. } => QueryError::Unhandled,
            StoreError::Io(e) => QueryError::Storage(e.to_string()),
        }
    }
}

impl From<QueryError> for Fault {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Unhandled => Fault::unhandled(),
            QueryError::AccessDenied(_) => Fault::access_denied(),
            QueryError::Storage(message) => Fault::new(FaultCode::Internal, message),
        }
    }
}

/// Errors from starting or bootstrapping a node.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Storage setup failed
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Server setup failed
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unparseable seed file entry
    #[error("Invalid seed on line {line}: {source}")]
    InvalidSeed {
        /// 1-based line number
        line: usize,
        /// Parse failure
        source: AddrError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_error_to_fault() {
        assert_eq!(Fault::from(QueryError::Unhandled).code, FaultCode::Unhandled);
        assert_eq!(
            Fault::from(QueryError::AccessDenied("x".into())).code,
            FaultCode::AccessDenied
        );
        assert_eq!(
            Fault::from(QueryError::Storage("disk".into())).code,
            FaultCode::Internal
        );
    }

    #[test]
    fn test_store_error_to_query_error() {
        let too_large = StoreError::TooLarge {
            name: "big.iso".into(),
            size: u64::MAX,
        };
        assert_eq!(QueryError::from(too_large), QueryError::Unhandled);
        assert!(matches!(
            QueryError::from(StoreError::AccessDenied("x".into())),
            QueryError::AccessDenied(_)
        ));
    }

    #[test]
    fn test_access_denied_fault_hides_name() {
        let fault = Fault::from(QueryError::AccessDenied("../etc/passwd".into()));
        assert!(!fault.message.contains("passwd"));
    }
}
