//! Ripple Network - request/response transport.
//!
//! Implements the RPC boundary between nodes:
//! - Length-prefixed framing over TCP
//! - A [`PeerClient`] trait with a TCP implementation
//! - An RPC server with explicit start and graceful shutdown

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod client;
pub mod framing;
pub mod server;
pub mod transport;

pub use client::TcpPeerClient;
pub use server::{RequestHandler, RpcServer, ServerHandle};
pub use transport::{CallError, PeerClient, TransportConfig, TransportError};

/// Default connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Default per-hop call timeout in seconds.
///
/// A query is granted this much for every hop its flood may still travel.
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 10;

/// Default time a server waits for the request frame in seconds.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 10;
