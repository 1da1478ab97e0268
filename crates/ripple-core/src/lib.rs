//! Ripple Core - shared types for the ripple query-flooding overlay.
//!
//! This crate provides:
//! - Peer addresses and flood history
//! - The write-capability secret
//! - Sandbox containment checks
//! - Canonical encoding for wire messages

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod encoding;
pub mod identifiers;
pub mod keys;
pub mod sandbox;

pub use encoding::{CanonicalDecode, CanonicalEncode, DecodeError};
pub use identifiers::{AddrError, History, PeerAddr};
pub use keys::WriteSecret;

/// Protocol version carried in logs and the operator banner.
pub const PROTOCOL_VERSION: u32 = 1;

/// A flood stops once its history would reach this many nodes.
pub const DEFAULT_MAX_HISTORY: usize = 6;

/// Length of generated write secrets.
pub const DEFAULT_SECRET_LENGTH: usize = 100;

/// Default listen port for the daemon.
pub const DEFAULT_LISTEN_PORT: u16 = 4242;

/// Largest frame accepted on the wire (64 MiB).
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Largest file a node serves. Leaves room for the response envelope.
pub const MAX_CONTENT_SIZE: usize = MAX_FRAME_SIZE - 1024;
