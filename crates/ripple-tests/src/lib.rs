//! Integration and end-to-end tests for ripple.
//!
//! This crate provides:
//! - A multi-node test harness running real nodes over loopback TCP
//! - End-to-end tests for peer introduction, flooding and fetch

pub mod harness;
pub mod node;

pub use harness::TestNetwork;
pub use node::{CountingClient, TestNode, TestNodeConfig};
