//! Ripple Protocol - wire messages for the ripple overlay.
//!
//! This crate defines:
//! - The `hello` / `query` / `fetch` requests and their responses
//! - Typed faults with numeric codes

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod fault;
pub mod messages;

pub use fault::{Fault, FaultCode, ACCESS_DENIED, INTERNAL, INVALID_REQUEST, UNHANDLED};
pub use messages::{Message, MessagePayload, MessageType, RequestId};
