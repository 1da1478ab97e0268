//! Ripple Store - sandboxed local file storage.
//!
//! Each node serves files from a single root directory and writes fetched
//! files back into it. Reads are checked against the sandbox; writes trust
//! the caller to have validated the name.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod config;
pub mod local;

pub use config::StoreConfig;
pub use local::{LocalStore, StoreStats};

use thiserror::Error;

/// Errors from storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No regular file with this name under the root
    #[error("File not found: {0}")]
    NotFound(String),

    /// The name resolves outside the sandbox
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// The file is too large to send in one response
    #[error("File too large: {name} ({size} bytes)")]
    TooLarge {
        /// Requested name
        name: String,
        /// File size on disk
        size: u64,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
