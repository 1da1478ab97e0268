//! Storage configuration.

use std::path::PathBuf;

use ripple_core::MAX_CONTENT_SIZE;

/// Storage configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Sandbox root directory
    pub root: PathBuf,
    /// Create the root directory when opening
    pub create_if_missing: bool,
    /// Largest file served, in bytes
    pub max_file_size: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(".ripple/files"),
            create_if_missing: true,
            max_file_size: MAX_CONTENT_SIZE as u64,
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with the given root.
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            ..Default::default()
        }
    }

    /// Creates the root directory if configured to.
    pub fn create_dirs(&self) -> std::io::Result<()> {
        if self.create_if_missing {
            std::fs::create_dir_all(&self.root)?;
        }
        Ok(())
    }
}
