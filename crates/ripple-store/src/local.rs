//! Local sandboxed file store.

use std::fs;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use parking_lot::RwLock;
use ripple_core::{sandbox, MAX_CONTENT_SIZE};
use tracing::{debug, warn};

use crate::{StoreConfig, StoreError};

/// Files served by a node, rooted at its sandbox directory.
pub struct LocalStore {
    root: PathBuf,
    max_file_size: u64,
    /// Statistics tracking
    stats: RwLock<StoreStats>,
}

/// Statistics for the local store.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Reads answered with content
    pub hits: u64,
    /// Reads of names that do not exist
    pub misses: u64,
    /// Reads refused for leaving the sandbox
    pub denied: u64,
    /// Reads refused for exceeding the size limit
    pub oversized: u64,
    /// Files written
    pub writes: u64,
    /// Bytes written
    pub bytes_written: u64,
}

impl LocalStore {
    /// Opens the store described by `config`.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        config.create_dirs()?;
        Ok(Self::new(config.root.clone()).with_max_file_size(config.max_file_size))
    }

    /// Creates a store over an existing root directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_file_size: MAX_CONTENT_SIZE as u64,
            stats: RwLock::new(StoreStats::default()),
        }
    }

    /// Sets the largest file `read` will return.
    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    /// Returns the sandbox root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the on-disk path for `name`, without any checks.
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Returns true if `name` stays strictly inside the sandbox.
    pub fn is_contained(&self, name: &str) -> bool {
        sandbox::contains(&self.root, &self.path_of(name))
    }

    /// Reads the file `name`.
    ///
    /// Existence is checked before containment: a name that does not resolve
    /// to a regular file is `NotFound` even when it would also escape the
    /// sandbox. Files over the size limit are `TooLarge`.
    pub fn read(&self, name: &str) -> Result<Bytes, StoreError> {
        let path = self.path_of(name);

        if !path.is_file() {
            self.stats.write().misses += 1;
            return Err(StoreError::NotFound(name.to_string()));
        }

        if !sandbox::contains(&self.root, &path) {
            self.stats.write().denied += 1;
            return Err(StoreError::AccessDenied(name.to_string()));
        }

        let size = fs::metadata(&path)?.len();
        if size > self.max_file_size {
            self.stats.write().oversized += 1;
            warn!(name, size, limit = self.max_file_size, "Refusing to serve oversized file");
            return Err(StoreError::TooLarge {
                name: name.to_string(),
                size,
            });
        }

        let content = Bytes::from(fs::read(&path)?);
        self.stats.write().hits += 1;

        debug!(name, size = content.len(), "Read local file");
        Ok(content)
    }

    /// Writes `content` to `name`, replacing any existing file.
    ///
    /// Missing parent directories are created. No containment check is made.
    pub fn write(&self, name: &str, content: &[u8]) -> Result<(), StoreError> {
        let path = self.path_of(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;

        {
            let mut stats = self.stats.write();
            stats.writes += 1;
            stats.bytes_written += content.len() as u64;
        }

        debug!(name, size = content.len(), "Wrote local file");
        Ok(())
    }

    /// Returns a snapshot of the store statistics.
    pub fn stats(&self) -> StoreStats {
        self.stats.read().clone()
    }
}
