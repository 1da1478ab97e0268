//! Seed files.
//!
//! One peer address per line. Blank lines and lines starting with `#` are
//! ignored.

use std::path::Path;

use ripple_core::PeerAddr;

use crate::NodeError;

/// Parses seed file contents.
pub fn parse_seeds(contents: &str) -> Result<Vec<PeerAddr>, NodeError> {
    let mut seeds = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let addr = PeerAddr::new(line).map_err(|source| NodeError::InvalidSeed {
            line: index + 1,
            source,
        })?;
        seeds.push(addr);
    }
    Ok(seeds)
}

/// Reads and parses a seed file.
pub fn read_seed_file(path: impl AsRef<Path>) -> Result<Vec<PeerAddr>, NodeError> {
    let contents = std::fs::read_to_string(path)?;
    parse_seeds(&contents)
}
