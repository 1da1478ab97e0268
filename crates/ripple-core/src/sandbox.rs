//! Sandbox containment checks.
//!
//! Every file a node reads or writes must live strictly inside its root
//! directory. Names coming off the wire are joined onto the root unchanged,
//! so `..` segments, absolute names and symlinks are only caught here.

use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Returns true iff `candidate` lies strictly inside `root`.
///
/// Both paths are made absolute and canonical first, following symlinks the
/// same way the OS does when the path is opened. Paths that do not exist yet
/// are resolved through their deepest existing ancestor, so the check also
/// works for files about to be created. Comparison is per path component:
/// `/srv/root-other` is not inside `/srv/root`.
pub fn contains(root: &Path, candidate: &Path) -> bool {
    match (resolve(root), resolve(candidate)) {
        (Some(root), Some(candidate)) => candidate != root && candidate.starts_with(&root),
        _ => false,
    }
}

/// Resolves a path to absolute canonical form without requiring it to exist.
///
/// Returns `None` when the missing part of the path contains a `..`
/// segment, since it cannot be resolved without knowing what would be
/// created there.
pub fn resolve(path: &Path) -> Option<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    // `..` is resolved by the OS against the real parent, never lexically.
    for ancestor in absolute.ancestors() {
        let Ok(real) = fs::canonicalize(ancestor) else {
            continue;
        };
        let rest = absolute.strip_prefix(ancestor).ok()?;
        let mut resolved = real;
        for component in rest.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        return Some(resolved);
    }
    None
}
