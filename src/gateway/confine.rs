//! Path confinement - the only door from a proposed target to the filesystem
//!
//! Targets are resolved component by component against the canonical root.
//! Every prefix that exists on disk is canonicalized as it is reached, so
//! symlinks and `..` are both resolved before the containment check, and the
//! check itself compares path components rather than string prefixes.

use std::path::{Component, Path, PathBuf};

use crate::error::{GatewayError, Result};

/// Resolve `target` against `root`, rejecting anything that lands outside it.
///
/// The returned path is absolute and is either `root` itself or has `root`
/// as an ancestor. The target does not need to exist.
pub fn confine(root: &Path, target: &str) -> Result<PathBuf> {
    let root = root.canonicalize()?;
    confine_canonical(&root, target)
}

/// Same as [`confine`] for a root that is already canonical.
pub fn confine_canonical(root: &Path, target: &str) -> Result<PathBuf> {
    let resolved = resolve(root, target).ok_or_else(|| reject(root, target))?;

    if resolved.starts_with(root) {
        Ok(resolved)
    } else {
        Err(reject(root, target))
    }
}

fn reject(root: &Path, target: &str) -> GatewayError {
    log::warn!(
        "Rejected target '{}': resolves outside {}",
        target,
        root.display()
    );
    GatewayError::PathTraversal {
        target: target.to_string(),
    }
}

/// Walk the target's components on top of `root`. Returns None for a dangling
/// symlink, whose destination cannot be checked.
fn resolve(root: &Path, target: &str) -> Option<PathBuf> {
    let mut resolved = root.to_path_buf();

    for component in Path::new(target).components() {
        match component {
            Component::Prefix(prefix) => resolved = PathBuf::from(prefix.as_os_str()),
            Component::RootDir => resolved.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            Component::Normal(part) => {
                resolved.push(part);
                match resolved.canonicalize() {
                    Ok(canonical) => resolved = canonical,
                    Err(_) if is_symlink(&resolved) => return None,
                    // Not on disk yet; nothing to resolve
                    Err(_) => {}
                }
            }
        }
    }

    Some(resolved)
}

fn is_symlink(path: &Path) -> bool {
    std::fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}
