//! Absolute path handling for the content tree.
//!
//! Paths are slash-delimited strings. The root is exactly `/` and every
//! other path starts with `/` and carries no trailing slash.

use crate::error::{CoreError, Result};

/// Path of the root node.
pub const ROOT: &str = "/";

/// Whether `path` is absolute (starts with `/`).
pub fn is_absolute(path: &str) -> bool {
    path.starts_with('/')
}

/// Whether `path` addresses the root node.
pub fn is_root(path: &str) -> bool {
    path == ROOT
}

/// Normalize an absolute path: drop trailing slashes and collapse
/// repeated separators. Relative paths are rejected.
pub fn normalize(path: &str) -> Result<String> {
    if !is_absolute(path) {
        return Err(CoreError::NotAbsolute(path.to_string()));
    }
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return Ok(ROOT.to_string());
    }
    Ok(format!("/{}", segments.join("/")))
}

/// Parent path, or `None` for the root.
pub fn parent(path: &str) -> Option<&str> {
    if is_root(path) {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some(ROOT),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

/// Last segment of a path. The root has an empty name.
pub fn name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Append a relative path to an absolute one.
pub fn join(base: &str, relative: &str) -> String {
    let relative = relative.trim_matches('/');
    if relative.is_empty() {
        return base.to_string();
    }
    if is_root(base) {
        format!("/{relative}")
    } else {
        format!("{}/{relative}", base.trim_end_matches('/'))
    }
}

/// Ancestor chain of `path`, nearest first, ending at the root.
pub fn ancestors(path: &str) -> Vec<String> {
    let mut chain = Vec::new();
    let mut current = parent(path);
    while let Some(p) = current {
        chain.push(p.to_string());
        current = parent(p);
    }
    chain
}

/// Whether `path` lies strictly beneath `ancestor`.
pub fn is_descendant_of(path: &str, ancestor: &str) -> bool {
    if is_root(ancestor) {
        return !is_root(path) && is_absolute(path);
    }
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && path.as_bytes()[ancestor.len()] == b'/'
}

/// Check that `name` is usable as a single path segment.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        return Err(CoreError::InvalidName(name.to_string()));
    }
    Ok(())
}
