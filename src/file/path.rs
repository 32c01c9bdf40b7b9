//! Slash-delimited path helpers.
//!
//! All entry paths in Depot are relative, `/`-separated and never start or
//! end with a separator. The root directory is the empty string.

use super::{MAX_NAME_LENGTH, PLACEHOLDER_NAME};
use crate::{DepotError, Result};

/// Validate a single file or directory name (one path segment).
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(DepotError::Validation("name must not be empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(DepotError::Validation(format!(
            "name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(DepotError::Validation(format!(
            "name must not contain path separators: {name}"
        )));
    }
    if name == "." || name == ".." {
        return Err(DepotError::Validation(format!(
            "name must not be a relative path segment: {name}"
        )));
    }
    if name == PLACEHOLDER_NAME {
        return Err(DepotError::Validation(format!(
            "name {PLACEHOLDER_NAME} is reserved"
        )));
    }
    Ok(())
}

/// Normalize a path: strip surrounding separators and validate every
/// segment. Returns the empty string for the root.
pub fn normalize(path: &str) -> Result<String> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(String::new());
    }

    let segments: Vec<&str> = trimmed.split('/').collect();
    for segment in &segments {
        if segment.is_empty() {
            return Err(DepotError::InvalidOperation(format!(
                "malformed path: {path}"
            )));
        }
        validate_name(segment)?;
    }

    Ok(segments.join("/"))
}

/// The parent path of a normalized path ("" for root-level entries).
pub fn parent(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some((parent, _)) => parent,
        None => "",
    }
}

/// The final segment of a normalized path.
pub fn leaf(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some((_, leaf)) => leaf,
        None => path,
    }
}

/// Join a directory path and a name. The root directory joins to the bare
/// name.
pub fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

/// Check whether `candidate` equals `root` or lies inside its subtree.
pub fn is_within(candidate: &str, root: &str) -> bool {
    candidate == root || candidate.starts_with(&format!("{root}/"))
}
