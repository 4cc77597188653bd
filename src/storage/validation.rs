//! Path validation
//!
//! Normalizes storage paths and rejects attempts to escape the storage root.

use crate::error::StorageError;

/// Normalizes a storage path into its canonical relative form.
///
/// Backslashes are treated as separators, empty and `.` segments are dropped
/// and `..` pops the previous segment. The result never starts or ends with a
/// slash; the empty string denotes the storage root.
pub fn normalize_path(path: &str) -> Result<String, StorageError> {
    if path.contains('\0') {
        return Err(StorageError::InvalidPath(path.replace('\0', "\\0")));
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => continue,
            ".." => {
                if segments.pop().is_none() {
                    return Err(StorageError::PathTraversal(path.to_string()));
                }
            }
            other => segments.push(other),
        }
    }

    Ok(segments.join("/"))
}

/// Normalizes a path that must point at a file (not the root).
pub fn normalize_file_path(path: &str) -> Result<String, StorageError> {
    let normalized = normalize_path(path)?;
    if normalized.is_empty() {
        return Err(StorageError::InvalidPath("Empty file path".into()));
    }
    Ok(normalized)
}
