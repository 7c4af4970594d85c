//! Lexical path rules shared by the store and the server's configuration
//! layer. Nothing here touches the filesystem: request paths are judged by
//! their components alone, so a path that does not exist yet can still be
//! confined before any directory is created for it.
use std::path::{Component, Path, PathBuf};

use crate::error::StoreError;

/// Drops `.` components and folds `..` into its parent. A `..` that would
/// climb above a relative path's start is kept; one at the filesystem root is
/// discarded, matching how the OS resolves `/..`.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Resolves `requested` against `base` and requires the result to sit strictly
/// below `root`.
pub fn confine(base: &Path, root: &Path, requested: &str) -> Result<PathBuf, StoreError> {
    let requested_path = Path::new(requested);
    let candidate = if requested_path.is_absolute() {
        requested_path.to_path_buf()
    } else {
        base.join(requested_path)
    };
    let resolved = normalize_lexically(&candidate);
    let root = normalize_lexically(root);

    if resolved == root || !resolved.starts_with(&root) {
        return Err(StoreError::validation(format!(
            "path '{requested}' is outside the shader directory"
        )));
    }
    Ok(resolved)
}

/// Accepts identifiers that name exactly one directory entry.
pub fn plain_component<'a>(value: &'a str, label: &str) -> Result<&'a str, StoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StoreError::validation(format!("{label} must not be empty")));
    }

    let mut components = Path::new(trimmed).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !trimmed.contains(['/', '\\']) => Ok(trimmed),
        _ => Err(StoreError::validation(format!(
            "{label} '{value}' is not a valid directory name"
        ))),
    }
}
