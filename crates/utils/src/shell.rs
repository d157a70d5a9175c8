//! Helpers for locating external tool binaries.

use std::path::{Path, PathBuf};

/// Resolve `name` to an executable path.
///
/// Names containing a path separator are treated as paths and only checked
/// for existence; bare names are looked up on `PATH`.
pub fn resolve_executable_path_blocking(name: &str) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }

    let candidate = Path::new(name);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    match which::which(name) {
        Ok(path) => Some(path),
        Err(err) => {
            tracing::trace!(tool = name, "executable lookup failed: {}", err);
            None
        }
    }
}

/// Returns true when `name` resolves to an executable.
pub fn is_available(name: &str) -> bool {
    resolve_executable_path_blocking(name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_name_is_not_resolved() {
        assert!(resolve_executable_path_blocking("").is_none());
    }

    #[test]
    fn test_missing_tool_is_not_resolved() {
        assert!(!is_available("definitely-not-a-real-tool-4f1c"));
    }

    #[test]
    fn test_explicit_path_is_checked_for_existence() {
        let dir = tempfile::TempDir::new().unwrap();
        let tool = dir.path().join("tool");
        let tool_str = tool.to_str().unwrap().to_string();
        assert!(resolve_executable_path_blocking(&tool_str).is_none());

        std::fs::write(&tool, "#!/bin/sh\nexit 0\n").unwrap();
        assert_eq!(resolve_executable_path_blocking(&tool_str), Some(tool));
    }
}
