//! Backend detection from an on-disk directory.

use std::path::Path;

use crate::error::VcsError;
use crate::types::BackendType;

/// Marker priority for working copies
const MARKER_ORDER: [BackendType; 4] = [
    BackendType::Git,
    BackendType::Svn,
    BackendType::Hg,
    BackendType::Bzr,
];

/// Detect the backend of the repository at `path`.
///
/// A missing path is [`VcsError::NotFound`]; an existing path without any
/// marker is [`VcsError::CannotDetect`].
pub fn detect_local(path: &Path) -> Result<BackendType, VcsError> {
    if !path.exists() {
        return Err(VcsError::path_not_found(path));
    }

    for backend in MARKER_ORDER {
        if path.join(backend.marker_dir()).exists() {
            tracing::debug!("Found {} marker in {}", backend, path.display());
            return Ok(backend);
        }
    }

    if is_bare_git(path) {
        tracing::debug!("Found bare git repository at {}", path.display());
        return Ok(BackendType::Git);
    }

    Err(VcsError::cannot_detect(format!(
        "no repository markers in {}",
        path.display()
    )))
}

/// Bare and mirror clones have no `.git`; they carry `refs/` and `config` at
/// the top level instead.
pub fn is_bare_git(path: &Path) -> bool {
    !path.join(BackendType::Git.marker_dir()).exists()
        && path.join("refs").is_dir()
        && path.join("config").is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn test_missing_path_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = detect_local(&temp.path().join("absent")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_empty_dir_cannot_be_detected() {
        let temp = TempDir::new().unwrap();
        let err = detect_local(temp.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CannotDetect);
    }

    #[test]
    fn test_each_marker_dir() {
        for backend in BackendType::ALL {
            let temp = TempDir::new().unwrap();
            std::fs::create_dir(temp.path().join(backend.marker_dir())).unwrap();
            assert_eq!(detect_local(temp.path()).unwrap(), backend);
        }
    }

    #[test]
    fn test_git_marker_wins_over_svn() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join(".svn")).unwrap();
        std::fs::create_dir(temp.path().join(".git")).unwrap();
        assert_eq!(detect_local(temp.path()).unwrap(), BackendType::Git);
    }

    #[test]
    fn test_bare_markers() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("refs")).unwrap();
        assert!(!is_bare_git(temp.path()));
        assert!(detect_local(temp.path()).is_err());

        std::fs::write(temp.path().join("config"), "[core]\n\tbare = true\n").unwrap();
        assert!(is_bare_git(temp.path()));
        assert_eq!(detect_local(temp.path()).unwrap(), BackendType::Git);
    }
}
