//! Git hook installation.
//!
//! Hooks live in `<repo>/.git/hooks` for working clones and `<repo>/hooks`
//! for bare clones.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::backend::git::GitRepo;
use crate::detect::is_bare_git;
use crate::error::VcsError;
use crate::traits::{Describe, HookManager};
use crate::types::InstallMode;

impl GitRepo {
    /// Directory holding the hooks of the local clone
    pub fn hooks_dir(&self) -> Result<PathBuf, VcsError> {
        let repo = PathBuf::from(self.desc.require_local()?);
        Ok(if is_bare_git(&repo) {
            repo.join("hooks")
        } else {
            repo.join(".git").join("hooks")
        })
    }
}

impl HookManager for GitRepo {
    fn install(&self, source: &Path, name: &str, mode: InstallMode) -> Result<PathBuf, VcsError> {
        let dir = self.hooks_dir()?;
        if !source.is_file() {
            return Err(VcsError::path_not_found(source));
        }
        fs::create_dir_all(&dir)?;

        let target = dir.join(name);
        if target.symlink_metadata().is_ok() {
            fs::remove_file(&target)?;
        }

        match mode {
            InstallMode::Symlink => symlink(source, &target)?,
            InstallMode::Copy => {
                fs::copy(source, &target)?;
                set_executable(&target)?;
            }
        }

        tracing::debug!(
            "Installed {} hook {} from {} ({:?})",
            self.backend_type(),
            target.display(),
            source.display(),
            mode
        );
        Ok(target)
    }

    fn installed(&self, source: &Path, name: &str, mode: InstallMode) -> Result<bool, VcsError> {
        let target = self.hooks_dir()?.join(name);
        let Ok(meta) = target.symlink_metadata() else {
            return Ok(false);
        };

        Ok(match mode {
            InstallMode::Symlink => {
                meta.file_type().is_symlink()
                    && fs::read_link(&target).is_ok_and(|linked| linked == source)
            }
            InstallMode::Copy => {
                meta.is_file()
                    && matches!(
                        (digest(&target), digest(source)),
                        (Ok(installed), Ok(wanted)) if installed == wanted
                    )
            }
        })
    }

    fn remove(&self, name: &str) -> Result<(), VcsError> {
        let target = self.hooks_dir()?.join(name);
        match fs::remove_file(&target) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Hex SHA-256 of a file's contents
fn digest(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

#[cfg(unix)]
fn symlink(source: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(source, target)
}

#[cfg(windows)]
fn symlink(source: &Path, target: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(source, target)
}

#[cfg(unix)]
fn set_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o775))
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}
