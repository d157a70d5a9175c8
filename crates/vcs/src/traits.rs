use crate::error::VcsError;
use crate::revision::{ReadScope, Revision};
use crate::runner::Ledger;
use crate::types::*;
use std::path::{Path, PathBuf};

/// Identity and location of a repository
///
/// Every capability trait has this as its supertrait, so a caller holding
/// only a `dyn Getter` can still ask where the repository lives.
pub trait Describe {
    /// Resolved backend, fixed for the lifetime of the value
    fn backend_type(&self) -> BackendType;

    /// Remote location, possibly empty
    fn remote(&self) -> &str;

    /// Working copy path
    fn local_path(&self) -> &Path;

    /// Backend name for the remote (git's `origin`), empty where the backend
    /// has no such concept
    fn remote_name(&self) -> &str;

    /// URL schemes tried, in order, when the remote has none
    fn schemes(&self) -> &[String];

    /// Commands run while the value was constructed: reading the local
    /// clone's configured remote, or rewriting it
    fn setup_results(&self) -> &Ledger;
}

/// Existence checks
pub trait Existence: Describe {
    /// Check whether the repository exists locally or remotely.
    ///
    /// A local miss is `Ok((None, ledger))`. A remote miss is
    /// [`VcsError::NotFound`] carrying the ledger of every probe tried.
    /// On success the string is the path or URL the repository was found at.
    fn exists(&self, location: Location) -> Result<(Option<String>, Ledger), VcsError>;
}

/// First-time acquisition of a working copy
pub trait Getter: Describe {
    /// Acquire the repository into the local path, optionally at `rev`.
    ///
    /// Calling this on an already populated path is backend defined: git
    /// refreshes in place, the others let the tool report the conflict.
    fn get(&self, rev: Option<&Rev>) -> Result<Ledger, VcsError>;
}

/// Refresh of an existing working copy
pub trait Updater: Describe {
    /// Pull remote changes, then move to `rev` when given
    fn update(&self, rev: Option<&Rev>) -> Result<Ledger, VcsError>;
}

/// Move the working state to one named revision
pub trait RevSetter: Describe {
    fn rev_set(&self, rev: &Rev) -> Result<Ledger, VcsError>;
}

/// Revision metadata reads
pub trait RevReader: Describe {
    /// Read the current revision, or `rev` when given.
    ///
    /// [`ReadScope::CoreOnly`] fills only the core identifier;
    /// [`ReadScope::FullDetail`] also fills what the backend can report.
    fn rev_read(
        &self,
        scope: ReadScope,
        rev: Option<&Rev>,
    ) -> Result<(Vec<Revision>, Ledger), VcsError>;
}

/// Hook management. Only git supports hooks; the provided methods report
/// [`VcsError::NotImplemented`].
pub trait HookManager: Describe {
    /// Install `source` as hook `name`, replacing any existing hook.
    /// Returns the installed hook path.
    fn install(&self, source: &Path, name: &str, mode: InstallMode) -> Result<PathBuf, VcsError> {
        let _ = (source, name, mode);
        Err(VcsError::NotImplemented {
            backend: self.backend_type(),
            capability: "hook install",
        })
    }

    /// Whether hook `name` is installed from `source` with `mode`
    fn installed(&self, source: &Path, name: &str, mode: InstallMode) -> Result<bool, VcsError> {
        let _ = (source, name, mode);
        Err(VcsError::NotImplemented {
            backend: self.backend_type(),
            capability: "hook check",
        })
    }

    /// Remove hook `name`; a missing hook is not an error
    fn remove(&self, name: &str) -> Result<(), VcsError> {
        let _ = name;
        Err(VcsError::NotImplemented {
            backend: self.backend_type(),
            capability: "hook removal",
        })
    }
}

/// Combined trait representing a full VCS backend
///
/// Implemented for every type that implements all capabilities. Callers that
/// need a subset should take the narrower trait instead.
pub trait VcsBackend:
    Existence + Getter + Updater + RevSetter + RevReader + HookManager + Send + Sync
{
    /// Get a human-readable description of this backend
    fn description(&self) -> String {
        if self.remote().is_empty() {
            format!("{} repository at {}", self.backend_type(), self.local_path().display())
        } else {
            format!(
                "{} repository at {} (remote {})",
                self.backend_type(),
                self.local_path().display(),
                self.remote()
            )
        }
    }
}

impl<T> VcsBackend for T where
    T: Existence + Getter + Updater + RevSetter + RevReader + HookManager + Send + Sync
{
}
