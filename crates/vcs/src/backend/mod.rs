//! Concrete adapters, one per backend.
//!
//! Each adapter holds a [`Description`] by composition and implements every
//! capability trait directly.

pub mod bzr;
pub mod git;
mod git_hooks;
pub mod hg;
pub mod svn;

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::detect::detect_local;
use crate::error::{ErrorKind, VcsError};
use crate::exists::local_repo;
use crate::factory::VcsConfig;
use crate::runner::Ledger;
use crate::types::BackendType;

/// Location descriptor shared by every adapter.
///
/// The remote may be corrected once while the adapter is constructed (adopted
/// from a local clone, or rewritten by a vanity document); the backend never
/// changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description {
    backend: BackendType,
    remote: String,
    local_path: PathBuf,
    remote_name: String,
    schemes: Vec<String>,
    tool: String,
    setup: Ledger,
}

impl Description {
    pub(crate) fn from_config(backend: BackendType, config: &VcsConfig) -> Self {
        let remote_name = match backend {
            BackendType::Git => config
                .remote_name
                .clone()
                .unwrap_or_else(|| "origin".to_string()),
            _ => String::new(),
        };
        let schemes = config
            .schemes
            .clone()
            .unwrap_or_else(|| config.scheme_defaults.for_backend(backend).to_vec());
        let tool = config
            .tool
            .clone()
            .unwrap_or_else(|| backend.tool().to_string());

        Self {
            backend,
            remote: config.remote.clone(),
            local_path: config.local_path.clone(),
            remote_name,
            schemes,
            tool,
            setup: Ledger::new(),
        }
    }

    pub fn backend(&self) -> BackendType {
        self.backend
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    pub fn remote_name(&self) -> &str {
        &self.remote_name
    }

    pub fn schemes(&self) -> &[String] {
        &self.schemes
    }

    /// Executable used for this backend
    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Commands run while the adapter was built
    pub fn setup_results(&self) -> &Ledger {
        &self.setup
    }

    pub(crate) fn record_setup(&mut self, results: Ledger) {
        self.setup.extend(results);
    }

    /// Local path as a tool argument
    pub(crate) fn dir(&self) -> String {
        self.local_path.to_string_lossy().into_owned()
    }

    /// Whether the local path already holds a repository of this backend.
    ///
    /// A repository of another backend is [`VcsError::WrongBackend`].
    pub(crate) fn has_local_repo(&self) -> Result<bool, VcsError> {
        if self.local_path.as_os_str().is_empty() {
            return Ok(false);
        }
        match detect_local(&self.local_path) {
            Ok(found) if found == self.backend => Ok(true),
            Ok(found) => Err(VcsError::WrongBackend {
                expected: self.backend,
                found,
            }),
            Err(e) if e.is(ErrorKind::NotFound) || e.is(ErrorKind::CannotDetect) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// The local repository path, or [`VcsError::NotFound`]
    pub(crate) fn require_local(&self) -> Result<String, VcsError> {
        local_repo(&self.local_path, self.backend)
            .ok_or_else(|| VcsError::path_not_found(&self.local_path))
    }

    /// Compare the remote configured in the local clone with the requested
    /// one: adopt it when none was requested, reject a mismatch.
    pub(crate) fn reconcile_remote(&mut self, configured: Option<String>) -> Result<(), VcsError> {
        match configured {
            None => Ok(()),
            Some(configured) if self.remote.is_empty() => {
                tracing::debug!("Using remote {} configured in {}", configured, self.local_path.display());
                self.remote = configured;
                Ok(())
            }
            Some(configured) if configured == self.remote => Ok(()),
            Some(configured) => Err(VcsError::WrongRemote {
                requested: self.remote.clone(),
                configured,
            }),
        }
    }
}

/// An output pattern compiled on first use; `None` when it does not compile
pub(crate) type Pattern = LazyLock<Option<Regex>>;

pub(crate) fn compile(pattern: &str) -> Option<Regex> {
    Regex::new(pattern)
        .inspect_err(|e| tracing::error!("Invalid output pattern {}: {}", pattern, e))
        .ok()
}

/// First capture group of `pattern` in `output`, trimmed
pub(crate) fn capture_line(pattern: &Pattern, output: &str) -> Option<String> {
    pattern
        .as_ref()?
        .captures(output)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// The revision to pass to a tool, ignoring empty revisions
pub(crate) fn given(rev: Option<&crate::types::Rev>) -> Option<&str> {
    rev.map(|r| r.as_str()).filter(|r| !r.is_empty())
}

macro_rules! impl_describe {
    ($repo:ty) => {
        impl $crate::traits::Describe for $repo {
            fn backend_type(&self) -> $crate::types::BackendType {
                self.desc.backend()
            }

            fn remote(&self) -> &str {
                self.desc.remote()
            }

            fn local_path(&self) -> &std::path::Path {
                self.desc.local_path()
            }

            fn remote_name(&self) -> &str {
                self.desc.remote_name()
            }

            fn schemes(&self) -> &[String] {
                self.desc.schemes()
            }

            fn setup_results(&self) -> &$crate::runner::Ledger {
                self.desc.setup_results()
            }
        }
    };
}

pub(crate) use impl_describe;
