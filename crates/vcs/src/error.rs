use std::path::Path;
use thiserror::Error;

use crate::runner::{CommandResult, Ledger};
use crate::types::BackendType;

/// Errors that can occur during VCS operations
#[derive(Debug, Error)]
pub enum VcsError {
    /// No repository at the checked location. Remote existence checks attach
    /// the ledger of every probe that was attempted.
    #[error("repository does not exist: {location}")]
    NotFound { location: String, results: Ledger },

    #[error("wrong VCS detected: expected {expected}, found {found}")]
    WrongBackend {
        expected: BackendType,
        found: BackendType,
    },

    #[error("remote {requested:?} does not match the configured remote {configured:?}")]
    WrongRemote {
        requested: String,
        configured: String,
    },

    #[error("cannot detect VCS: {0}")]
    CannotDetect(String),

    #[error("{capability} is not implemented for {backend}")]
    NotImplemented {
        backend: BackendType,
        capability: &'static str,
    },

    /// The external tool could not be started or exited non-zero. The last
    /// ledger entry is the failing invocation.
    #[error("{reason}: {}", .results.last().map(|r| r.command()).unwrap_or_default())]
    ToolFailure { reason: String, results: Ledger },

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error taxonomy, one kind per [`VcsError`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    WrongBackend,
    WrongRemote,
    CannotDetect,
    NotImplemented,
    ToolFailure,
    Transport,
    Io,
}

impl VcsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::WrongBackend { .. } => ErrorKind::WrongBackend,
            Self::WrongRemote { .. } => ErrorKind::WrongRemote,
            Self::CannotDetect(_) => ErrorKind::CannotDetect,
            Self::NotImplemented { .. } => ErrorKind::NotImplemented,
            Self::ToolFailure { .. } => ErrorKind::ToolFailure,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind() == kind
    }

    /// Create a NotFound error for a local path, with no probe history
    pub fn path_not_found(path: &Path) -> Self {
        Self::NotFound {
            location: path.display().to_string(),
            results: Ledger::new(),
        }
    }

    pub fn cannot_detect(reason: impl Into<String>) -> Self {
        Self::CannotDetect(reason.into())
    }

    /// Create a Transport error from any error type
    pub fn transport<E: std::fmt::Display>(error: E) -> Self {
        Self::Transport(error.to_string())
    }

    /// The invocation that caused a [`VcsError::ToolFailure`].
    pub fn failed_command(&self) -> Option<&CommandResult> {
        match self {
            Self::ToolFailure { results, .. } => results.last(),
            _ => None,
        }
    }

    /// Ledger carried by the error, if any.
    pub fn results(&self) -> Option<&Ledger> {
        match self {
            Self::ToolFailure { results, .. } | Self::NotFound { results, .. } => Some(results),
            _ => None,
        }
    }

    /// Prepend `earlier` to the ledger carried by this error so the caller
    /// sees the whole operation, not only the failing step.
    pub(crate) fn with_earlier_results(self, earlier: &Ledger) -> Self {
        match self {
            Self::ToolFailure { reason, results } => Self::ToolFailure {
                reason,
                results: earlier.clone().merged(results),
            },
            Self::NotFound { location, results } => Self::NotFound {
                location,
                results: earlier.clone().merged(results),
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(
            VcsError::cannot_detect("no match").kind(),
            ErrorKind::CannotDetect
        );
        assert_eq!(
            VcsError::transport("connection refused").kind(),
            ErrorKind::Transport
        );
        assert!(VcsError::path_not_found(Path::new("/nope")).is(ErrorKind::NotFound));
        assert!(
            VcsError::WrongBackend {
                expected: BackendType::Git,
                found: BackendType::Hg,
            }
            .is(ErrorKind::WrongBackend)
        );
    }

    #[test]
    fn test_tool_failure_exposes_failing_command() {
        let mut results = Ledger::new();
        results.add(CommandResult::new("git ls-remote https://a", ""));
        results.add(CommandResult::new("git ls-remote http://a", "fatal"));
        let err = VcsError::ToolFailure {
            reason: "exit status: 128".into(),
            results,
        };

        assert_eq!(
            err.failed_command().map(|r| r.command()),
            Some("git ls-remote http://a")
        );
        assert_eq!(err.to_string(), "exit status: 128: git ls-remote http://a");
    }

    #[test]
    fn test_earlier_results_are_prepended() {
        let mut earlier = Ledger::new();
        earlier.add(CommandResult::new("git clone a b", ""));
        let mut failing = Ledger::new();
        failing.add(CommandResult::new("git checkout v1", "error"));
        let err = VcsError::ToolFailure {
            reason: "exit status: 1".into(),
            results: failing,
        }
        .with_earlier_results(&earlier);

        let commands: Vec<_> = err
            .results()
            .unwrap()
            .all()
            .iter()
            .map(|r| r.command().to_string())
            .collect();
        assert_eq!(commands, vec!["git clone a b", "git checkout v1"]);
    }
}
