use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The supported version-control backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    Git,
    Hg,
    Svn,
    Bzr,
}

impl BackendType {
    pub const ALL: [BackendType; 4] = [
        BackendType::Git,
        BackendType::Hg,
        BackendType::Svn,
        BackendType::Bzr,
    ];

    /// The name used for this backend in remote URLs, vanity-import
    /// documents and conventional path suffixes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Git => "git",
            Self::Hg => "hg",
            Self::Svn => "svn",
            Self::Bzr => "bzr",
        }
    }

    /// Default command-line tool for this backend
    pub fn tool(&self) -> &'static str {
        self.as_str()
    }

    /// Metadata directory found at the root of a working copy
    pub fn marker_dir(&self) -> &'static str {
        match self {
            Self::Git => ".git",
            Self::Hg => ".hg",
            Self::Svn => ".svn",
            Self::Bzr => ".bzr",
        }
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown backend name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownBackend(pub String);

impl fmt::Display for UnknownBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown VCS backend: {:?}", self.0)
    }
}

impl std::error::Error for UnknownBackend {}

impl FromStr for BackendType {
    type Err = UnknownBackend;

    /// Exact, case-sensitive match on the four backend names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BackendType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownBackend(s.to_string()))
    }
}

/// Where an existence check looks for a repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Local,
    Remote,
}

/// A single backend revision: a sha, revno, changeset id, tag, branch...
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rev(String);

impl Rev {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Rev {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Rev {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Rev {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// How a mismatch between the requested remote and a local clone's
/// configured remote is handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteMode {
    /// Report [`crate::VcsError::WrongRemote`]
    #[default]
    Check,
    /// Point the local clone at the requested remote (git only)
    Update,
}

/// Rebase behaviour for git pulls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RebaseMode {
    /// Leave it to the user's git configuration
    #[default]
    User,
    False,
    True,
    Merges,
}

impl RebaseMode {
    pub(crate) fn as_flag(&self) -> &'static str {
        match self {
            Self::User => "",
            Self::False => "--rebase=false",
            Self::True => "--rebase=true",
            Self::Merges => "--rebase=merges",
        }
    }
}

/// What a git update does with one named ref
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefOp {
    /// Force-fetch the ref from the remote
    Fetch,
    /// Delete the ref from the local clone
    Delete,
}

/// How a hook is placed into a repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallMode {
    Symlink,
    Copy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_names_round_trip_through_from_str() {
        for backend in BackendType::ALL {
            assert_eq!(backend.as_str().parse::<BackendType>(), Ok(backend));
        }
    }

    #[test]
    fn test_backend_from_str_rejects_unknown_and_mixed_case() {
        assert!("cvs".parse::<BackendType>().is_err());
        assert!("Git".parse::<BackendType>().is_err());
        assert!("".parse::<BackendType>().is_err());
    }

    #[test]
    fn test_backend_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&BackendType::Hg).unwrap(), "\"hg\"");
        let parsed: BackendType = serde_json::from_str("\"bzr\"").unwrap();
        assert_eq!(parsed, BackendType::Bzr);
    }

    #[test]
    fn test_ref_op_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&RefOp::Delete).unwrap(), "\"delete\"");
        let parsed: RefOp = serde_json::from_str("\"fetch\"").unwrap();
        assert_eq!(parsed, RefOp::Fetch);
    }
}
