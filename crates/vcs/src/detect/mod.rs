//! Backend-type detection.
//!
//! Precedence is explicit type, then the remote, then the local directory.
//! The remote is consulted even when a local checkout exists, since the
//! checkout may have to be recreated under another backend. Local detection
//! only runs when remote detection ends in [`VcsError::CannotDetect`]; a
//! transport failure is reported as such.

pub mod http;
pub mod local;
pub mod remote;
pub mod vanity;

use std::path::Path;
use std::sync::Arc;

use url::Url;

use crate::error::VcsError;
use crate::types::BackendType;

pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use local::{detect_local, is_bare_git};
pub use remote::{default_rules, CheckFn, HostRule, Resolution};

use remote::RuleMatch;

/// Detection engine: an ordered host-rule table plus the HTTP client used by
/// secondary checks and vanity resolution
#[derive(Clone)]
pub struct Detector {
    rules: Arc<Vec<HostRule>>,
    client: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Detector")
            .field("rules", &self.rules.len())
            .finish_non_exhaustive()
    }
}

impl Detector {
    /// Default host table and a `reqwest` client
    pub fn new() -> Result<Self, VcsError> {
        Ok(Self::with_client(Arc::new(ReqwestClient::new()?)))
    }

    /// Default host table with a caller supplied client
    pub fn with_client(client: Arc<dyn HttpClient>) -> Self {
        Self::with_rules(default_rules(), client)
    }

    pub fn with_rules(rules: Vec<HostRule>, client: Arc<dyn HttpClient>) -> Self {
        Self {
            rules: Arc::new(rules),
            client,
        }
    }

    pub fn rules(&self) -> &[HostRule] {
        &self.rules
    }

    /// Resolve the backend for a remote/local pair.
    ///
    /// Returns the backend and the remote to use, which differs from
    /// `remote` only when a vanity document redirected it.
    pub fn detect(
        &self,
        remote: &str,
        local_path: &Path,
        explicit: Option<BackendType>,
    ) -> Result<(BackendType, String), VcsError> {
        if let Some(backend) = explicit {
            return Ok((backend, remote.to_string()));
        }

        match self.detect_remote(remote) {
            Ok(found) => return Ok(found),
            Err(VcsError::CannotDetect(reason)) => {
                tracing::debug!("Remote detection failed for {:?}: {}", remote, reason);
            }
            Err(e) => return Err(e),
        }

        if local_path.as_os_str().is_empty() {
            return Err(VcsError::cannot_detect(format!(
                "{remote:?} is not recognised and no local path was given"
            )));
        }

        let backend = detect_local(local_path)?;
        Ok((backend, remote.to_string()))
    }

    /// Remote-only detection: host table, extension rule, then the vanity
    /// document for `http`/`https` remotes.
    pub fn detect_remote(&self, remote: &str) -> Result<(BackendType, String), VcsError> {
        let url = match Url::parse(remote) {
            Ok(url) if url.host_str().is_some_and(|h| !h.is_empty()) => url,
            _ => {
                return Err(VcsError::cannot_detect(format!(
                    "{remote:?} has no host to match"
                )));
            }
        };

        let host = host_with_port(&url);
        let host_path = host_and_path(&url);

        if let RuleMatch::Found(backend) =
            remote::match_rules(&self.rules, &host, &host_path, self.client.as_ref())?
        {
            return Ok((backend, remote.to_string()));
        }

        if !matches!(url.scheme(), "http" | "https") {
            return Err(VcsError::cannot_detect(format!(
                "{remote:?} matches no host rule and {} has no vanity document",
                url.scheme()
            )));
        }
        vanity::resolve(self.client.as_ref(), &url)
    }
}

fn host_with_port(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

/// `host[:port]` followed by the path, without a trailing bare `/` root
pub(crate) fn host_and_path(url: &Url) -> String {
    let path = url.path();
    let path = if path == "/" { "" } else { path };
    format!("{}{}", host_with_port(url), path)
}
