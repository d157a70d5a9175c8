//! Existence checks shared by the adapters.
//!
//! A remote with no scheme is probed once per default scheme, in order, and
//! the first reachable URL wins. Every probe lands in the ledger whatever its
//! outcome.

use std::path::Path;

use crate::detect::is_bare_git;
use crate::error::VcsError;
use crate::runner::{CommandResult, Ledger};
use crate::types::BackendType;

/// The scheme of `remote` when it is written as `scheme://...`
pub fn scheme_of(remote: &str) -> Option<&str> {
    let (scheme, _) = remote.split_once("://")?;
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

/// Find a reachable form of `remote`.
///
/// With an explicit scheme the remote is probed as is. Otherwise each of
/// `schemes` is prefixed in turn until `probe` succeeds. Returns the URL that
/// answered and the ledger of every probe, or [`VcsError::NotFound`] carrying
/// that ledger when nothing answered.
pub fn probe_remote<F>(
    remote: &str,
    schemes: &[String],
    mut probe: F,
) -> Result<(String, Ledger), VcsError>
where
    F: FnMut(&str) -> Result<CommandResult, VcsError>,
{
    let mut results = Ledger::new();
    if remote.is_empty() {
        return Err(VcsError::NotFound {
            location: String::new(),
            results,
        });
    }

    let candidates: Vec<String> = match scheme_of(remote) {
        Some(_) => vec![remote.to_string()],
        None => schemes
            .iter()
            .map(|scheme| format!("{scheme}://{remote}"))
            .collect(),
    };

    for candidate in candidates {
        match probe(&candidate) {
            Ok(result) => {
                results.add(result);
                tracing::debug!("Remote found at {}", candidate);
                return Ok((candidate, results));
            }
            Err(VcsError::ToolFailure { results: failed, .. }) => {
                tracing::trace!("Remote probe failed for {}", candidate);
                results.extend(failed);
            }
            Err(e) => return Err(e.with_earlier_results(&results)),
        }
    }

    Err(VcsError::NotFound {
        location: remote.to_string(),
        results,
    })
}

/// The local path when it holds a working copy (or, for git, a bare clone)
/// of `backend`
pub(crate) fn local_repo(path: &Path, backend: BackendType) -> Option<String> {
    if path.as_os_str().is_empty() {
        return None;
    }
    let found = path.join(backend.marker_dir()).exists()
        || (backend == BackendType::Git && is_bare_git(path));
    found.then(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn schemes(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    /// Succeeds only for URLs using one of `reachable`
    fn fake_probe(reachable: &'static [&'static str]) -> impl FnMut(&str) -> Result<CommandResult, VcsError> {
        move |url: &str| {
            let command = format!("git ls-remote {url}");
            if reachable.iter().any(|s| url.starts_with(&format!("{s}://"))) {
                Ok(CommandResult::new(command, "abc\tHEAD\n"))
            } else {
                let mut results = Ledger::new();
                results.add(CommandResult::new(command, "fatal: unable to access\n"));
                Err(VcsError::ToolFailure {
                    reason: "git exited with exit status: 128".into(),
                    results,
                })
            }
        }
    }

    #[test]
    fn test_scheme_of() {
        assert_eq!(scheme_of("https://github.com/a/b"), Some("https"));
        assert_eq!(scheme_of("git+ssh://host/a"), Some("git+ssh"));
        assert_eq!(scheme_of("github.com/a/b"), None);
        assert_eq!(scheme_of("git@github.com:a/b"), None);
        assert_eq!(scheme_of("://nothing"), None);
    }

    #[test]
    fn test_stops_at_first_success_in_order() {
        let (found, results) = probe_remote(
            "example.com/repo",
            &schemes(&["https", "http", "git", "git+ssh"]),
            fake_probe(&["http", "git"]),
        )
        .unwrap();

        assert_eq!(found, "http://example.com/repo");
        let commands: Vec<_> = results.all().iter().map(|r| r.command()).collect();
        assert_eq!(
            commands,
            vec![
                "git ls-remote https://example.com/repo",
                "git ls-remote http://example.com/repo"
            ]
        );
    }

    #[test]
    fn test_owner_repo_over_ssh() {
        let (found, results) =
            probe_remote("owner/repo", &schemes(&["https", "ssh"]), fake_probe(&["ssh"])).unwrap();
        assert_eq!(found, "ssh://owner/repo");
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_explicit_scheme_is_probed_once() {
        let err = probe_remote(
            "https://example.com/repo",
            &schemes(&["http", "ssh"]),
            fake_probe(&["http"]),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.results().unwrap().len(), 1);
    }

    #[test]
    fn test_exhausted_schemes_report_every_probe() {
        let err = probe_remote("example.com/repo", &schemes(&["https", "http", "ssh"]), fake_probe(&[]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.results().unwrap().len(), 3);
    }

    #[test]
    fn test_empty_remote_is_not_found_without_probing() {
        let mut calls = 0;
        let err = probe_remote("", &schemes(&["https"]), |_| {
            calls += 1;
            Ok(CommandResult::new("x", ""))
        })
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(calls, 0);
    }
}
