//! Bazaar backend

use std::path::PathBuf;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};

use crate::backend::{capture_line, compile, given, impl_describe, Description, Pattern};
use crate::error::VcsError;
use crate::exists::{local_repo, probe_remote};
use crate::factory::VcsConfig;
use crate::revision::{ReadScope, Revision, UserRole};
use crate::runner::{self, Ledger};
use crate::traits::*;
use crate::types::*;

static PARENT_BRANCH: Pattern = LazyLock::new(|| compile(r"parent branch: (.+)"));

/// Bazaar implementation of VCS backend
#[derive(Debug, Clone)]
pub struct BzrRepo {
    desc: Description,
}

impl_describe!(BzrRepo);

impl BzrRepo {
    pub fn new(remote: &str, local_path: impl Into<PathBuf>) -> Result<Self, VcsError> {
        Self::from_config(&VcsConfig::new(remote, local_path))
    }

    /// A branch's parent is only adopted when no remote was given; it is
    /// never compared against one.
    pub fn from_config(config: &VcsConfig) -> Result<Self, VcsError> {
        let mut desc = Description::from_config(BackendType::Bzr, config);
        if desc.has_local_repo()? && desc.remote().is_empty() {
            let dir = desc.dir();
            let mut results = Ledger::new();
            let output = results.run(desc.tool(), ["info", dir.as_str()])?.output().to_string();
            desc.reconcile_remote(capture_line(&PARENT_BRANCH, &output))?;
            desc.record_setup(results);
        }
        Ok(Self { desc })
    }
}

impl HookManager for BzrRepo {}

impl Existence for BzrRepo {
    fn exists(&self, location: Location) -> Result<(Option<String>, Ledger), VcsError> {
        match location {
            Location::Local => Ok((local_repo(self.desc.local_path(), BackendType::Bzr), Ledger::new())),
            Location::Remote => {
                let (found, results) = probe_remote(self.desc.remote(), self.desc.schemes(), |url| {
                    runner::run(self.desc.tool(), ["info", url])
                })?;
                Ok((Some(found), results))
            }
        }
    }
}

impl Getter for BzrRepo {
    fn get(&self, rev: Option<&Rev>) -> Result<Ledger, VcsError> {
        let mut results = Ledger::new();
        let dir = self.desc.dir();
        let (flag, rev) = match given(rev) {
            Some(rev) => ("-r", rev),
            None => ("", ""),
        };
        results.run(self.desc.tool(), ["branch", flag, rev, self.desc.remote(), dir.as_str()])?;
        Ok(results)
    }
}

impl Updater for BzrRepo {
    fn update(&self, rev: Option<&Rev>) -> Result<Ledger, VcsError> {
        let dir = self.desc.require_local()?;
        let mut results = Ledger::new();
        results.run(self.desc.tool(), ["pull", "-d", dir.as_str()])?;

        let (flag, rev) = match given(rev) {
            Some(rev) => ("-r", rev),
            None => ("", ""),
        };
        results.run(self.desc.tool(), ["update", flag, rev, dir.as_str()])?;
        Ok(results)
    }
}

impl RevSetter for BzrRepo {
    fn rev_set(&self, rev: &Rev) -> Result<Ledger, VcsError> {
        let dir = self.desc.require_local()?;
        let mut results = Ledger::new();
        results.run(self.desc.tool(), ["update", "-r", rev.as_str(), dir.as_str()])?;
        Ok(results)
    }
}

impl RevReader for BzrRepo {
    fn rev_read(
        &self,
        scope: ReadScope,
        rev: Option<&Rev>,
    ) -> Result<(Vec<Revision>, Ledger), VcsError> {
        let dir = self.desc.require_local()?;
        let mut results = Ledger::new();
        let rev = given(rev);

        let args = match rev {
            Some(rev) => ["revno", "-r", rev, dir.as_str()],
            None => ["revno", "--tree", "", dir.as_str()],
        };
        let core = results.run(self.desc.tool(), args)?.output().trim().to_string();
        let mut revision = Revision::new(core);

        if scope == ReadScope::FullDetail {
            let (flag, rev) = match rev {
                Some(rev) => ("-r", rev),
                None => ("", ""),
            };
            match results.run(self.desc.tool(), ["log", "-l", "1", flag, rev, dir.as_str()]) {
                Ok(result) => {
                    if !apply_log(&mut revision, result.output()) {
                        tracing::warn!("Unexpected bzr log output for {}", revision.core());
                    }
                }
                Err(e) => tracing::warn!("Could not read details of {}: {}", revision.core(), e),
            }
        }
        Ok((vec![revision], results))
    }
}

/// Fill detail fields from a `bzr log -l 1` entry. Returns false, leaving
/// the revision untouched, when the entry has no `revno:` line.
fn apply_log(revision: &mut Revision, output: &str) -> bool {
    let mut saw_revno = false;
    let mut committer = None;
    let mut author = None;
    let mut branch = None;
    let mut tags = None;
    let mut timestamp = None;
    let mut message = Vec::new();
    let mut in_message = false;

    for line in output.lines() {
        if in_message {
            match line.strip_prefix("  ") {
                Some(text) => message.push(text),
                None if line.trim().is_empty() => message.push(""),
                None => break,
            }
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key {
            "revno" => saw_revno = true,
            "committer" => committer = Some(split_person(value)),
            "author" => author = Some(split_person(value)),
            "branch nick" => branch = Some(value),
            "tags" => tags = Some(value),
            "timestamp" => match DateTime::parse_from_str(value, "%a %Y-%m-%d %H:%M:%S %z") {
                Ok(time) => timestamp = Some(time.with_timezone(&Utc)),
                Err(e) => tracing::warn!("Unparsable bzr timestamp {:?}: {}", value, e),
            },
            "message" => in_message = true,
            _ => {}
        }
    }
    if !saw_revno {
        return false;
    }

    if let Some(branch) = branch {
        revision.set_branches(vec![Rev::new(branch)]);
    }
    if let Some(tags) = tags {
        revision.set_classified_tags(tags.split(", ").map(str::trim).filter(|t| !t.is_empty()));
    }
    if let Some(time) = timestamp {
        revision.set_timestamp(UserRole::Both, time);
    }
    if let Some((name, id)) = committer {
        revision.set_user_info(UserRole::Both, name, id);
    }
    if let Some((name, id)) = author {
        revision.set_user_info(UserRole::Author, name, id);
    }
    revision.set_comment(message.join("\n").trim_end());
    true
}

/// `Ada Lovelace <ada@example.com>` into name and email
fn split_person(value: &str) -> (String, String) {
    match value.rsplit_once('<') {
        Some((name, rest)) => (
            name.trim().to_string(),
            rest.trim_end_matches('>').trim().to_string(),
        ),
        None => (value.to_string(), value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const LOG: &str = "\
------------------------------------------------------------
revno: 42 [merge]
tags: 1.4.0, stable
author: Ada Lovelace <ada@example.com>
committer: Grace Hopper <grace@example.com>
branch nick: trunk
timestamp: Sat 2015-08-22 17:08:37 -0700
message:
  Merge the widget work

  Includes the parser fix.
";

    #[test]
    fn test_log_entry() {
        let mut rev = Revision::new("42");
        assert!(apply_log(&mut rev, LOG));

        assert_eq!(rev.sem_vers().unwrap(), [Rev::new("1.4.0")]);
        assert_eq!(rev.tags().unwrap(), [Rev::new("stable")]);
        assert_eq!(rev.branches().unwrap(), [Rev::new("trunk")]);
        assert_eq!(rev.user_info(UserRole::Author).unwrap().name, "Ada Lovelace");
        assert_eq!(rev.user_info(UserRole::Committer).unwrap().id, "grace@example.com");
        assert_eq!(
            rev.timestamp(UserRole::Author),
            Some(Utc.with_ymd_and_hms(2015, 8, 23, 0, 8, 37).unwrap())
        );
        assert_eq!(rev.comment(), Some("Merge the widget work\n\nIncludes the parser fix."));
    }

    #[test]
    fn test_committer_only_fills_both_roles() {
        let log = "revno: 3\ncommitter: Ada <ada@example.com>\nmessage:\n  one\n";
        let mut rev = Revision::new("3");
        assert!(apply_log(&mut rev, log));
        assert_eq!(rev.user_info(UserRole::Author).unwrap().id, "ada@example.com");
        assert_eq!(rev.user_info(UserRole::Committer).unwrap().name, "Ada");
        assert_eq!(rev.comment(), Some("one"));
    }

    #[test]
    fn test_without_revno_is_rejected() {
        let mut rev = Revision::new("3");
        assert!(!apply_log(&mut rev, "bzr: ERROR: Not a branch\n"));
        assert!(rev.is_core_only());

        let without_revno = "tags: 1.4.0\nbranch nick: trunk\ntimestamp: Sat 2015-08-22 17:08:37 -0700\n";
        assert!(!apply_log(&mut rev, without_revno));
        assert!(rev.is_core_only());
        assert!(rev.branches().is_none());
    }

    #[test]
    fn test_split_person() {
        assert_eq!(
            split_person("Ada Lovelace <ada@example.com>"),
            ("Ada Lovelace".to_string(), "ada@example.com".to_string())
        );
        assert_eq!(split_person("ada"), ("ada".to_string(), "ada".to_string()));
    }
}
