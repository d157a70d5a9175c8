//! Mercurial backend

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

const SEP: char = '\u{1f}';

static DEFAULT_PATH: Pattern = LazyLock::new(|| compile(r"(?m)^default\s*=\s*(.+)$"));

/// Parent ids of a root revision
const NULL_NODE: &str = "0000000000000000000000000000000000000000";

/// Mercurial implementation of VCS backend
#[derive(Debug, Clone)]
pub struct HgRepo {
    desc: Description,
}

impl_describe!(HgRepo);

impl HgRepo {
    pub fn new(remote: &str, local_path: impl Into<PathBuf>) -> Result<Self, VcsError> {
        Self::from_config(&VcsConfig::new(remote, local_path))
    }

    pub fn from_config(config: &VcsConfig) -> Result<Self, VcsError> {
        let mut desc = Description::from_config(BackendType::Hg, config);
        if desc.has_local_repo()? {
            let dir = desc.dir();
            let mut results = Ledger::new();
            let output = results.run(desc.tool(), ["-R", dir.as_str(), "paths"])?.output().to_string();
            desc.reconcile_remote(capture_line(&DEFAULT_PATH, &output))?;
            desc.record_setup(results);
        }
        Ok(Self { desc })
    }

    fn hg(&self, results: &mut Ledger, args: &[&str]) -> Result<String, VcsError> {
        let dir = self.desc.dir();
        let full = ["-R", dir.as_str()].into_iter().chain(args.iter().copied());
        Ok(results.run(self.desc.tool(), full)?.output().to_string())
    }
}

impl HookManager for HgRepo {}

impl Existence for HgRepo {
    fn exists(&self, location: Location) -> Result<(Option<String>, Ledger), VcsError> {
        match location {
            Location::Local => Ok((local_repo(self.desc.local_path(), BackendType::Hg), Ledger::new())),
            Location::Remote => {
                let (found, results) = probe_remote(self.desc.remote(), self.desc.schemes(), |url| {
                    runner::run(self.desc.tool(), ["identify", url])
                })?;
                Ok((Some(found), results))
            }
        }
    }
}

impl Getter for HgRepo {
    fn get(&self, rev: Option<&Rev>) -> Result<Ledger, VcsError> {
        let mut results = Ledger::new();
        let dir = self.desc.dir();
        let (flag, rev) = match given(rev) {
            Some(rev) => ("-u", rev),
            None => ("", ""),
        };
        results.run(self.desc.tool(), ["clone", flag, rev, self.desc.remote(), dir.as_str()])?;
        Ok(results)
    }
}

impl Updater for HgRepo {
    fn update(&self, rev: Option<&Rev>) -> Result<Ledger, VcsError> {
        self.desc.require_local()?;
        let mut results = Ledger::new();
        self.hg(&mut results, &["pull"])?;

        let mut args = vec!["update"];
        if let Some(rev) = given(rev) {
            args.extend(["-r", rev]);
        }
        self.hg(&mut results, &args)?;
        Ok(results)
    }
}

impl RevSetter for HgRepo {
    fn rev_set(&self, rev: &Rev) -> Result<Ledger, VcsError> {
        self.desc.require_local()?;
        let mut results = Ledger::new();
        self.hg(&mut results, &["update", "-r", rev.as_str()])?;
        Ok(results)
    }
}

impl RevReader for HgRepo {
    fn rev_read(
        &self,
        scope: ReadScope,
        rev: Option<&Rev>,
    ) -> Result<(Vec<Revision>, Ledger), VcsError> {
        self.desc.require_local()?;
        let mut results = Ledger::new();
        let rev = given(rev);

        // `--debug` prints the full 40-digit node, matching `{node}` below
        let mut args = vec!["identify", "--debug", "-i"];
        if let Some(rev) = rev {
            args.extend(["-r", rev]);
        }
        let output = self.hg(&mut results, &args)?;
        let mut revision = Revision::new(identify_id(&output));

        if scope == ReadScope::FullDetail {
            let template = full_template();
            let args = ["log", "-l", "1", "-r", rev.unwrap_or("."), "--template", template.as_str()];
            match self.hg(&mut results, &args) {
                Ok(output) => {
                    if !apply_full_log(&mut revision, &output) {
                        tracing::warn!("Unexpected hg log output for {}", revision.core());
                    }
                }
                Err(e) => tracing::warn!("Could not read details of {}: {}", revision.core(), e),
            }
        }
        Ok((vec![revision], results))
    }
}

/// `3f690c91af37+ tip` -> `3f690c91af37`; `identify -i` prints the id alone
fn identify_id(output: &str) -> &str {
    output
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .trim_end_matches('+')
}

fn full_template() -> String {
    [
        "{node}",
        "{p1node} {p2node}",
        "{author|person}",
        "{author|email}",
        "{date|hgdate}",
        "{tags}",
        "{branch}",
        "{bookmarks}",
        "{desc}",
    ]
    .join("\u{1f}")
}

/// Fill detail fields from [`full_template`] output
fn apply_full_log(revision: &mut Revision, output: &str) -> bool {
    let fields: Vec<&str> = output.splitn(9, SEP).collect();
    let [_node, parents, person, email, date, tags, branch, bookmarks, desc] = fields[..] else {
        return false;
    };

    revision.set_ancestors(
        parents
            .split_whitespace()
            .filter(|p| *p != NULL_NODE)
            .map(Rev::from)
            .collect(),
    );
    revision.set_user_info(UserRole::Both, person, email);
    if let Some(time) = hgdate(date) {
        revision.set_timestamp(UserRole::Both, time);
    }
    revision.set_classified_tags(tags.split_whitespace().filter(|t| *t != "tip"));

    let mut branches = vec![Rev::new(branch.trim())];
    branches.extend(bookmarks.split_whitespace().map(Rev::from));
    revision.set_branches(branches);
    revision.set_comment(desc.trim_end());
    true
}

/// `1440288517 25200`: unix seconds followed by the zone offset
fn hgdate(field: &str) -> Option<DateTime<Utc>> {
    field
        .split_whitespace()
        .next()?
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}
