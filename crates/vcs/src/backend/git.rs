//! Git backend
//!
//! Every command runs with `git -C <local path>`, so nothing depends on the
//! process working directory.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::backend::{given, impl_describe, Description};
use crate::detect::is_bare_git;
use crate::error::VcsError;
use crate::exists::{local_repo, probe_remote};
use crate::factory::VcsConfig;
use crate::revision::{ReadScope, Revision, UserRole};
use crate::runner::{self, Ledger};
use crate::traits::*;
use crate::types::*;

/// Field separator in `--format` output
const SEP: char = '\u{1f}';

/// sha, parents, author name/email/time, committer name/email/time,
/// decorations, body
const FULL_FORMAT: &str = "--format=%H%x1f%P%x1f%an%x1f%ae%x1f%at%x1f%cn%x1f%ce%x1f%ct%x1f%D%x1f%B";

/// Git implementation of VCS backend
#[derive(Debug, Clone)]
pub struct GitRepo {
    pub(super) desc: Description,
    pub(super) mirror: bool,
    pub(super) rebase: RebaseMode,
    pub(super) refs: BTreeMap<String, RefOp>,
}

impl_describe!(GitRepo);

impl GitRepo {
    pub fn new(remote: &str, local_path: impl Into<PathBuf>) -> Result<Self, VcsError> {
        Self::from_config(&VcsConfig::new(remote, local_path))
    }

    /// Build the adapter. When the local path already holds a clone its
    /// configured remote is checked against the requested one; in
    /// [`RemoteMode::Update`] the clone is pointed at the requested remote
    /// instead, adding it when the clone has none. The commands run are kept
    /// in [`Describe::setup_results`].
    pub fn from_config(config: &VcsConfig) -> Result<Self, VcsError> {
        let mut desc = Description::from_config(BackendType::Git, config);

        if desc.has_local_repo()? {
            let mut results = Ledger::new();
            let configured = configured_remote(&desc, &mut results)?;
            if config.remote_mode == RemoteMode::Update && !desc.remote().is_empty() {
                point_remote(&desc, configured.as_deref(), &mut results)?;
            } else {
                desc.reconcile_remote(configured)?;
            }
            desc.record_setup(results);
        }

        Ok(Self {
            desc,
            mirror: config.mirror,
            rebase: config.rebase,
            refs: config.refs.clone(),
        })
    }

    pub fn is_mirror(&self) -> bool {
        self.mirror
    }

    fn git(&self, results: &mut Ledger, args: &[&str]) -> Result<String, VcsError> {
        let dir = self.desc.dir();
        let full = ["-C", dir.as_str()].into_iter().chain(args.iter().copied());
        Ok(results.run(self.desc.tool(), full)?.output().to_string())
    }

    fn fetch(&self, results: &mut Ledger) -> Result<(), VcsError> {
        let name = self.desc.remote_name();
        if self.mirror {
            self.git(results, &["remote", "update", "--prune", name])?;
        } else {
            self.git(results, &["fetch", name])?;
        }
        Ok(())
    }

    /// One `fetch` or `update-ref -d` per configured ref, in ref order
    fn update_refs(&self, results: &mut Ledger) -> Result<(), VcsError> {
        let remote_name = self.desc.remote_name();
        for (name, op) in &self.refs {
            match op {
                RefOp::Fetch => {
                    let spec = fetch_refspec(name, remote_name, self.mirror);
                    self.git(results, &["fetch", remote_name, spec.as_str()])?;
                }
                RefOp::Delete => {
                    self.git(results, &["update-ref", "-d", name.as_str()])?;
                }
            }
        }
        Ok(())
    }

    fn read_detail(&self, results: &mut Ledger, revision: &mut Revision, rev: Option<&str>) {
        let mut args = vec!["log", "-1", FULL_FORMAT];
        args.extend(rev);
        match self.git(results, &args) {
            Ok(output) => {
                if !apply_full_log(revision, &output) {
                    tracing::warn!("Unexpected git log output for {}", revision.core());
                }
            }
            Err(e) => tracing::warn!("Could not read details of {}: {}", revision.core(), e),
        }
    }
}

/// `remote.<name>.url` of the local clone; `None` when it is unset
fn configured_remote(desc: &Description, results: &mut Ledger) -> Result<Option<String>, VcsError> {
    let key = format!("remote.{}.url", desc.remote_name());
    let dir = desc.dir();
    match results.run(desc.tool(), ["-C", dir.as_str(), "config", "--get", key.as_str()]) {
        Ok(result) => Ok(Some(result.output().trim().to_string()).filter(|r| !r.is_empty())),
        // `git config --get` exits 1 without output for a missing key
        Err(e) if e.failed_command().is_some_and(|r| r.output().trim().is_empty())
            && utils::shell::is_available(desc.tool()) =>
        {
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Make the clone's remote `desc.remote()`: `set-url` over a different one,
/// `add` when none is configured
fn point_remote(
    desc: &Description,
    configured: Option<&str>,
    results: &mut Ledger,
) -> Result<(), VcsError> {
    let action = match configured {
        Some(configured) if configured == desc.remote() => return Ok(()),
        Some(configured) => {
            tracing::info!("Pointing {} at {} (was {})", desc.remote_name(), desc.remote(), configured);
            "set-url"
        }
        None => {
            tracing::info!("Adding remote {} at {}", desc.remote_name(), desc.remote());
            "add"
        }
    };
    let dir = desc.dir();
    results.run(
        desc.tool(),
        ["-C", dir.as_str(), "remote", action, desc.remote_name(), desc.remote()],
    )?;
    Ok(())
}

/// Refspec fetching `name` from `remote_name`. Outside mirrors, branch heads
/// land under `refs/remotes/<remote_name>/`; every other ref keeps its name.
fn fetch_refspec(name: &str, remote_name: &str, mirror: bool) -> String {
    match name.strip_prefix("refs/heads/") {
        Some(branch) if !mirror && !branch.is_empty() => {
            format!("+{name}:refs/remotes/{remote_name}/{branch}")
        }
        _ => format!("+{name}:{name}"),
    }
}

impl Existence for GitRepo {
    fn exists(&self, location: Location) -> Result<(Option<String>, Ledger), VcsError> {
        match location {
            Location::Local => Ok((local_repo(self.desc.local_path(), BackendType::Git), Ledger::new())),
            Location::Remote => {
                let (found, results) = probe_remote(self.desc.remote(), self.desc.schemes(), |url| {
                    runner::run(self.desc.tool(), ["ls-remote", url])
                })?;
                Ok((Some(found), results))
            }
        }
    }
}

impl Getter for GitRepo {
    fn get(&self, rev: Option<&Rev>) -> Result<Ledger, VcsError> {
        let mut results = Ledger::new();
        let path = self.desc.local_path();

        let mut refresh = false;
        if local_repo(path, BackendType::Git).is_some() {
            if is_bare_git(path) == self.mirror {
                refresh = true;
            } else if path.parent().is_none() {
                return Err(VcsError::Io(std::io::Error::other(format!(
                    "refusing to remove {}",
                    path.display()
                ))));
            } else {
                tracing::warn!(
                    "Removing {} to re-clone it as a {} clone",
                    path.display(),
                    if self.mirror { "mirror" } else { "working" }
                );
                std::fs::remove_dir_all(path)?;
            }
        }

        if refresh {
            self.fetch(&mut results)?;
        } else {
            let name = self.desc.remote_name();
            let (name_flag, name_arg) = if self.mirror || name == "origin" {
                ("", "")
            } else {
                ("-o", name)
            };
            let mirror_flag = if self.mirror { "--mirror" } else { "" };
            let dir = self.desc.dir();
            results.run(
                self.desc.tool(),
                ["clone", name_flag, name_arg, mirror_flag, self.desc.remote(), dir.as_str()],
            )?;
        }

        if let Some(rev) = rev.filter(|r| !r.is_empty()) {
            let set = self
                .rev_set(rev)
                .map_err(|e| e.with_earlier_results(&results))?;
            results.extend(set);
        }
        Ok(results)
    }
}

impl Updater for GitRepo {
    fn update(&self, rev: Option<&Rev>) -> Result<Ledger, VcsError> {
        self.desc.require_local()?;
        let mut results = Ledger::new();
        if !self.refs.is_empty() {
            if let Some(rev) = given(rev) {
                tracing::debug!("Ignoring revision {} while updating named refs", rev);
            }
            self.update_refs(&mut results)?;
            return Ok(results);
        }

        self.fetch(&mut results)?;

        if !self.mirror && !is_bare_git(self.desc.local_path()) {
            let mut args = vec!["pull", self.rebase.as_flag(), self.desc.remote_name()];
            args.extend(given(rev));
            self.git(&mut results, &args)?;
        }
        Ok(results)
    }
}

impl RevSetter for GitRepo {
    fn rev_set(&self, rev: &Rev) -> Result<Ledger, VcsError> {
        self.desc.require_local()?;
        let mut results = Ledger::new();
        self.git(&mut results, &["checkout", rev.as_str()])?;
        Ok(results)
    }
}

impl RevReader for GitRepo {
    fn rev_read(
        &self,
        scope: ReadScope,
        rev: Option<&Rev>,
    ) -> Result<(Vec<Revision>, Ledger), VcsError> {
        self.desc.require_local()?;
        let mut results = Ledger::new();
        let rev = given(rev);

        let mut args = vec!["log", "-1", "--format=%H"];
        args.extend(rev);
        let output = self.git(&mut results, &args)?;
        let mut revision = Revision::new(output.trim());

        if scope == ReadScope::FullDetail {
            self.read_detail(&mut results, &mut revision, rev);
        }
        Ok((vec![revision], results))
    }
}

/// Fill detail fields from [`FULL_FORMAT`] output. Returns false when the
/// output does not have the expected shape.
pub(crate) fn apply_full_log(revision: &mut Revision, output: &str) -> bool {
    let fields: Vec<&str> = output.splitn(10, SEP).collect();
    let [_sha, parents, an, ae, at, cn, ce, ct, decorations, body] = fields[..] else {
        return false;
    };

    revision.set_ancestors(parents.split_whitespace().map(Rev::from).collect());
    revision.set_user_info(UserRole::Author, an, ae);
    revision.set_user_info(UserRole::Committer, cn, ce);
    if let Some(time) = unix_time(at) {
        revision.set_timestamp(UserRole::Author, time);
    }
    if let Some(time) = unix_time(ct) {
        revision.set_timestamp(UserRole::Committer, time);
    }

    let (tags, branches) = split_decorations(decorations);
    revision.set_classified_tags(tags);
    revision.set_branches(branches.into_iter().map(Rev::new).collect());
    revision.set_comment(body.trim_end());
    true
}

fn unix_time(field: &str) -> Option<DateTime<Utc>> {
    field
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// `HEAD -> main, tag: v1.0.0, origin/main, origin/HEAD` into tag names and
/// branch names. Symbolic `HEAD` refs are dropped.
fn split_decorations(decorations: &str) -> (Vec<String>, Vec<String>) {
    let mut tags = Vec::new();
    let mut branches = Vec::new();
    for entry in decorations.split(", ").map(str::trim).filter(|e| !e.is_empty()) {
        if let Some(tag) = entry.strip_prefix("tag: ") {
            tags.push(tag.to_string());
        } else if let Some(branch) = entry.strip_prefix("HEAD -> ") {
            branches.push(branch.to_string());
        } else if entry != "HEAD" && !entry.ends_with("/HEAD") {
            branches.push(entry.to_string());
        }
    }
    (tags, branches)
}
