//! Subversion backend
//!
//! `svn` takes the working copy as a location argument. `svnversion` reads
//! the current directory, so it runs as a child process started in the
//! working copy.

use std::path::{Path, PathBuf};
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

static URL_LINE: Pattern = LazyLock::new(|| compile(r"(?m)^URL: (.+)$"));

/// Subversion implementation of VCS backend
#[derive(Debug, Clone)]
pub struct SvnRepo {
    desc: Description,
}

impl_describe!(SvnRepo);

impl SvnRepo {
    pub fn new(remote: &str, local_path: impl Into<PathBuf>) -> Result<Self, VcsError> {
        Self::from_config(&VcsConfig::new(remote, local_path))
    }

    pub fn from_config(config: &VcsConfig) -> Result<Self, VcsError> {
        let mut desc = Description::from_config(BackendType::Svn, config);
        if desc.has_local_repo()? {
            let dir = desc.dir();
            let mut results = Ledger::new();
            let output = results.run(desc.tool(), ["info", dir.as_str()])?.output().to_string();
            desc.reconcile_remote(capture_line(&URL_LINE, &output))?;
            desc.record_setup(results);
        }
        Ok(Self { desc })
    }

    /// `svnversion` from the directory of a configured `svn` path, or from
    /// `PATH`
    fn svnversion(&self) -> String {
        let tool = Path::new(self.desc.tool());
        match tool.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => {
                dir.join("svnversion").to_string_lossy().into_owned()
            }
            _ => "svnversion".to_string(),
        }
    }
}

impl HookManager for SvnRepo {}

impl Existence for SvnRepo {
    fn exists(&self, location: Location) -> Result<(Option<String>, Ledger), VcsError> {
        match location {
            Location::Local => Ok((local_repo(self.desc.local_path(), BackendType::Svn), Ledger::new())),
            Location::Remote => {
                let (found, results) = probe_remote(self.desc.remote(), self.desc.schemes(), |url| {
                    runner::run(self.desc.tool(), ["info", url])
                })?;
                Ok((Some(found), results))
            }
        }
    }
}

impl Getter for SvnRepo {
    fn get(&self, rev: Option<&Rev>) -> Result<Ledger, VcsError> {
        let mut results = Ledger::new();
        let dir = self.desc.dir();
        let (flag, rev) = match given(rev) {
            Some(rev) => ("-r", rev),
            None => ("", ""),
        };
        results.run(
            self.desc.tool(),
            ["checkout", flag, rev, self.desc.remote(), dir.as_str()],
        )?;
        Ok(results)
    }
}

impl Updater for SvnRepo {
    fn update(&self, rev: Option<&Rev>) -> Result<Ledger, VcsError> {
        let dir = self.desc.require_local()?;
        let (flag, rev) = match given(rev) {
            Some(rev) => ("-r", rev),
            None => ("", ""),
        };
        let mut results = Ledger::new();
        results.run(self.desc.tool(), ["update", flag, rev, dir.as_str()])?;
        Ok(results)
    }
}

impl RevSetter for SvnRepo {
    fn rev_set(&self, rev: &Rev) -> Result<Ledger, VcsError> {
        let dir = self.desc.require_local()?;
        let mut results = Ledger::new();
        results.run(self.desc.tool(), ["update", "-r", rev.as_str(), dir.as_str()])?;
        Ok(results)
    }
}

impl RevReader for SvnRepo {
    fn rev_read(
        &self,
        scope: ReadScope,
        rev: Option<&Rev>,
    ) -> Result<(Vec<Revision>, Ledger), VcsError> {
        let dir = self.desc.require_local()?;
        let mut results = Ledger::new();
        let rev = given(rev);

        let core = match rev {
            None => results
                .run_in_dir(Path::new(&dir), &self.svnversion(), ["."])?
                .output()
                .trim()
                .to_string(),
            Some(rev) => results
                .run(
                    self.desc.tool(),
                    ["info", "--show-item", "revision", "-r", rev, dir.as_str()],
                )?
                .output()
                .trim()
                .to_string(),
        };
        let mut revision = Revision::new(core);

        if scope == ReadScope::FullDetail {
            let args = ["log", "-l", "1", "-r", rev.unwrap_or("BASE"), dir.as_str()];
            match results.run(self.desc.tool(), args) {
                Ok(result) => {
                    if !apply_log(&mut revision, result.output()) {
                        tracing::warn!("Unexpected svn log output for {}", revision.core());
                    }
                }
                Err(e) => tracing::warn!("Could not read details of {}: {}", revision.core(), e),
            }
        }
        Ok((vec![revision], results))
    }
}

/// Fill detail fields from a single `svn log` entry:
///
/// ```text
/// ------------------------------------------------------------------------
/// r123 | ada | 2015-08-22 17:08:37 -0700 (Sat, 22 Aug 2015) | 1 line
///
/// Fix the widget
/// ------------------------------------------------------------------------
/// ```
fn apply_log(revision: &mut Revision, output: &str) -> bool {
    let mut lines = output.lines().skip_while(|l| l.trim().is_empty() || is_rule(l));
    let Some(header) = lines.next() else {
        return false;
    };
    let fields: Vec<&str> = header.split(" | ").map(str::trim).collect();
    let [id, author, date, _lines] = fields[..] else {
        return false;
    };
    if !id.starts_with('r') {
        return false;
    }

    revision.set_user_info(UserRole::Both, author, author);
    match svn_date(date) {
        Some(time) => revision.set_timestamp(UserRole::Both, time),
        None => tracing::warn!("Unparsable svn date {:?}", date),
    }

    let message: Vec<&str> = lines
        .skip_while(|l| l.trim().is_empty())
        .take_while(|l| !is_rule(l))
        .collect();
    revision.set_comment(message.join("\n").trim_end());
    true
}

fn is_rule(line: &str) -> bool {
    line.len() > 10 && line.chars().all(|c| c == '-')
}

/// `2015-08-22 17:08:37 -0700 (Sat, 22 Aug 2015)`
fn svn_date(field: &str) -> Option<DateTime<Utc>> {
    let stamp = field.split(" (").next()?;
    DateTime::parse_from_str(stamp, "%Y-%m-%d %H:%M:%S %z")
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
