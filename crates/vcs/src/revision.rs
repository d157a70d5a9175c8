//! Revision metadata read back from a backend.
//!
//! Only the core identifier is guaranteed. Every other field is `None` until a
//! [`ReadScope::FullDetail`] read fills it, so `None` means "not fetched"
//! while `Some(vec![])` means "fetched, there are none".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Rev;

/// Detail-versus-speed policy for revision reads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadScope {
    /// Only the core identifier
    #[default]
    CoreOnly,
    /// Core identifier plus best-effort tags, branches, users, times, comment
    FullDetail,
}

/// Which user a timestamp or identity belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    Author,
    Committer,
    /// Both roles at once, for backends that do not tell them apart
    Both,
}

impl UserRole {
    fn sets_author(self) -> bool {
        matches!(self, Self::Author | Self::Both)
    }

    fn sets_committer(self) -> bool {
        matches!(self, Self::Committer | Self::Both)
    }
}

/// Name and id (usually an email) of a revision author or committer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    core: Rev,
    sem_vers: Option<Vec<Rev>>,
    tags: Option<Vec<Rev>>,
    branches: Option<Vec<Rev>>,
    ancestors: Option<Vec<Rev>>,
    comment: Option<String>,
    author: Option<UserInfo>,
    author_time: Option<DateTime<Utc>>,
    committer: Option<UserInfo>,
    committer_time: Option<DateTime<Utc>>,
}

impl Revision {
    pub fn new(core: impl Into<Rev>) -> Self {
        Self {
            core: core.into(),
            ..Self::default()
        }
    }

    pub fn core(&self) -> &Rev {
        &self.core
    }

    pub fn sem_vers(&self) -> Option<&[Rev]> {
        self.sem_vers.as_deref()
    }

    pub fn tags(&self) -> Option<&[Rev]> {
        self.tags.as_deref()
    }

    pub fn branches(&self) -> Option<&[Rev]> {
        self.branches.as_deref()
    }

    pub fn ancestors(&self) -> Option<&[Rev]> {
        self.ancestors.as_deref()
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Author or committer timestamp. [`UserRole::Both`] reads the committer.
    pub fn timestamp(&self, role: UserRole) -> Option<DateTime<Utc>> {
        match role {
            UserRole::Author => self.author_time,
            UserRole::Committer | UserRole::Both => self.committer_time,
        }
    }

    /// Author or committer identity. [`UserRole::Both`] reads the committer.
    pub fn user_info(&self, role: UserRole) -> Option<&UserInfo> {
        match role {
            UserRole::Author => self.author.as_ref(),
            UserRole::Committer | UserRole::Both => self.committer.as_ref(),
        }
    }

    /// True when nothing beyond the core identifier has been populated.
    pub fn is_core_only(&self) -> bool {
        self.sem_vers.is_none()
            && self.tags.is_none()
            && self.branches.is_none()
            && self.ancestors.is_none()
            && self.comment.is_none()
            && self.author.is_none()
            && self.author_time.is_none()
            && self.committer.is_none()
            && self.committer_time.is_none()
    }

    pub fn set_core(&mut self, core: impl Into<Rev>) {
        self.core = core.into();
    }

    pub fn set_sem_vers(&mut self, sem_vers: Vec<Rev>) {
        self.sem_vers = Some(sem_vers);
    }

    pub fn set_tags(&mut self, tags: Vec<Rev>) {
        self.tags = Some(tags);
    }

    pub fn set_branches(&mut self, branches: Vec<Rev>) {
        self.branches = Some(branches);
    }

    pub fn set_ancestors(&mut self, ancestors: Vec<Rev>) {
        self.ancestors = Some(ancestors);
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = Some(comment.into());
    }

    pub fn set_timestamp(&mut self, role: UserRole, timestamp: DateTime<Utc>) {
        if role.sets_author() {
            self.author_time = Some(timestamp);
        }
        if role.sets_committer() {
            self.committer_time = Some(timestamp);
        }
    }

    pub fn set_user_info(&mut self, role: UserRole, name: impl Into<String>, id: impl Into<String>) {
        let info = UserInfo {
            name: name.into(),
            id: id.into(),
        };
        if role.sets_author() {
            self.author = Some(info.clone());
        }
        if role.sets_committer() {
            self.committer = Some(info);
        }
    }

    /// Split tag names into semantic versions and plain tags and store both.
    pub fn set_classified_tags<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (sem_vers, tags): (Vec<Rev>, Vec<Rev>) = names
            .into_iter()
            .map(Rev::new)
            .partition(|rev| is_sem_ver(rev.as_str()));
        self.set_sem_vers(sem_vers);
        self.set_tags(tags);
    }
}

/// `1.2.3`, `v1.2.3`, `v1.2.3-rc.1+build.5`
pub fn is_sem_ver(name: &str) -> bool {
    let name = name.strip_prefix('v').unwrap_or(name);
    let (version, _build) = name.split_once('+').unwrap_or((name, ""));
    let (core, pre) = match version.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (version, None),
    };

    let numeric = |part: &str| {
        !part.is_empty()
            && part.chars().all(|c| c.is_ascii_digit())
            && (part == "0" || !part.starts_with('0'))
    };
    let parts: Vec<&str> = core.split('.').collect();
    if parts.len() != 3 || !parts.iter().all(|p| numeric(p)) {
        return false;
    }

    match pre {
        Some(pre) => pre
            .split('.')
            .all(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_revision_is_core_only() {
        let rev = Revision::new("3f690c91af378fbd09628f9833abb1c3d6828c5e");
        assert_eq!(rev.core().as_str(), "3f690c91af378fbd09628f9833abb1c3d6828c5e");
        assert!(rev.is_core_only());
        assert_eq!(rev.tags(), None);
        assert_eq!(rev.user_info(UserRole::Author), None);
    }

    #[test]
    fn test_empty_tags_differ_from_unfetched_tags() {
        let mut rev = Revision::new("1");
        rev.set_tags(Vec::new());
        assert_eq!(rev.tags(), Some(&[][..]));
        assert!(!rev.is_core_only());
    }

    #[test]
    fn test_both_role_sets_author_and_committer() {
        let when = Utc.with_ymd_and_hms(2015, 8, 22, 17, 8, 37).unwrap();
        let mut rev = Revision::new("26211");
        rev.set_user_info(UserRole::Both, "Gregory Szorc", "gregory.szorc@gmail.com");
        rev.set_timestamp(UserRole::Both, when);

        assert_eq!(rev.user_info(UserRole::Author), rev.user_info(UserRole::Committer));
        assert_eq!(rev.user_info(UserRole::Author).unwrap().name, "Gregory Szorc");
        assert_eq!(rev.timestamp(UserRole::Author), Some(when));
        assert_eq!(rev.timestamp(UserRole::Committer), Some(when));
    }

    #[test]
    fn test_single_role_leaves_other_untouched() {
        let mut rev = Revision::new("abc");
        rev.set_user_info(UserRole::Author, "A", "a@example.com");
        assert!(rev.user_info(UserRole::Committer).is_none());
    }

    #[test]
    fn test_classified_tags() {
        let mut rev = Revision::new("abc");
        rev.set_classified_tags(["v1.2.0", "nightly", "2.0.0-rc.1", "main/7353"]);
        let sem: Vec<_> = rev.sem_vers().unwrap().iter().map(Rev::as_str).collect();
        let tags: Vec<_> = rev.tags().unwrap().iter().map(Rev::as_str).collect();
        assert_eq!(sem, vec!["v1.2.0", "2.0.0-rc.1"]);
        assert_eq!(tags, vec!["nightly", "main/7353"]);
    }

    #[test]
    fn test_is_sem_ver() {
        assert!(is_sem_ver("1.0.0"));
        assert!(is_sem_ver("v10.20.30+build.1"));
        assert!(!is_sem_ver("1.0"));
        assert!(!is_sem_ver("01.0.0"));
        assert!(!is_sem_ver("1.0.0-"));
        assert!(!is_sem_ver("release"));
    }
}
