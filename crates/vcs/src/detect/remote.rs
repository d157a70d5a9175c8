//! Host-pattern table for remote detection.
//!
//! Each rule pairs an optional fixed host with a pattern over `host[:port]`
//! plus the URL path, and a [`Resolution`] saying how a match becomes a
//! backend. Adding a host is a data change: push another [`HostRule`].

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::{Captures, Regex};
use serde::Deserialize;

use crate::detect::http::HttpClient;
use crate::error::VcsError;
use crate::types::BackendType;

/// Secondary check run after a pattern match
pub type CheckFn =
    dyn Fn(&Captures<'_>, &dyn HttpClient) -> Result<BackendType, VcsError> + Send + Sync;

/// How a matching rule decides the backend
#[derive(Clone)]
pub enum Resolution {
    /// The host serves a single backend
    Fixed(BackendType),
    /// The backend name is the value of a named capture group
    FromCapture(String),
    /// Ask the host, usually over HTTP
    Check(Arc<CheckFn>),
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(backend) => f.debug_tuple("Fixed").field(backend).finish(),
            Self::FromCapture(name) => f.debug_tuple("FromCapture").field(name).finish(),
            Self::Check(_) => f.write_str("Check(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HostRule {
    /// Exact host the rule applies to; `None` applies to every host
    pub host: Option<String>,
    pub pattern: Regex,
    pub resolution: Resolution,
}

/// Outcome of walking the table
#[derive(Debug)]
pub(crate) enum RuleMatch {
    Found(BackendType),
    NoRule,
}

impl HostRule {
    pub fn new(host: Option<&str>, pattern: &str, resolution: Resolution) -> Result<Self, regex::Error> {
        Ok(Self {
            host: host.map(str::to_string),
            pattern: Regex::new(pattern)?,
            resolution,
        })
    }

    fn applies_to(&self, host: &str) -> bool {
        self.host.as_deref().is_none_or(|h| h == host)
    }

    fn resolve(&self, caps: &Captures<'_>, client: &dyn HttpClient) -> Result<BackendType, VcsError> {
        match &self.resolution {
            Resolution::Fixed(backend) => Ok(*backend),
            Resolution::FromCapture(group) => {
                let name = caps.name(group).map_or("", |m| m.as_str());
                name.parse().map_err(|_| {
                    VcsError::cannot_detect(format!("unsupported backend name {name:?}"))
                })
            }
            Resolution::Check(check) => check(caps, client),
        }
    }
}

/// Walk `rules` in order against `host` and `host_path`.
///
/// A rule bound to this host whose pattern does not match is a hard
/// [`VcsError::CannotDetect`]: the host is known, the path is not a
/// repository.
pub(crate) fn match_rules(
    rules: &[HostRule],
    host: &str,
    host_path: &str,
    client: &dyn HttpClient,
) -> Result<RuleMatch, VcsError> {
    for rule in rules.iter().filter(|r| r.applies_to(host)) {
        let Some(caps) = rule.pattern.captures(host_path) else {
            if rule.host.is_some() {
                return Err(VcsError::cannot_detect(format!(
                    "{host_path} is not a repository location on {host}"
                )));
            }
            continue;
        };

        let backend = rule.resolve(&caps, client)?;
        tracing::debug!(rule = %rule.pattern, "Host rule matched {} as {}", host_path, backend);
        return Ok(RuleMatch::Found(backend));
    }
    Ok(RuleMatch::NoRule)
}

const NAME: &str = "[A-Za-z0-9_.\\-]+";

/// The built-in table: well-known hosts first, then the legacy
/// `googlecode.com` layout, then the generic path-extension rule.
pub fn default_rules() -> Vec<HostRule> {
    let table: Vec<(Option<&str>, String, Resolution)> = vec![
        (
            Some("github.com"),
            format!(r"^(github\.com/{NAME}/{NAME})(/{NAME})*$"),
            Resolution::Fixed(BackendType::Git),
        ),
        (
            Some("bitbucket.org"),
            format!(r"^(bitbucket\.org/(?P<name>{NAME}/{NAME}))(/{NAME})*$"),
            Resolution::Check(Arc::new(check_bitbucket)),
        ),
        (
            Some("launchpad.net"),
            format!(
                r"^(launchpad\.net/(({NAME})(/{NAME})?|~{NAME}/(\+junk|{NAME})/{NAME}))(/{NAME})*$"
            ),
            Resolution::Fixed(BackendType::Bzr),
        ),
        (
            Some("git.launchpad.net"),
            format!(r"^(git\.launchpad\.net/(({NAME})|~{NAME}/(\+git|{NAME})/{NAME}))$"),
            Resolution::Fixed(BackendType::Git),
        ),
        (
            Some("go.googlesource.com"),
            format!(r"^(go\.googlesource\.com/{NAME}/?)$"),
            Resolution::Fixed(BackendType::Git),
        ),
        (
            Some("code.google.com"),
            format!(
                r"^(code\.google\.com/[pr]/(?P<project>[a-z0-9\-]+)(\.(?P<repo>[a-z0-9\-]+))?)(/{NAME})*$"
            ),
            Resolution::Check(Arc::new(check_google_code)),
        ),
        (
            None,
            r"^([a-z0-9_\-.]+)\.googlecode\.com/(?P<type>git|hg|svn)(/.*)?$".to_string(),
            Resolution::FromCapture("type".to_string()),
        ),
        (
            None,
            r"\.(?P<type>git|hg|svn|bzr)$".to_string(),
            Resolution::FromCapture("type".to_string()),
        ),
    ];

    table
        .into_iter()
        .filter_map(|(host, pattern, resolution)| {
            match HostRule::new(host, &pattern, resolution) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    tracing::error!("Skipping host rule {}: {}", pattern, e);
                    None
                }
            }
        })
        .collect()
}

/// Bitbucket reports the backend in the `scm` field of its repository API
fn check_bitbucket(caps: &Captures<'_>, client: &dyn HttpClient) -> Result<BackendType, VcsError> {
    #[derive(Deserialize)]
    struct Repository {
        scm: String,
    }

    let name = caps.name("name").map_or("", |m| m.as_str());
    let url = format!("https://api.bitbucket.org/2.0/repositories/{name}");
    let response = client.get(&url)?;
    if !response.is_ok() {
        return Err(VcsError::Transport(format!("{url}: HTTP {}", response.status)));
    }

    let repo: Repository = serde_json::from_str(&response.body)
        .map_err(|e| VcsError::Transport(format!("decoding {url}: {e}")))?;
    repo.scm
        .parse()
        .map_err(|_| VcsError::cannot_detect(format!("bitbucket reports unsupported scm {:?}", repo.scm)))
}

static CHECKOUT_CMD: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r#"id="checkoutcmd">(hg|git|svn)"#));

/// Google Code names the backend in its checkout page. svn there is only
/// reachable through the legacy `googlecode.com` layout.
fn check_google_code(caps: &Captures<'_>, client: &dyn HttpClient) -> Result<BackendType, VcsError> {
    let project = caps.name("project").map_or("", |m| m.as_str());
    let repo = caps.name("repo").map_or("", |m| m.as_str());
    let url = format!("https://code.google.com/p/{project}/source/checkout?repo={repo}");
    let response = client.get(&url)?;
    if !response.is_ok() {
        return Err(VcsError::Transport(format!("{url}: HTTP {}", response.status)));
    }

    let marker = CHECKOUT_CMD
        .as_ref()
        .map_err(|e| VcsError::cannot_detect(e.to_string()))?;
    match marker.captures(&response.body).map(|c| c[1].to_string()).as_deref() {
        Some("git") => Ok(BackendType::Git),
        Some("hg") => Ok(BackendType::Hg),
        _ => Err(VcsError::cannot_detect(format!(
            "no usable checkout command for code.google.com/p/{project}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::http::HttpResponse;
    use crate::error::ErrorKind;
    use std::sync::Mutex;

    struct Canned {
        status: u16,
        body: String,
        requests: Mutex<Vec<String>>,
    }

    impl Canned {
        fn new(status: u16, body: &str) -> Self {
            Self {
                status,
                body: body.to_string(),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    impl HttpClient for Canned {
        fn get(&self, url: &str) -> Result<HttpResponse, VcsError> {
            self.requests.lock().unwrap().push(url.to_string());
            Ok(HttpResponse {
                status: self.status,
                body: self.body.clone(),
            })
        }

        fn get_head(&self, url: &str) -> Result<HttpResponse, VcsError> {
            self.get(url)
        }
    }

    fn run(host: &str, host_path: &str, client: &Canned) -> Result<RuleMatch, VcsError> {
        match_rules(&default_rules(), host, host_path, client)
    }

    fn found(result: Result<RuleMatch, VcsError>) -> BackendType {
        match result.unwrap() {
            RuleMatch::Found(backend) => backend,
            RuleMatch::NoRule => panic!("no rule matched"),
        }
    }

    #[test]
    fn test_default_table_compiles() {
        assert_eq!(default_rules().len(), 8);
    }

    #[test]
    fn test_fixed_hosts() {
        let client = Canned::new(200, "");
        assert_eq!(found(run("github.com", "github.com/rust-lang/cargo", &client)), BackendType::Git);
        assert_eq!(found(run("launchpad.net", "launchpad.net/bzr", &client)), BackendType::Bzr);
        assert_eq!(
            found(run("git.launchpad.net", "git.launchpad.net/ubuntu", &client)),
            BackendType::Git
        );
        assert_eq!(
            found(run("go.googlesource.com", "go.googlesource.com/net", &client)),
            BackendType::Git
        );
        assert!(client.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_known_host_with_bad_path_is_hard_failure() {
        let client = Canned::new(200, "");
        let err = run("github.com", "github.com/rust-lang", &client).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CannotDetect);
    }

    #[test]
    fn test_generic_extension_rule() {
        let client = Canned::new(200, "");
        assert_eq!(found(run("example.com", "example.com/r/project.hg", &client)), BackendType::Hg);
        assert_eq!(found(run("example.com", "example.com/project.bzr", &client)), BackendType::Bzr);
        assert!(matches!(
            run("example.com", "example.com/project", &client).unwrap(),
            RuleMatch::NoRule
        ));
    }

    #[test]
    fn test_legacy_googlecode_layout() {
        let client = Canned::new(200, "");
        assert_eq!(
            found(run("demo.googlecode.com", "demo.googlecode.com/svn/trunk", &client)),
            BackendType::Svn
        );
    }

    #[test]
    fn test_bitbucket_asks_the_api() {
        let client = Canned::new(200, r#"{"scm": "hg", "full_name": "owner/repo"}"#);
        assert_eq!(found(run("bitbucket.org", "bitbucket.org/owner/repo", &client)), BackendType::Hg);
        assert_eq!(
            client.requests.lock().unwrap().as_slice(),
            ["https://api.bitbucket.org/2.0/repositories/owner/repo"]
        );
    }

    #[test]
    fn test_bitbucket_api_error_is_transport() {
        let client = Canned::new(404, "not found");
        let err = run("bitbucket.org", "bitbucket.org/owner/repo", &client).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_google_code_checkout_page() {
        let client = Canned::new(200, r#"<tt id="checkoutcmd">hg clone https://code.google.com/p/demo/</tt>"#);
        assert_eq!(found(run("code.google.com", "code.google.com/p/demo", &client)), BackendType::Hg);

        let svn = Canned::new(200, r#"<tt id="checkoutcmd">svn checkout http://demo.googlecode.com/svn/trunk/</tt>"#);
        let err = run("code.google.com", "code.google.com/p/demo", &svn).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CannotDetect);
    }

    #[test]
    fn test_custom_rule_with_port() {
        let rules = vec![
            HostRule::new(
                Some("git.internal:8443"),
                r"^git\.internal:8443/[a-z]+/[a-z]+$",
                Resolution::Fixed(BackendType::Git),
            )
            .unwrap(),
        ];
        let client = Canned::new(200, "");
        let result = match_rules(&rules, "git.internal:8443", "git.internal:8443/team/app", &client);
        assert_eq!(found(result), BackendType::Git);
    }
}
