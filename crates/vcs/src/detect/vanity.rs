//! Vanity import resolution.
//!
//! A vanity host serves a small HTML document for `?go-get=1` whose head
//! carries `<meta name="go-import" content="prefix vcs repo">`. The scanner is
//! deliberately loose: tag and attribute names are case-insensitive, markup
//! does not need to be well formed, and scanning ends at the first `<body>` or
//! `</head>`.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::detect::http::HttpClient;
use crate::error::VcsError;
use crate::types::BackendType;

const META_NAME: &str = "go-import";

/// Charsets the document may declare
const ACCEPTED_CHARSETS: [&str; 3] = ["ascii", "us-ascii", "utf-8"];

/// Resolve `remote` through its vanity document. Returns the backend and the
/// repository location the document points at.
pub fn resolve(client: &dyn HttpClient, remote: &Url) -> Result<(BackendType, String), VcsError> {
    let mut target = remote.clone();
    target.query_pairs_mut().append_pair("go-get", "1");

    let response = client.get_head(target.as_str())?;
    if !response.is_ok() {
        tracing::debug!(status = response.status, "Vanity lookup of {} returned non-200", target);
    }

    let host_path = super::host_and_path(remote);
    parse_go_import(&host_path, &response.body)
}

/// Find the single `go-import` declaration in `document` and validate it
/// against `host_path`.
pub fn parse_go_import(host_path: &str, document: &str) -> Result<(BackendType, String), VcsError> {
    let scanner = SCANNER
        .as_ref()
        .map_err(|e| VcsError::cannot_detect(format!("scanner: {e}")))?;
    let document = scanner.comment.replace_all(document, "");
    scanner.check_declared_encoding(&document)?;

    let mut found: Option<(Option<BackendType>, String)> = None;

    for tag in scanner.tag.captures_iter(&document) {
        let closing = !tag[1].is_empty();
        let name = tag[2].to_ascii_lowercase();
        let attrs = &tag[3];

        match (closing, name.as_str()) {
            (false, "body") | (true, "head") => break,
            (false, "meta") => {}
            _ => continue,
        }

        if let Some(charset) = scanner.meta_charset(attrs) {
            check_charset(&charset)?;
        }

        if scanner.attr(attrs, "name").as_deref() != Some(META_NAME) {
            continue;
        }
        let content = scanner.attr(attrs, "content").unwrap_or_default();
        let fields: Vec<&str> = content.split_whitespace().collect();
        let [prefix, vcs, repo] = fields[..] else {
            continue;
        };

        if found.is_some() {
            return Err(VcsError::cannot_detect(format!(
                "more than one {META_NAME} declaration for {host_path}"
            )));
        }
        if !host_path.starts_with(prefix) {
            return Err(VcsError::cannot_detect(format!(
                "{META_NAME} prefix {prefix} does not match {host_path}"
            )));
        }

        found = Some((vcs.parse().ok(), repo.to_string()));
    }

    match found {
        Some((Some(backend), repo)) => {
            tracing::debug!("Vanity import {} resolved to {} {}", host_path, backend, repo);
            Ok((backend, repo))
        }
        Some((None, _)) => Err(VcsError::cannot_detect(format!(
            "{META_NAME} for {host_path} names an unsupported backend"
        ))),
        None => Err(VcsError::cannot_detect(format!(
            "no {META_NAME} declaration for {host_path}"
        ))),
    }
}

fn check_charset(charset: &str) -> Result<(), VcsError> {
    if ACCEPTED_CHARSETS.contains(&charset.to_ascii_lowercase().as_str()) {
        Ok(())
    } else {
        Err(VcsError::Transport(format!(
            "can't decode document using charset {charset:?}"
        )))
    }
}

static SCANNER: LazyLock<Result<Scanner, regex::Error>> = LazyLock::new(Scanner::new);

struct Scanner {
    comment: Regex,
    xml_decl: Regex,
    tag: Regex,
    attr: Regex,
    charset: Regex,
}

impl Scanner {
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            comment: Regex::new(r"(?s)<!--.*?-->")?,
            xml_decl: Regex::new(r#"(?i)<\?xml[^>]*?\bencoding\s*=\s*["']([^"']+)["']"#)?,
            tag: Regex::new(r"(?s)<\s*(/?)\s*([A-Za-z][A-Za-z0-9:\-]*)([^>]*)>")?,
            attr: Regex::new(
                r#"(?s)([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#,
            )?,
            charset: Regex::new(r"(?i)\bcharset\s*=\s*([A-Za-z0-9_.:\-]+)")?,
        })
    }

    /// Value of attribute `name` (case-insensitive), entity-decoded
    fn attr(&self, attrs: &str, name: &str) -> Option<String> {
        self.attr.captures_iter(attrs).find_map(|c| {
            if !c[1].eq_ignore_ascii_case(name) {
                return None;
            }
            let value = c.get(2).or(c.get(3)).or(c.get(4)).map_or("", |m| m.as_str());
            Some(decode_entities(value))
        })
    }

    /// Reject a document whose XML declaration names an unsupported encoding
    fn check_declared_encoding(&self, document: &str) -> Result<(), VcsError> {
        match self.xml_decl.captures(document) {
            Some(c) => check_charset(&c[1]),
            None => Ok(()),
        }
    }

    /// `<meta charset=X>` or `<meta http-equiv=... content="...; charset=X">`.
    /// A `charset=` inside any other meta's content is plain text.
    fn meta_charset(&self, attrs: &str) -> Option<String> {
        if let Some(charset) = self.attr(attrs, "charset") {
            return Some(charset.trim().to_string());
        }
        self.attr(attrs, "http-equiv")?;
        let content = self.attr(attrs, "content")?;
        self.charset.captures(&content).map(|c| c[1].to_string())
    }
}

fn decode_entities(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const HOST_PATH: &str = "golang.org/x/net";

    fn page(head: &str) -> String {
        format!("<!DOCTYPE html>\n<html>\n<head>\n{head}\n</head>\n<body>\nNothing to see here.\n</body>\n</html>\n")
    }

    #[test]
    fn test_single_declaration_resolves() {
        let doc = page(r#"<meta name="go-import" content="golang.org/x/net git https://go.googlesource.com/net">"#);
        let (backend, repo) = parse_go_import(HOST_PATH, &doc).unwrap();
        assert_eq!(backend, BackendType::Git);
        assert_eq!(repo, "https://go.googlesource.com/net");
    }

    #[test]
    fn test_prefix_matches_sub_path() {
        let doc = page(r#"<meta name="go-import" content="golang.org/x/net git https://go.googlesource.com/net">"#);
        let (_, repo) = parse_go_import("golang.org/x/net/context", &doc).unwrap();
        assert_eq!(repo, "https://go.googlesource.com/net");
    }

    #[test]
    fn test_loose_markup_and_case() {
        let doc = "<HTML><HEAD><META NAME=\"go-import\" CONTENT='golang.org/x/net hg https://code.example/net'><META name=other content=x></HEAD>";
        let (backend, _) = parse_go_import(HOST_PATH, doc).unwrap();
        assert_eq!(backend, BackendType::Hg);
    }

    #[test]
    fn test_two_declarations_cannot_be_detected() {
        let doc = page(concat!(
            r#"<meta name="go-import" content="golang.org/x/net git https://go.googlesource.com/net">"#,
            "\n",
            r#"<meta name="go-import" content="golang.org/x/net hg https://hg.example/net">"#,
        ));
        let err = parse_go_import(HOST_PATH, &doc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CannotDetect);
    }

    #[test]
    fn test_prefix_mismatch_cannot_be_detected() {
        let doc = page(r#"<meta name="go-import" content="golang.org/x/crypto git https://go.googlesource.com/crypto">"#);
        let err = parse_go_import(HOST_PATH, &doc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CannotDetect);
    }

    #[test]
    fn test_unknown_backend_cannot_be_detected() {
        let doc = page(r#"<meta name="go-import" content="golang.org/x/net mod https://proxy.example">"#);
        let err = parse_go_import(HOST_PATH, &doc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CannotDetect);
    }

    #[test]
    fn test_meta_after_head_is_ignored() {
        let doc = "<html><head><title>x</title></head><body><meta name=\"go-import\" content=\"golang.org/x/net git https://a\"></body>";
        let err = parse_go_import(HOST_PATH, doc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CannotDetect);
    }

    #[test]
    fn test_commented_declaration_is_ignored() {
        let doc = page(concat!(
            r#"<!-- <meta name="go-import" content="golang.org/x/net hg https://old"> -->"#,
            r#"<meta name="go-import" content="golang.org/x/net git https://new">"#,
        ));
        let (backend, repo) = parse_go_import(HOST_PATH, &doc).unwrap();
        assert_eq!((backend, repo.as_str()), (BackendType::Git, "https://new"));
    }

    #[test]
    fn test_wrong_field_count_is_skipped() {
        let doc = page(r#"<meta name="go-import" content="golang.org/x/net git">"#);
        let err = parse_go_import(HOST_PATH, &doc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CannotDetect);
    }

    #[test]
    fn test_foreign_charset_is_a_transport_error() {
        let doc = page(concat!(
            r#"<meta charset="iso-8859-1">"#,
            r#"<meta name="go-import" content="golang.org/x/net git https://a">"#,
        ));
        let err = parse_go_import(HOST_PATH, &doc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);

        let xml = r#"<?xml version="1.0" encoding="Shift_JIS"?><html><head><meta name="go-import" content="golang.org/x/net git https://a"></head></html>"#;
        assert_eq!(
            parse_go_import(HOST_PATH, xml).unwrap_err().kind(),
            ErrorKind::Transport
        );
    }

    #[test]
    fn test_charset_text_in_other_metas_is_ignored() {
        let doc = page(concat!(
            r#"<meta name="description" content="Notes on charset=latin1 handling">"#,
            r#"<meta name="go-import" content="golang.org/x/net git https://a">"#,
        ));
        assert_eq!(parse_go_import(HOST_PATH, &doc).unwrap().0, BackendType::Git);

        let doc = page(concat!(
            r#"<meta http-equiv="Content-Type" content="text/html; charset=windows-1252">"#,
            r#"<meta name="go-import" content="golang.org/x/net git https://a">"#,
        ));
        assert_eq!(
            parse_go_import(HOST_PATH, &doc).unwrap_err().kind(),
            ErrorKind::Transport
        );
    }

    #[test]
    fn test_ascii_and_utf8_charsets_are_accepted() {
        let doc = page(concat!(
            r#"<meta http-equiv="Content-Type" content="text/html; charset=utf-8">"#,
            r#"<meta name="go-import" content="golang.org/x/net git https://a">"#,
        ));
        assert!(parse_go_import(HOST_PATH, &doc).is_ok());
        let xml = r#"<?xml version="1.0" encoding="ASCII"?><html><head><meta name="go-import" content="golang.org/x/net bzr https://a"></head></html>"#;
        assert_eq!(parse_go_import(HOST_PATH, xml).unwrap().0, BackendType::Bzr);
    }
}
