//! HTTP access for remote detection.

use std::io::Read;
use std::time::Duration;

use crate::error::VcsError;

/// Status and decoded body of a GET request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Blocking HTTP GET, the only network access detection performs
pub trait HttpClient: Send + Sync {
    /// Fetch `url` and read the whole body
    fn get(&self, url: &str) -> Result<HttpResponse, VcsError>;

    /// Fetch `url`, reading the body only up to the first `<body` or
    /// `</head>` (case-insensitive), or to the end when neither appears.
    /// Implementations may stop early on very large heads.
    fn get_head(&self, url: &str) -> Result<HttpResponse, VcsError>;
}

/// [`HttpClient`] backed by `reqwest`'s blocking client with its default
/// redirect policy
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

const CHUNK: usize = 4096;

/// Most bytes [`HttpClient::get_head`] reads before treating the head as
/// complete
pub const HEAD_LIMIT: usize = 1 << 20;

impl ReqwestClient {
    pub fn new() -> Result<Self, VcsError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("polyvcs/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(VcsError::transport)?;
        Ok(Self { client })
    }

    /// Wrap a preconfigured client (proxies, certificates, timeouts)
    pub fn from_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }

    fn send(&self, url: &str) -> Result<reqwest::blocking::Response, VcsError> {
        tracing::debug!("HTTP GET {}", url);
        self.client
            .get(url)
            .send()
            .map_err(|e| VcsError::Transport(format!("{url}: {e}")))
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<HttpResponse, VcsError> {
        let response = self.send(url)?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| VcsError::Transport(format!("{url}: {e}")))?;
        Ok(HttpResponse { status, body })
    }

    fn get_head(&self, url: &str) -> Result<HttpResponse, VcsError> {
        let mut response = self.send(url)?;
        let status = response.status().as_u16();

        let mut bytes = Vec::new();
        let mut chunk = [0u8; CHUNK];
        loop {
            let n = response
                .read(&mut chunk)
                .map_err(|e| VcsError::Transport(format!("{url}: {e}")))?;
            if n == 0 {
                break;
            }
            // a marker may straddle two reads
            let from = bytes.len().saturating_sub(HEAD_MARKER_OVERLAP);
            bytes.extend_from_slice(&chunk[..n]);
            if head_is_complete(&bytes[from..]) {
                break;
            }
            if bytes.len() >= HEAD_LIMIT {
                tracing::debug!("Stopped reading {} after {} bytes without a head end", url, HEAD_LIMIT);
                bytes.truncate(HEAD_LIMIT);
                break;
            }
        }

        Ok(HttpResponse {
            status,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

/// Longest marker minus one
const HEAD_MARKER_OVERLAP: usize = 6;

pub(crate) fn head_is_complete(bytes: &[u8]) -> bool {
    let lower = bytes.to_ascii_lowercase();
    contains(&lower, b"<body") || contains(&lower, b"</head>")
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
