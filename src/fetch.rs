//! Retrieval of the upstream script.
//!
//! [`HttpFetcher`] downloads over HTTP(S) with a hard timeout. [`LocalFile`]
//! reads a copy from disk instead; its bytes go through the same integrity
//! gate as a download.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Source of the raw upstream bytes.
pub trait Fetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;

    /// Human-readable description of where bytes come from for `url`.
    fn describe(&self, url: &str) -> String {
        url.to_string()
    }
}

/// Blocking HTTP fetcher with a fixed request timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let request_error = |source| FetchError::Request {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().map_err(request_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().map_err(request_error)?;
        Ok(body.to_vec())
    }
}

/// Reads the upstream script from a local file, ignoring the URL.
#[derive(Debug, Clone)]
pub struct LocalFile {
    path: PathBuf,
}

impl LocalFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Fetcher for LocalFile {
    fn fetch(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
        fs::read(&self.path).map_err(|source| FetchError::Read {
            path: self.path.clone(),
            source,
        })
    }

    fn describe(&self, _url: &str) -> String {
        self.path.display().to_string()
    }
}
