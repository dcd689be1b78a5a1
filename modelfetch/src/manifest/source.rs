//! Manifest sources and content resolution.

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, info};

use super::error::{ManifestError, ManifestResult};

/// Default timeout for fetching a remote manifest.
pub const DEFAULT_MANIFEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Where a manifest document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    /// A file on the local filesystem.
    Local(PathBuf),
    /// An `http://` or `https://` URL.
    Remote(String),
}

impl ManifestSource {
    /// Classify a command-line argument.
    ///
    /// Anything starting with `http://` or `https://` is remote; everything
    /// else is treated as a local path.
    pub fn parse(arg: &str) -> Self {
        let lower = arg.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::Remote(arg.to_string())
        } else {
            Self::Local(PathBuf::from(arg))
        }
    }

    /// Whether resolving this source requires network access.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

impl fmt::Display for ManifestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => write!(f, "{}", url),
        }
    }
}

/// Resolves a manifest source to its raw text.
pub trait ManifestResolver {
    /// Read or fetch the manifest content.
    ///
    /// # Errors
    ///
    /// Returns `ManifestUnreachable` if the content cannot be obtained.
    fn resolve(&self, source: &ManifestSource) -> ManifestResult<String>;
}

/// Resolver backed by the local filesystem and a blocking HTTP client.
#[derive(Debug, Clone)]
pub struct ManifestFetcher {
    client: Client,
    timeout: Duration,
}

impl ManifestFetcher {
    /// Create a fetcher that reuses an existing HTTP client.
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// The per-request timeout for remote manifests.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn fetch_remote(&self, url: &str) -> ManifestResult<String> {
        info!(url = %url, "Fetching manifest");

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    ManifestError::unreachable(
                        url,
                        format!("timed out after {}s", self.timeout.as_secs()),
                    )
                } else {
                    ManifestError::unreachable(url, e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ManifestError::unreachable(
                url,
                format!("server responded with status {}", status),
            ));
        }

        response
            .text()
            .map_err(|e| ManifestError::unreachable(url, format!("failed to read body: {}", e)))
    }
}

impl ManifestResolver for ManifestFetcher {
    fn resolve(&self, source: &ManifestSource) -> ManifestResult<String> {
        match source {
            ManifestSource::Local(path) => {
                debug!(path = %path.display(), "Reading manifest");
                fs::read_to_string(path)
                    .map_err(|e| ManifestError::unreachable(path.display().to_string(), e))
            }
            ManifestSource::Remote(url) => self.fetch_remote(url),
        }
    }
}
