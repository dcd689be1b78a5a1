//! Built-in HTTP transfer with resume support.
//!
//! Resumption uses a `Range: bytes=<n>-` request whenever the staging file
//! already holds data:
//! - `206 Partial Content` appends to the staging file
//! - `200 OK` means the server ignored the range, so the file restarts
//! - `416 Range Not Satisfiable` means the staging file is already complete
//!   when `Content-Range: bytes */<len>` matches its size; otherwise the
//!   staging file is stale and the download restarts from scratch

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{CONTENT_RANGE, RANGE};
use reqwest::StatusCode;
use tracing::debug;

use super::config::EngineConfig;
use super::error::{TransferError, TransferResult};
use super::strategy::{ProgressFn, TransferStrategy};

/// Buffer size for reading/writing during downloads (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Staging file opened for writing, positioned where the response body starts.
struct OpenedStaging {
    file: File,
    start_byte: u64,
    total: Option<u64>,
}

/// Build the shared blocking HTTP client.
///
/// Redirects are followed and every request carries the configured
/// `User-Agent`. The blocking client applies its timeout to waiting for the
/// response head and to each body read separately, so it acts as a stall
/// timeout: a body that keeps arriving is never cut off.
///
/// # Errors
///
/// Returns `ClientBuild` if the TLS backend cannot be initialised.
pub fn build_client(config: &EngineConfig) -> TransferResult<Client> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .connect_timeout(config.connect_timeout)
        .timeout(config.stall_timeout)
        .build()
        .map_err(|e| TransferError::ClientBuild(e.to_string()))
}

/// Streams responses from the built-in client into the staging file.
#[derive(Debug, Clone)]
pub struct HttpStrategy {
    client: Client,
    timeout: Duration,
}

impl HttpStrategy {
    /// Create a strategy around an existing client.
    ///
    /// `timeout` is only used to describe timeouts in errors; the client
    /// enforces its own.
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    fn send(&self, url: &str, start_byte: u64) -> TransferResult<Response> {
        let mut request = self.client.get(url);
        if start_byte > 0 {
            request = request.header(RANGE, format!("bytes={}-", start_byte));
        }

        request.send().map_err(|e| {
            if e.is_timeout() {
                self.timeout_error(url)
            } else {
                TransferError::download(url, e)
            }
        })
    }

    /// Open the staging file according to how the server answered.
    fn open_staging(
        &self,
        url: &str,
        staging: &Path,
        existing_size: u64,
        response: &Response,
    ) -> TransferResult<OpenedStaging> {
        let status = response.status();

        if status == StatusCode::PARTIAL_CONTENT && existing_size > 0 {
            let total = total_from_content_range(response)
                .or_else(|| response.content_length().map(|len| existing_size + len));
            let file = OpenOptions::new()
                .append(true)
                .open(staging)
                .map_err(|e| TransferError::WriteFailed {
                    path: staging.to_path_buf(),
                    source: e,
                })?;
            debug!(url = %url, from = existing_size, "Resuming download");
            return Ok(OpenedStaging {
                file,
                start_byte: existing_size,
                total,
            });
        }

        if status.is_success() {
            if existing_size > 0 {
                debug!(url = %url, "Server ignored range request, restarting");
            }
            let file = File::create(staging).map_err(|e| TransferError::WriteFailed {
                path: staging.to_path_buf(),
                source: e,
            })?;
            return Ok(OpenedStaging {
                file,
                start_byte: 0,
                total: response.content_length(),
            });
        }

        Err(TransferError::download(
            url,
            format!("GET request failed with status {}", status),
        ))
    }

    fn stream(
        &self,
        url: &str,
        mut response: Response,
        staging: &Path,
        opened: OpenedStaging,
        progress: ProgressFn<'_>,
    ) -> TransferResult<u64> {
        let total = opened.total;
        let mut writer = BufWriter::new(opened.file);
        let mut buffer = vec![0u8; BUFFER_SIZE];
        let mut downloaded = opened.start_byte;

        progress(downloaded, total);

        loop {
            let bytes_read = match response.read(&mut buffer) {
                Ok(n) => n,
                Err(e) => {
                    // Keep what arrived so far for the next attempt.
                    writer.flush().ok();
                    return Err(self.read_error(url, e));
                }
            };

            if bytes_read == 0 {
                break;
            }

            writer
                .write_all(&buffer[..bytes_read])
                .map_err(|e| TransferError::WriteFailed {
                    path: staging.to_path_buf(),
                    source: e,
                })?;

            downloaded += bytes_read as u64;
            progress(downloaded, total);
        }

        writer.flush().map_err(|e| TransferError::WriteFailed {
            path: staging.to_path_buf(),
            source: e,
        })?;

        if let Some(total) = total {
            if downloaded < total {
                return Err(TransferError::download(
                    url,
                    format!("connection closed after {} of {} bytes", downloaded, total),
                ));
            }
        }

        Ok(downloaded)
    }

    fn read_error(&self, url: &str, e: io::Error) -> TransferError {
        if e.kind() == io::ErrorKind::TimedOut {
            self.timeout_error(url)
        } else {
            TransferError::download(url, format!("read error: {}", e))
        }
    }

    fn timeout_error(&self, url: &str) -> TransferError {
        TransferError::Timeout {
            url: url.to_string(),
            timeout_secs: self.timeout.as_secs(),
        }
    }
}

impl TransferStrategy for HttpStrategy {
    fn name(&self) -> &'static str {
        "http"
    }

    fn fetch(&self, url: &str, staging: &Path, progress: ProgressFn<'_>) -> TransferResult<u64> {
        let mut existing_size = staging.metadata().map(|m| m.len()).unwrap_or(0);
        let mut response = self.send(url, existing_size)?;

        if response.status() == StatusCode::RANGE_NOT_SATISFIABLE && existing_size > 0 {
            let remote_size = total_from_content_range(&response);
            if remote_size == Some(existing_size) {
                debug!(url = %url, bytes = existing_size, "Staging file already complete");
                progress(existing_size, Some(existing_size));
                return Ok(existing_size);
            }

            debug!(
                url = %url,
                staged = existing_size,
                remote = ?remote_size,
                "Staging file does not match remote size, restarting"
            );
            existing_size = 0;
            response = self.send(url, existing_size)?;
        }

        let opened = self.open_staging(url, staging, existing_size, &response)?;
        self.stream(url, response, staging, opened, progress)
    }
}

/// Total size from a `Content-Range: bytes a-b/total` or `bytes */total`
/// header.
fn total_from_content_range(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(CONTENT_RANGE)?
        .to_str()
        .ok()?
        .rsplit('/')
        .next()?
        .trim()
        .parse()
        .ok()
}
