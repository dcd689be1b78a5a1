//! Error types for artifact transfers.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for transfer operations.
pub type TransferResult<T> = Result<T, TransferError>;

/// Errors that can occur while fetching, verifying or cloning an entry.
///
/// A transfer error only ever fails the entry it belongs to; the engine
/// turns it into a [`TransferOutcome`](super::TransferOutcome) and moves on.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Failed to read a file.
    #[error("failed to read {}: {source}", path.display())]
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write a file.
    #[error("failed to write {}: {source}", path.display())]
    WriteFailed { path: PathBuf, source: io::Error },

    /// Failed to create a directory.
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDirFailed { path: PathBuf, source: io::Error },

    /// Failed to remove a stale or corrupt file.
    #[error("failed to remove {}: {source}", path.display())]
    RemoveFailed { path: PathBuf, source: io::Error },

    /// The server or connection failed the download.
    #[error("failed to download {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    /// The request exceeded its timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// An external tool (curl, git) could not be run or exited unsuccessfully.
    #[error("{tool} failed: {reason}")]
    ToolFailed { tool: String, reason: String },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),
}

impl TransferError {
    pub(crate) fn download(url: &str, reason: impl ToString) -> Self {
        Self::DownloadFailed {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn tool(tool: &str, reason: impl ToString) -> Self {
        Self::ToolFailed {
            tool: tool.to_string(),
            reason: reason.to_string(),
        }
    }
}
