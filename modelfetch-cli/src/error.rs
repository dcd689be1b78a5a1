//! CLI error type and exit codes.

use std::process::ExitCode;

use modelfetch::config::ConfigError;
use modelfetch::logging::LoggingError;
use modelfetch::plan::FilterError;
use modelfetch::transfer::TransferError;
use thiserror::Error;

/// Exit code when every entry succeeded.
pub const EXIT_SUCCESS: u8 = 0;

/// Exit code when one or more entries failed.
pub const EXIT_FAILURES: u8 = 1;

/// Exit code for usage and configuration errors.
pub const EXIT_USAGE: u8 = 2;

/// Errors that stop the run before any entry is attempted.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error(transparent)]
    Transfer(#[from] TransferError),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(EXIT_USAGE)
    }
}

/// How a completed run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Every entry succeeded, or a listing / dry run completed.
    Success,
    /// At least one entry failed, or no manifest could be loaded.
    Failures,
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        match status {
            Status::Success => ExitCode::from(EXIT_SUCCESS),
            Status::Failures => ExitCode::from(EXIT_FAILURES),
        }
    }
}
