//! Tracing subscriber initialisation.
//!
//! Logs go to stderr so they never interleave with the report on stdout.
//! `RUST_LOG` always wins; otherwise the level is `warn`, or `debug` with
//! `verbose`. An optional log file receives the same events without ANSI
//! colours through a non-blocking writer.
//!
//! Front ends that draw on stderr themselves (progress bars) pass their own
//! writer to [`init_with_writer`] so log lines do not tear the display.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::{self, time::LocalTime, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Errors setting up logging.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// `RUST_LOG` or the built-in directive did not parse.
    #[error("invalid log filter: {0}")]
    InvalidFilter(String),

    /// The log file could not be opened.
    #[error("failed to open log file {}: {reason}", path.display())]
    FileFailed { path: PathBuf, reason: String },

    /// A global subscriber was already installed.
    #[error("logging already initialised: {0}")]
    AlreadyInitialised(String),
}

/// Logging options.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Raise the default level to `debug`.
    pub verbose: bool,
    /// Also write logs to this file.
    pub file: Option<PathBuf>,
}

impl LogConfig {
    /// Directive used when `RUST_LOG` is not set.
    pub fn default_directive(&self) -> &'static str {
        if self.verbose {
            "modelfetch=debug,modelfetch_cli=debug,warn"
        } else {
            "warn"
        }
    }
}

/// Install the global subscriber.
///
/// The returned guard flushes the log file when dropped and must be held for
/// the life of the program.
///
/// # Errors
///
/// Fails if the filter is invalid, the log file cannot be opened, or a
/// subscriber is already installed.
pub fn init(config: &LogConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    init_with_writer(config, std::io::stderr)
}

/// Install the global subscriber with `console` in place of stderr.
///
/// # Errors
///
/// As for [`init`].
pub fn init_with_writer<W>(
    config: &LogConfig,
    console: W,
) -> Result<Option<WorkerGuard>, LoggingError>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.default_directive()))
        .map_err(|e| LoggingError::InvalidFilter(e.to_string()))?;

    let stderr_layer = fmt::layer()
        .with_writer(console)
        .with_target(false)
        .compact();

    let (file_layer, guard) = match &config.file {
        Some(path) => {
            let appender = open_appender(path)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(LocalTime::rfc_3339())
                .with_thread_names(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialised(e.to_string()))?;

    Ok(guard)
}

fn open_appender(path: &Path) -> Result<RollingFileAppender, LoggingError> {
    let file_failed = |reason: String| LoggingError::FileFailed {
        path: path.to_path_buf(),
        reason,
    };

    let file_name = path
        .file_name()
        .ok_or_else(|| file_failed("not a file path".to_string()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy())
        .build(dir)
        .map_err(|e| file_failed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_directive() {
        assert_eq!(LogConfig::default().default_directive(), "warn");
        let verbose = LogConfig {
            verbose: true,
            file: None,
        };
        assert!(verbose.default_directive().contains("modelfetch=debug"));
    }

    #[test]
    fn test_open_appender_creates_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("modelfetch.log");

        let appender = open_appender(&path).unwrap();
        drop(appender);
        assert!(path.exists());
    }

    #[test]
    fn test_open_appender_rejects_dir_path() {
        let err = open_appender(Path::new("/")).unwrap_err();
        assert!(matches!(err, LoggingError::FileFailed { .. }));
    }
}
