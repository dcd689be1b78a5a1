//! Transfer strategies.
//!
//! A strategy moves the bytes behind one URL into a staging file, resuming
//! from whatever the staging file already holds. Strategies are layered:
//! the first one that succeeds wins, and a later strategy picks up from the
//! partial file an earlier one left behind.

use std::path::Path;

use reqwest::blocking::Client;
use tracing::{debug, warn};

use super::config::EngineConfig;
use super::curl::CurlStrategy;
use super::error::{TransferError, TransferResult};
use super::http::HttpStrategy;

/// Progress callback: `(bytes_on_disk, total_if_known)`.
pub type ProgressFn<'a> = &'a dyn Fn(u64, Option<u64>);

/// A way of fetching one URL into a staging file.
pub trait TransferStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Fetch `url` into `staging`, resuming from its current size.
    ///
    /// Returns the size of the staging file once the transfer completed.
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer did not complete. Any partial data
    /// is left in `staging`.
    fn fetch(&self, url: &str, staging: &Path, progress: ProgressFn<'_>) -> TransferResult<u64>;
}

/// Tries each strategy in order until one completes.
pub struct LayeredStrategy {
    strategies: Vec<Box<dyn TransferStrategy>>,
}

impl LayeredStrategy {
    /// Build a layered strategy from explicit parts.
    pub fn new(strategies: Vec<Box<dyn TransferStrategy>>) -> Self {
        Self { strategies }
    }

    /// Probe the environment once and build the default layering:
    /// external curl (when enabled and installed), then the built-in client.
    pub fn probe(config: &EngineConfig, client: Client) -> Self {
        let mut strategies: Vec<Box<dyn TransferStrategy>> = Vec::new();

        if config.use_curl {
            match CurlStrategy::probe(config) {
                Some(curl) => strategies.push(Box::new(curl)),
                None => debug!("curl not available, using built-in HTTP client only"),
            }
        }
        strategies.push(Box::new(HttpStrategy::new(client, config.stall_timeout)));

        debug!(strategies = ?strategy_names(&strategies), "Transfer strategies selected");
        Self { strategies }
    }

    /// Names of the strategies in the order they are tried.
    pub fn names(&self) -> Vec<&'static str> {
        strategy_names(&self.strategies)
    }
}

impl TransferStrategy for LayeredStrategy {
    fn name(&self) -> &'static str {
        "layered"
    }

    fn fetch(&self, url: &str, staging: &Path, progress: ProgressFn<'_>) -> TransferResult<u64> {
        let mut last_error = None;

        for strategy in &self.strategies {
            match strategy.fetch(url, staging, progress) {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    warn!(strategy = strategy.name(), url = %url, error = %e, "Transfer attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| TransferError::download(url, "no transfer strategy available")))
    }
}

fn strategy_names(strategies: &[Box<dyn TransferStrategy>]) -> Vec<&'static str> {
    strategies.iter().map(|s| s.name()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Appends `chunk` and then fails or succeeds.
    struct ScriptedStrategy {
        name: &'static str,
        chunk: &'static [u8],
        succeed: bool,
        calls: Arc<AtomicUsize>,
    }

    impl TransferStrategy for ScriptedStrategy {
        fn name(&self) -> &'static str {
            self.name
        }

        fn fetch(&self, url: &str, staging: &Path, progress: ProgressFn<'_>) -> TransferResult<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(staging)
                .unwrap();
            file.write_all(self.chunk).unwrap();
            let size = staging.metadata().unwrap().len();
            progress(size, None);
            if self.succeed {
                Ok(size)
            } else {
                Err(TransferError::download(url, "connection reset"))
            }
        }
    }

    fn scripted(
        name: &'static str,
        chunk: &'static [u8],
        succeed: bool,
    ) -> (Box<dyn TransferStrategy>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let strategy = ScriptedStrategy {
            name,
            chunk,
            succeed,
            calls: Arc::clone(&calls),
        };
        (Box::new(strategy), calls)
    }

    #[test]
    fn test_later_strategy_resumes_partial_data() {
        let temp = TempDir::new().unwrap();
        let staging = temp.path().join("a.bin.part");

        let (first, first_calls) = scripted("first", b"hello ", false);
        let (second, second_calls) = scripted("second", b"world", true);
        let layered = LayeredStrategy::new(vec![first, second]);

        let bytes = layered.fetch("https://h/a.bin", &staging, &|_, _| {}).unwrap();

        assert_eq!(bytes, 11);
        assert_eq!(std::fs::read(&staging).unwrap(), b"hello world");
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_first_success_short_circuits() {
        let temp = TempDir::new().unwrap();
        let staging = temp.path().join("a.bin.part");

        let (first, _) = scripted("first", b"done", true);
        let (second, second_calls) = scripted("second", b"never", true);
        let layered = LayeredStrategy::new(vec![first, second]);

        layered.fetch("https://h/a.bin", &staging, &|_, _| {}).unwrap();
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_all_failing_returns_last_error() {
        let temp = TempDir::new().unwrap();
        let staging = temp.path().join("a.bin.part");

        let (first, _) = scripted("first", b"x", false);
        let (second, _) = scripted("second", b"y", false);
        let layered = LayeredStrategy::new(vec![first, second]);

        let err = layered
            .fetch("https://h/a.bin", &staging, &|_, _| {})
            .unwrap_err();
        assert!(matches!(err, TransferError::DownloadFailed { .. }));
        // Partial data stays for a later resume.
        assert_eq!(std::fs::read(&staging).unwrap(), b"xy");
    }

    #[test]
    fn test_empty_layering_fails() {
        let temp = TempDir::new().unwrap();
        let layered = LayeredStrategy::new(Vec::new());
        let err = layered
            .fetch("https://h/a.bin", &temp.path().join("a"), &|_, _| {})
            .unwrap_err();
        assert!(err.to_string().contains("no transfer strategy"));
    }

    #[test]
    fn test_probe_without_curl_uses_http_only() {
        let config = EngineConfig::default().with_curl(false);
        let layered = LayeredStrategy::probe(&config, Client::new());
        assert_eq!(layered.names(), vec!["http"]);
    }
}
