//! External `curl` transfer strategy.
//!
//! curl handles some hosts (odd TLS setups, flaky redirects) better than the
//! built-in client, so it is preferred when installed. Progress is reported
//! by polling the staging file size while the process runs. A transfer is
//! abandoned only when it stalls (`--speed-limit 1 --speed-time N`), never
//! for running long.

use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use tracing::debug;

use super::config::EngineConfig;
use super::error::{TransferError, TransferResult};
use super::strategy::{ProgressFn, TransferStrategy};

/// Default executable name.
const CURL_PROGRAM: &str = "curl";

/// How often the staging file is polled for progress.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Transfers by spawning `curl -fL -C - ...`.
#[derive(Debug, Clone)]
pub struct CurlStrategy {
    program: String,
    user_agent: String,
    connect_timeout: Duration,
    stall_timeout: Duration,
}

impl CurlStrategy {
    /// Create a strategy for `program` without checking that it runs.
    pub fn new(program: impl Into<String>, config: &EngineConfig) -> Self {
        Self {
            program: program.into(),
            user_agent: config.user_agent.clone(),
            connect_timeout: config.connect_timeout,
            stall_timeout: config.stall_timeout,
        }
    }

    /// Return a strategy if `curl --version` runs successfully.
    pub fn probe(config: &EngineConfig) -> Option<Self> {
        Self::probe_program(CURL_PROGRAM, config)
    }

    /// Probe a specific executable.
    pub fn probe_program(program: &str, config: &EngineConfig) -> Option<Self> {
        let available = Command::new(program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false);

        debug!(program = %program, available, "Probed curl");
        available.then(|| Self::new(program, config))
    }

    fn command(&self, url: &str, staging: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(["-f", "-L", "-sS", "-C", "-"])
            .args(["--speed-limit", "1", "--speed-time"])
            .arg(self.stall_timeout.as_secs().max(1).to_string())
            .arg("--connect-timeout")
            .arg(self.connect_timeout.as_secs().to_string())
            .arg("--create-dirs")
            .arg("-A")
            .arg(&self.user_agent)
            .arg("-o")
            .arg(staging)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        command
    }
}

impl TransferStrategy for CurlStrategy {
    fn name(&self) -> &'static str {
        "curl"
    }

    fn fetch(&self, url: &str, staging: &Path, progress: ProgressFn<'_>) -> TransferResult<u64> {
        let mut child = self
            .command(url, staging)
            .spawn()
            .map_err(|e| TransferError::tool("curl", format!("could not start: {}", e)))?;

        loop {
            match child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) => {
                    progress(file_size(staging), None);
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => return Err(TransferError::tool("curl", e)),
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|e| TransferError::tool("curl", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = match stderr.trim() {
                "" => output.status.to_string(),
                message => format!("{} ({})", message, output.status),
            };
            return Err(TransferError::tool("curl", reason));
        }

        let size = file_size(staging);
        progress(size, Some(size));
        Ok(size)
    }
}

fn file_size(path: &Path) -> u64 {
    path.metadata().map(|m| m.len()).unwrap_or(0)
}
