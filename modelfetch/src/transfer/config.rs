//! Configuration for the transfer engine.

use std::path::PathBuf;
use std::time::Duration;

use crate::manifest::DEFAULT_MANIFEST_TIMEOUT;

/// Default destination root.
pub const DEFAULT_ROOT: &str = "/app/ComfyUI";

/// Default time a transfer may go without receiving data.
pub const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connect timeout for artifact downloads.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Browser-like user agent; some model hosts reject bare clients.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";

/// Configuration for the [`TransferEngine`](super::TransferEngine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Destination root every entry path is relative to.
    pub root: PathBuf,

    /// How long a transfer may receive nothing before it is abandoned.
    ///
    /// A transfer that keeps making progress is never cut off, however
    /// long it runs.
    pub stall_timeout: Duration,

    /// Connect timeout for HTTP transfers.
    pub connect_timeout: Duration,

    /// Timeout for fetching remote manifests.
    pub manifest_timeout: Duration,

    /// Number of concurrent workers. `1` runs sequentially.
    pub parallel: usize,

    /// Whether the external curl strategy may be used when available.
    pub use_curl: bool,

    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            stall_timeout: DEFAULT_STALL_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            manifest_timeout: DEFAULT_MANIFEST_TIMEOUT,
            parallel: 1,
            use_curl: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl EngineConfig {
    /// Create a configuration rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Set the stall timeout.
    pub fn with_stall_timeout(mut self, timeout: Duration) -> Self {
        self.stall_timeout = timeout;
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the manifest fetch timeout.
    pub fn with_manifest_timeout(mut self, timeout: Duration) -> Self {
        self.manifest_timeout = timeout;
        self
    }

    /// Set the worker count (minimum 1).
    pub fn with_parallel(mut self, parallel: usize) -> Self {
        self.parallel = parallel.max(1);
        self
    }

    /// Enable or disable the external curl strategy.
    pub fn with_curl(mut self, enabled: bool) -> Self {
        self.use_curl = enabled;
        self
    }

    /// Set the `User-Agent` header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}
