//! Layered configuration.
//!
//! Values are taken from, in order of precedence:
//! 1. command-line flags ([`Overrides`])
//! 2. the environment (`COMFYUI_PATH` for the destination root)
//! 3. the INI file ([`ConfigFile`])
//! 4. built-in defaults ([`EngineConfig::default`])

mod file;

use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub use file::{
    config_file_path, ConfigError, ConfigFile, DownloadSection, LoggingSection, PathsSection,
};

use crate::transfer::EngineConfig;

/// Environment variable naming the destination root.
pub const ROOT_ENV: &str = "COMFYUI_PATH";

/// Destination root from the environment, if set and non-empty.
pub fn root_from_env() -> Option<PathBuf> {
    env::var_os(ROOT_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Settings given explicitly on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub root: Option<PathBuf>,
    pub timeout: Option<Duration>,
    pub parallel: Option<usize>,
    /// `--no-curl`; can only disable, never force-enable.
    pub no_curl: bool,
}

impl Overrides {
    /// Merge the layers into an engine configuration.
    ///
    /// `env_root` is normally [`root_from_env`]; it is a parameter so the
    /// precedence can be exercised without touching process state.
    pub fn resolve(&self, env_root: Option<PathBuf>, file: &ConfigFile) -> EngineConfig {
        let defaults = EngineConfig::default();

        let root = self
            .root
            .clone()
            .or(env_root)
            .or_else(|| file.paths.root.clone())
            .unwrap_or(defaults.root);

        EngineConfig {
            root,
            stall_timeout: self
                .timeout
                .or(file.download.timeout)
                .unwrap_or(defaults.stall_timeout),
            connect_timeout: defaults.connect_timeout,
            manifest_timeout: file
                .download
                .manifest_timeout
                .unwrap_or(defaults.manifest_timeout),
            parallel: self
                .parallel
                .or(file.download.parallel)
                .unwrap_or(defaults.parallel)
                .max(1),
            use_curl: !self.no_curl && file.download.use_curl.unwrap_or(defaults.use_curl),
            user_agent: file
                .download
                .user_agent
                .clone()
                .unwrap_or(defaults.user_agent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_with_root(root: &str) -> ConfigFile {
        ConfigFile::parse(&format!(
            "[paths]\nroot = {root}\n[download]\nparallel = 3\nuse_curl = false\n"
        ))
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = Overrides::default().resolve(None, &ConfigFile::default());
        assert_eq!(config.root, PathBuf::from("/app/ComfyUI"));
        assert_eq!(config.parallel, 1);
        assert!(config.use_curl);
    }

    #[test]
    fn test_file_beats_defaults() {
        let config = Overrides::default().resolve(None, &file_with_root("/from/file"));
        assert_eq!(config.root, PathBuf::from("/from/file"));
        assert_eq!(config.parallel, 3);
        assert!(!config.use_curl);
    }

    #[test]
    fn test_env_beats_file() {
        let config = Overrides::default().resolve(
            Some(PathBuf::from("/from/env")),
            &file_with_root("/from/file"),
        );
        assert_eq!(config.root, PathBuf::from("/from/env"));
    }

    #[test]
    fn test_cli_beats_everything() {
        let overrides = Overrides {
            root: Some(PathBuf::from("/from/cli")),
            timeout: Some(Duration::from_secs(5)),
            parallel: Some(8),
            no_curl: false,
        };
        let config = overrides.resolve(Some(PathBuf::from("/from/env")), &file_with_root("/f"));
        assert_eq!(config.root, PathBuf::from("/from/cli"));
        assert_eq!(config.stall_timeout, Duration::from_secs(5));
        assert_eq!(config.parallel, 8);
    }

    #[test]
    fn test_no_curl_flag_disables() {
        let overrides = Overrides {
            no_curl: true,
            ..Default::default()
        };
        assert!(!overrides.resolve(None, &ConfigFile::default()).use_curl);
    }
}
