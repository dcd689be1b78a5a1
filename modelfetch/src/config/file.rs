//! INI configuration file.
//!
//! ```ini
//! [paths]
//! root = /app/ComfyUI
//!
//! [download]
//! timeout = 30
//! manifest_timeout = 30
//! parallel = 1
//! use_curl = true
//! user_agent = Mozilla/5.0
//!
//! [logging]
//! file = /var/log/modelfetch.log
//! ```
//!
//! Every key is optional; absent keys keep their built-in defaults.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::{Ini, Properties};
use thiserror::Error;

/// Application directory under the platform config dir.
const APP_DIR: &str = "modelfetch";

/// Config file name.
const CONFIG_FILE: &str = "config.ini";

/// Errors reading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read config file {}: {source}", path.display())]
    ReadFailed { path: PathBuf, source: io::Error },

    /// The file is not valid INI.
    #[error("failed to parse config file {}: {reason}", path.display())]
    ParseFailed { path: PathBuf, reason: String },

    /// A key holds a value of the wrong form.
    #[error("invalid value for {section}.{key}: `{value}` ({reason})")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// `[paths]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathsSection {
    /// Destination root.
    pub root: Option<PathBuf>,
}

/// `[download]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSection {
    pub timeout: Option<Duration>,
    pub manifest_timeout: Option<Duration>,
    pub parallel: Option<usize>,
    pub use_curl: Option<bool>,
    pub user_agent: Option<String>,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingSection {
    /// Also write logs to this file.
    pub file: Option<PathBuf>,
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub paths: PathsSection,
    pub download: DownloadSection,
    pub logging: LoggingSection,
}

/// Default location of the configuration file.
///
/// `~/.config/modelfetch/config.ini` on Linux; falls back to the working
/// directory when the platform has no config dir.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(CONFIG_FILE)
}

impl ConfigFile {
    /// Load from the default location. A missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| match e {
            ini::Error::Io(source) => ConfigError::ReadFailed {
                path: path.to_path_buf(),
                source,
            },
            ini::Error::Parse(e) => ConfigError::ParseFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
        })?;

        Self::from_ini(&ini)
    }

    /// Parse configuration text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::ParseFailed {
            path: PathBuf::from("<string>"),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some("paths")) {
            config.paths.root = non_empty(section, "root").map(PathBuf::from);
        }

        if let Some(section) = ini.section(Some("download")) {
            config.download.timeout =
                parse_value(section, "download", "timeout", parse_seconds)?;
            config.download.manifest_timeout =
                parse_value(section, "download", "manifest_timeout", parse_seconds)?;
            config.download.parallel =
                parse_value(section, "download", "parallel", parse_parallel)?;
            config.download.use_curl = parse_value(section, "download", "use_curl", parse_bool)?;
            config.download.user_agent = non_empty(section, "user_agent").map(str::to_string);
        }

        if let Some(section) = ini.section(Some("logging")) {
            config.logging.file = non_empty(section, "file").map(PathBuf::from);
        }

        Ok(config)
    }
}

fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

fn parse_value<T>(
    section: &Properties,
    section_name: &str,
    key: &str,
    parse: fn(&str) -> Result<T, String>,
) -> Result<Option<T>, ConfigError> {
    let Some(raw) = non_empty(section, key) else {
        return Ok(None);
    };
    parse(raw)
        .map(Some)
        .map_err(|reason| ConfigError::InvalidValue {
            section: section_name.to_string(),
            key: key.to_string(),
            value: raw.to_string(),
            reason,
        })
}

fn parse_seconds(raw: &str) -> Result<Duration, String> {
    match raw.parse::<u64>() {
        Ok(0) => Err("must be at least 1 second".to_string()),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(e.to_string()),
    }
}

fn parse_parallel(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err("expected true or false".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_default() {
        let temp = TempDir::new().unwrap();
        let config = ConfigFile::load_from(&temp.path().join("absent.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_full_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(
            &path,
            "[paths]\nroot = /srv/comfy\n\n\
             [download]\ntimeout = 120\nmanifest_timeout = 10\nparallel = 4\n\
             use_curl = no\nuser_agent = modelfetch/0.1\n\n\
             [logging]\nfile = /tmp/modelfetch.log\n",
        )
        .unwrap();

        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(config.paths.root, Some(PathBuf::from("/srv/comfy")));
        assert_eq!(config.download.timeout, Some(Duration::from_secs(120)));
        assert_eq!(config.download.manifest_timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.download.parallel, Some(4));
        assert_eq!(config.download.use_curl, Some(false));
        assert_eq!(config.download.user_agent.as_deref(), Some("modelfetch/0.1"));
        assert_eq!(config.logging.file, Some(PathBuf::from("/tmp/modelfetch.log")));
    }

    #[test]
    fn test_empty_values_are_unset() {
        let config = ConfigFile::parse("[paths]\nroot =\n[download]\nparallel = \n").unwrap();
        assert_eq!(config.paths.root, None);
        assert_eq!(config.download.parallel, None);
    }

    #[test]
    fn test_invalid_number() {
        let err = ConfigFile::parse("[download]\nparallel = many\n").unwrap_err();
        match err {
            ConfigError::InvalidValue { section, key, value, .. } => {
                assert_eq!(section, "download");
                assert_eq!(key, "parallel");
                assert_eq!(value, "many");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_zero_values_rejected() {
        assert!(ConfigFile::parse("[download]\nparallel = 0\n").is_err());
        assert!(ConfigFile::parse("[download]\ntimeout = 0\n").is_err());
    }

    #[test]
    fn test_invalid_bool() {
        assert!(ConfigFile::parse("[download]\nuse_curl = maybe\n").is_err());
    }

    #[test]
    fn test_config_file_path_name() {
        let path = config_file_path();
        assert!(path.ends_with("modelfetch/config.ini"));
    }
}
