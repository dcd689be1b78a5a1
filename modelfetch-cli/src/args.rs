//! Command-line arguments.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use modelfetch::config::Overrides;
use modelfetch::plan::{FilterConfig, FilterError};

/// Install models and custom nodes described by JSON manifests.
///
/// Manifests are merged in the order given; an entry that appears in more
/// than one manifest is installed once, from the first manifest that lists it.
#[derive(Debug, Parser)]
#[command(name = "modelfetch", version, about)]
pub struct Args {
    /// Manifest files or http(s) URLs
    #[arg(required = true, value_name = "MANIFEST")]
    pub sources: Vec<String>,

    /// Only install models of these types (space or comma separated)
    #[arg(long, value_name = "TYPE", num_args = 1.., value_delimiter = ',')]
    pub types: Vec<String>,

    /// Install models only, skip custom nodes
    #[arg(long)]
    pub models_only: bool,

    /// Install custom nodes only, skip models
    #[arg(long)]
    pub nodes_only: bool,

    /// List what the manifests contain and exit
    #[arg(long)]
    pub list: bool,

    /// Show what would be done without downloading anything
    #[arg(long)]
    pub dry_run: bool,

    /// Destination root [env: COMFYUI_PATH] [default: /app/ComfyUI]
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Number of concurrent transfers
    #[arg(long, value_name = "N", value_parser = parse_positive)]
    pub parallel: Option<usize>,

    /// Seconds a download may stall without progress before it is abandoned
    #[arg(long, value_name = "SECS", value_parser = parse_positive)]
    pub timeout: Option<usize>,

    /// Never use the external curl binary
    #[arg(long)]
    pub no_curl: bool,

    /// Configuration file [default: ~/.config/modelfetch/config.ini]
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Also write logs to this file
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

impl Args {
    /// Validate the filter flags.
    pub fn filter_config(&self) -> Result<FilterConfig, FilterError> {
        let types: BTreeSet<String> = self
            .types
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        FilterConfig::new(Some(types), self.models_only, self.nodes_only)
    }

    /// Settings that override the config file.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            root: self.root.clone(),
            timeout: self.timeout.map(|secs| Duration::from_secs(secs as u64)),
            parallel: self.parallel,
            no_curl: self.no_curl,
        }
    }
}

fn parse_positive(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}
