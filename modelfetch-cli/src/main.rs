//! modelfetch CLI
//!
//! Installs models and custom nodes listed in one or more JSON manifests.

mod args;
mod error;
mod output;
mod progress;
mod report;
mod run;

use std::process::ExitCode;

use clap::Parser;
use console::style;
use modelfetch::config::ConfigFile;
use modelfetch::logging::{self, LogConfig};

use args::Args;
use error::CliError;
use output::ConsoleOutput;
use progress::ProgressObserver;

fn main() -> ExitCode {
    let args = Args::parse();

    match start(&args) {
        Ok(status) => status.into(),
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            e.exit_code()
        }
    }
}

fn start(args: &Args) -> Result<error::Status, CliError> {
    // Reject bad flag combinations before touching the filesystem or network.
    args.filter_config()?;

    let config = match &args.config {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load().unwrap_or_default(),
    };

    // Log lines on stderr must not tear through the progress bars.
    let progress = ProgressObserver::new();
    let _guard = logging::init_with_writer(
        &LogConfig {
            verbose: args.verbose,
            file: args.log_file.clone().or_else(|| config.logging.file.clone()),
        },
        progress.log_writer(),
    )?;

    run::run(args, &config, &ConsoleOutput::new(), &progress)
}
