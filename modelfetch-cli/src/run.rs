//! The top-level flow: load, filter, then list, plan or install.

use modelfetch::config::{root_from_env, ConfigFile};
use modelfetch::manifest::{ManifestFetcher, ManifestMerger, ManifestSource};
use modelfetch::transfer::{build_client, TransferEngine, TransferObserver};
use tracing::{debug, info};

use crate::args::Args;
use crate::error::{CliError, Status};
use crate::output::Output;
use crate::report;

/// Run one invocation.
///
/// Entry failures are reported and turn into [`Status::Failures`]; only
/// usage and setup problems surface as errors.
pub fn run(
    args: &Args,
    config: &ConfigFile,
    out: &dyn Output,
    observer: &dyn TransferObserver,
) -> Result<Status, CliError> {
    let filter = args.filter_config()?;
    let engine_config = args.overrides().resolve(root_from_env(), config);
    debug!(?engine_config, "Resolved configuration");

    let client = build_client(&engine_config)?;
    let fetcher = ManifestFetcher::new(client.clone(), engine_config.manifest_timeout);

    let sources: Vec<ManifestSource> = args
        .sources
        .iter()
        .map(|s| ManifestSource::parse(s))
        .collect();
    let merged = ManifestMerger::load(&fetcher, &sources);
    report::print_source_summary(out, &merged);

    if merged.failed_sources().count() == merged.sources.len() {
        out.failure("No manifest could be loaded.");
        return Ok(Status::Failures);
    }

    let plan = merged.filter(&filter);
    info!(
        models = plan.models.len(),
        nodes = plan.nodes.len(),
        "Plan ready"
    );

    if args.list {
        report::print_listing(out, &plan);
        return Ok(Status::Success);
    }

    let engine = TransferEngine::new(&engine_config, client);

    if args.dry_run {
        report::print_dry_run(out, engine.root(), &engine.plan_actions(&plan));
        return Ok(Status::Success);
    }

    if plan.is_empty() {
        out.println("Nothing to install.");
        return Ok(Status::Success);
    }

    let transfers = engine.run(&plan, observer);
    report::print_summary(out, &transfers);

    Ok(if transfers.all_succeeded() {
        Status::Success
    } else {
        Status::Failures
    })
}
