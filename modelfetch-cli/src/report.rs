//! Human-readable reports: merge summary, listing, dry run, run summary.

use std::collections::BTreeMap;
use std::path::Path;

use modelfetch::manifest::{ManifestSource, ModelEntry};
use modelfetch::plan::{Plan, SourceSummary};
use modelfetch::transfer::{EntryKind, PlannedAction, PlannedStep, TransferReport};

use crate::output::Output;

/// Print what each manifest contributed.
pub fn print_source_summary(out: &dyn Output, plan: &Plan) {
    out.header("Manifests");
    for summary in &plan.sources {
        print_source(out, summary);
    }

    if plan.sources.len() > 1 {
        out.newline();
        let mut line = format!(
            "Combined: {} models, {} nodes; skipped {} duplicate models, {} duplicate nodes",
            plan.models.len(),
            plan.nodes.len(),
            plan.model_duplicate_count(),
            plan.node_duplicate_count()
        );
        if plan.rejected_count() > 0 {
            line.push_str(&format!("; rejected {} entries", plan.rejected_count()));
        }
        out.println(&line);
    }
    out.newline();
}

fn print_source(out: &dyn Output, summary: &SourceSummary) {
    if let Some(error) = &summary.load_error {
        out.failure(&format!("{}: {}", summary.source, error));
        return;
    }

    let mut line = format!(
        "{}: added {} models, {} nodes",
        summary.source, summary.models_added, summary.nodes_added
    );
    if summary.duplicates() > 0 {
        line.push_str(&format!("; skipped {} duplicates", summary.duplicates()));
    }
    out.success(&line);

    for rejected in &summary.rejected {
        out.indented(&format!("rejected: {}", rejected));
    }
}

/// Print the plan contents grouped by model type.
///
/// When more than one manifest loaded, each line names the manifest that
/// supplied the entry.
pub fn print_listing(out: &dyn Output, plan: &Plan) {
    let show_sources = plan.sources.iter().filter(|s| s.loaded()).count() > 1;
    let origin = |source: Option<&ManifestSource>| match source {
        Some(source) if show_sources => format!("  [{}]", source),
        _ => String::new(),
    };

    let mut by_type: BTreeMap<&str, Vec<(usize, &ModelEntry)>> = BTreeMap::new();
    for (index, entry) in plan.models.iter().enumerate() {
        by_type
            .entry(entry.model_type.as_str())
            .or_default()
            .push((index, entry));
    }

    out.header(&format!("Models ({})", plan.models.len()));
    for (model_type, entries) in &by_type {
        out.newline();
        out.subheader(&format!("{} ({})", model_type.to_uppercase(), entries.len()));
        for (index, entry) in entries {
            out.indented(&format!(
                "{} -> {}{}",
                entry.name,
                entry.relative_target().display(),
                origin(plan.model_source(*index))
            ));
        }
    }

    out.newline();
    out.header(&format!("Custom nodes ({})", plan.nodes.len()));
    for (index, node) in plan.nodes.iter().enumerate() {
        out.indented(&format!(
            "{} ({}){}",
            node.name,
            node.repo_url,
            origin(plan.node_source(index))
        ));
    }
}

/// Print what a run would do, one line per entry.
pub fn print_dry_run(out: &dyn Output, root: &Path, actions: &[PlannedAction]) {
    out.header(&format!("Dry run into {}", root.display()));
    if actions.is_empty() {
        out.println("Nothing to do.");
        return;
    }

    for action in actions {
        out.indented(&format!(
            "[{}] {}: {} -> {}",
            action.id.kind,
            action.name,
            describe(&action.step),
            action.target.display()
        ));
    }
}

fn describe(step: &PlannedStep) -> String {
    match step {
        PlannedStep::Download => "download".to_string(),
        PlannedStep::Resume { bytes } => format!("resume from {} bytes", bytes),
        PlannedStep::SkipPresent => "skip (already present)".to_string(),
        PlannedStep::Verify => "verify existing file".to_string(),
        PlannedStep::Clone => "clone".to_string(),
        PlannedStep::SkipInstalled => "skip (already installed)".to_string(),
    }
}

/// Print per-entry outcomes and the totals.
pub fn print_summary(out: &dyn Output, report: &TransferReport) {
    out.newline();
    out.header("Summary");

    for (kind, title) in [(EntryKind::Model, "Models"), (EntryKind::Node, "Custom nodes")] {
        let mut entries = report.of_kind(kind).peekable();
        if entries.peek().is_none() {
            continue;
        }
        out.subheader(title);
        for entry in entries {
            let line = format!("{}: {}", entry.name, entry.outcome);
            if entry.outcome.is_success() {
                out.success(&line);
            } else {
                out.failure(&line);
            }
        }
    }

    out.newline();
    out.println(&format!(
        "{} succeeded ({} installed, {} skipped), {} failed",
        report.succeeded(),
        report.installed(),
        report.skipped(),
        report.failed()
    ));

    if report.installed() > 0 {
        out.newline();
        out.println("Restart ComfyUI to pick up the new models and nodes.");
    }
}
