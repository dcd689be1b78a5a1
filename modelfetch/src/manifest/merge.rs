//! Combining several manifests into one deduplicated plan.
//!
//! Sources are folded in the order given. Entries are keyed by their
//! lower-cased URL (repository URL for nodes); the first occurrence wins and
//! every later occurrence is counted as a duplicate of the source that
//! carried it. Merging the same ordered sources always yields the same plan.

use std::collections::HashMap;

use tracing::{info, warn};

use super::error::ManifestError;
use super::parser::{parse_manifest, ManifestFragment};
use super::source::{ManifestResolver, ManifestSource};
use crate::plan::{Plan, SourceSummary};

/// Incrementally builds a [`Plan`] from manifest fragments.
#[derive(Debug, Default)]
pub struct ManifestMerger {
    plan: Plan,
    /// Identity key -> index of the source that first supplied the model.
    seen_models: HashMap<String, usize>,
    /// Identity key -> index of the source that first supplied the node.
    seen_nodes: HashMap<String, usize>,
}

impl ManifestMerger {
    /// Create an empty merger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve, parse and merge every source in order.
    ///
    /// A source that cannot be resolved or parsed is recorded in its
    /// [`SourceSummary`] and skipped; the remaining sources still merge.
    pub fn load(resolver: &dyn ManifestResolver, sources: &[ManifestSource]) -> Plan {
        let mut merger = Self::new();

        for source in sources {
            match resolver.resolve(source).and_then(|text| parse_manifest(&text)) {
                Ok(fragment) => {
                    merger.fold(source.clone(), fragment);
                }
                Err(error) => {
                    merger.record_failure(source.clone(), error);
                }
            }
        }

        merger.finish()
    }

    /// Fold a parsed fragment from `source` into the running plan.
    pub fn fold(&mut self, source: ManifestSource, fragment: ManifestFragment) -> &SourceSummary {
        let source_index = self.plan.sources.len();
        let mut summary = SourceSummary::new(source);
        summary.rejected = fragment.rejected;

        for entry in fragment.models {
            let key = entry.identity_key();
            if let Some(&first) = self.seen_models.get(&key) {
                warn!(
                    name = %entry.name,
                    first_source = %self.source_label(first),
                    "Duplicate model skipped"
                );
                summary.model_duplicates += 1;
                continue;
            }
            self.seen_models.insert(key, source_index);
            self.plan.models.push(entry);
            self.plan.model_sources.push(source_index);
            summary.models_added += 1;
        }

        for entry in fragment.nodes {
            let key = entry.identity_key();
            if let Some(&first) = self.seen_nodes.get(&key) {
                warn!(
                    name = %entry.name,
                    first_source = %self.source_label(first),
                    "Duplicate custom node skipped"
                );
                summary.node_duplicates += 1;
                continue;
            }
            self.seen_nodes.insert(key, source_index);
            self.plan.nodes.push(entry);
            self.plan.node_sources.push(source_index);
            summary.nodes_added += 1;
        }

        info!(
            source = %summary.source,
            models = summary.models_added,
            nodes = summary.nodes_added,
            duplicates = summary.duplicates(),
            rejected = summary.rejected.len(),
            "Merged manifest"
        );

        self.plan.sources.push(summary);
        &self.plan.sources[source_index]
    }

    /// Record a source that could not be loaded or parsed.
    pub fn record_failure(&mut self, source: ManifestSource, error: ManifestError) -> &SourceSummary {
        warn!(source = %source, error = %error, "Skipping manifest");
        let mut summary = SourceSummary::new(source);
        summary.load_error = Some(error);
        self.plan.sources.push(summary);
        &self.plan.sources[self.plan.sources.len() - 1]
    }

    /// Consume the merger and return the plan.
    pub fn finish(self) -> Plan {
        self.plan
    }

    fn source_label(&self, index: usize) -> String {
        self.plan
            .sources
            .get(index)
            .map(|s| s.source.to_string())
            .unwrap_or_default()
    }
}
