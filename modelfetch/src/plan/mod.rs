//! The merged work plan.
//!
//! A [`Plan`] is the single value threaded from the merger through the
//! filter to the transfer engine. It holds the surviving entries in
//! first-seen order together with their provenance, so every report can say
//! which manifest contributed what.

pub mod filter;

pub use filter::{FilterConfig, FilterError};

use crate::manifest::{ManifestError, ManifestSource, ModelEntry, NodeEntry};

/// Per-source accounting recorded while merging.
#[derive(Debug, Clone)]
pub struct SourceSummary {
    /// The manifest source.
    pub source: ManifestSource,
    /// Models this source contributed to the plan.
    pub models_added: usize,
    /// Nodes this source contributed to the plan.
    pub nodes_added: usize,
    /// Models dropped because an earlier source already supplied them.
    pub model_duplicates: usize,
    /// Nodes dropped because an earlier source already supplied them.
    pub node_duplicates: usize,
    /// Entries rejected while parsing.
    pub rejected: Vec<ManifestError>,
    /// Why the source could not be loaded at all, if it could not.
    pub load_error: Option<ManifestError>,
}

impl SourceSummary {
    pub(crate) fn new(source: ManifestSource) -> Self {
        Self {
            source,
            models_added: 0,
            nodes_added: 0,
            model_duplicates: 0,
            node_duplicates: 0,
            rejected: Vec::new(),
            load_error: None,
        }
    }

    /// Whether the manifest was read and parsed.
    pub fn loaded(&self) -> bool {
        self.load_error.is_none()
    }

    /// Duplicates of either kind attributed to this source.
    pub fn duplicates(&self) -> usize {
        self.model_duplicates + self.node_duplicates
    }
}

/// Deduplicated, ordered work plan.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    /// Model entries in first-seen order.
    pub models: Vec<ModelEntry>,
    /// Node entries in first-seen order.
    pub nodes: Vec<NodeEntry>,
    /// Index into `sources` of the source that supplied each model.
    pub model_sources: Vec<usize>,
    /// Index into `sources` of the source that supplied each node.
    pub node_sources: Vec<usize>,
    /// One summary per manifest source, in load order.
    pub sources: Vec<SourceSummary>,
}

impl Plan {
    /// Whether the plan contains no work.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty() && self.nodes.is_empty()
    }

    /// Total entries across both categories.
    pub fn len(&self) -> usize {
        self.models.len() + self.nodes.len()
    }

    /// Total duplicates dropped across all sources.
    pub fn duplicate_count(&self) -> usize {
        self.sources.iter().map(SourceSummary::duplicates).sum()
    }

    /// Model duplicates dropped across all sources.
    pub fn model_duplicate_count(&self) -> usize {
        self.sources.iter().map(|s| s.model_duplicates).sum()
    }

    /// Node duplicates dropped across all sources.
    pub fn node_duplicate_count(&self) -> usize {
        self.sources.iter().map(|s| s.node_duplicates).sum()
    }

    /// Entries rejected while parsing, across all sources.
    pub fn rejected_count(&self) -> usize {
        self.sources.iter().map(|s| s.rejected.len()).sum()
    }

    /// Sources that could not be loaded.
    pub fn failed_sources(&self) -> impl Iterator<Item = &SourceSummary> {
        self.sources.iter().filter(|s| !s.loaded())
    }

    /// The source that supplied the model at `index`.
    pub fn model_source(&self, index: usize) -> Option<&ManifestSource> {
        self.model_sources
            .get(index)
            .and_then(|&s| self.sources.get(s))
            .map(|summary| &summary.source)
    }

    /// The source that supplied the node at `index`.
    pub fn node_source(&self, index: usize) -> Option<&ManifestSource> {
        self.node_sources
            .get(index)
            .and_then(|&s| self.sources.get(s))
            .map(|summary| &summary.source)
    }

    /// Narrow the plan according to a filter configuration.
    pub fn filter(&self, config: &FilterConfig) -> Plan {
        filter::apply(self, config)
    }
}
