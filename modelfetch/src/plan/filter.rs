//! Plan narrowing by model type and category.

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::warn;

use super::Plan;
use crate::manifest::{KNOWN_MODEL_TYPES, UNKNOWN_TYPE};

/// Errors in the filter configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FilterError {
    /// `models_only` and `nodes_only` were both requested.
    #[error("--models-only and --nodes-only cannot be used together")]
    ConflictingFilters,
}

/// Validated filter configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterConfig {
    types_allowed: BTreeSet<String>,
    models_only: bool,
    nodes_only: bool,
}

impl FilterConfig {
    /// Build a filter configuration.
    ///
    /// An absent or empty type set disables type filtering. Types outside the
    /// conventional set are accepted but logged, since they only ever match
    /// manifests that declare them verbatim.
    ///
    /// # Errors
    ///
    /// Returns `ConflictingFilters` when both category flags are set.
    pub fn new(
        types_allowed: Option<BTreeSet<String>>,
        models_only: bool,
        nodes_only: bool,
    ) -> Result<Self, FilterError> {
        if models_only && nodes_only {
            return Err(FilterError::ConflictingFilters);
        }

        let types_allowed = types_allowed.unwrap_or_default();
        for model_type in types_allowed.iter().filter(|t| !is_conventional(t)) {
            warn!(model_type = %model_type, "Filtering on an unconventional model type");
        }

        Ok(Self {
            types_allowed,
            models_only,
            nodes_only,
        })
    }

    /// Types that survive filtering; empty means all.
    pub fn types_allowed(&self) -> &BTreeSet<String> {
        &self.types_allowed
    }

    /// Whether model entries are kept.
    pub fn includes_models(&self) -> bool {
        !self.nodes_only
    }

    /// Whether node entries are kept.
    pub fn includes_nodes(&self) -> bool {
        !self.models_only
    }

    fn allows_type(&self, model_type: &str) -> bool {
        self.types_allowed.is_empty() || self.types_allowed.contains(model_type)
    }
}

fn is_conventional(model_type: &str) -> bool {
    model_type == UNKNOWN_TYPE || KNOWN_MODEL_TYPES.contains(&model_type)
}

/// Apply `config` to `plan`, returning the narrowed plan.
///
/// Provenance is narrowed in lock-step with the entries; per-source summaries
/// are carried over unchanged since they describe the merge, not the filter.
pub fn apply(plan: &Plan, config: &FilterConfig) -> Plan {
    let (models, model_sources) = if config.includes_models() {
        plan.models
            .iter()
            .zip(&plan.model_sources)
            .filter(|(entry, _)| config.allows_type(&entry.model_type))
            .map(|(entry, &source)| (entry.clone(), source))
            .unzip()
    } else {
        (Vec::new(), Vec::new())
    };

    let (nodes, node_sources) = if config.includes_nodes() {
        (plan.nodes.clone(), plan.node_sources.clone())
    } else {
        (Vec::new(), Vec::new())
    };

    Plan {
        models,
        nodes,
        model_sources,
        node_sources,
        sources: plan.sources.clone(),
    }
}
