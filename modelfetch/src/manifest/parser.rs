//! Manifest document parsing.
//!
//! A manifest is a JSON object of the form
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "description": "SDXL starter set",
//!   "models": [{ "name": "...", "type": "checkpoint", "url": "https://...", "sha256": "..." }],
//!   "custom_nodes": [{ "name": "...", "repo": "https://github.com/..." }]
//! }
//! ```
//!
//! Failures are scoped as narrowly as possible: a document that is not a JSON
//! object is rejected whole, but a single bad entry only rejects that entry.

use serde_json::{Map, Value};
use tracing::debug;

use super::entry::{resolve_model, resolve_node, ModelEntry, NodeEntry};
use super::error::{ManifestError, ManifestResult};

/// Entries parsed from a single manifest, not yet deduplicated.
#[derive(Debug, Clone, Default)]
pub struct ManifestFragment {
    /// Declared manifest version.
    pub version: Option<String>,
    /// Declared manifest description.
    pub description: Option<String>,
    /// Successfully resolved model entries, in document order.
    pub models: Vec<ModelEntry>,
    /// Successfully resolved node entries, in document order.
    pub nodes: Vec<NodeEntry>,
    /// Entries that were rejected, with the reason.
    pub rejected: Vec<ManifestError>,
}

/// Parse raw manifest text.
///
/// # Errors
///
/// Returns `MalformedManifest` when the text is not JSON, the root is not an
/// object, or `models` / `custom_nodes` is present but not an array.
/// Per-entry problems are collected in [`ManifestFragment::rejected`].
pub fn parse_manifest(text: &str) -> ManifestResult<ManifestFragment> {
    let root: Value = serde_json::from_str(text).map_err(|e| ManifestError::malformed("$", e))?;
    let Value::Object(root) = root else {
        return Err(ManifestError::malformed("$", "expected a JSON object"));
    };

    let mut fragment = ManifestFragment {
        version: top_level_string(&root, "version")?,
        description: top_level_string(&root, "description")?,
        ..Default::default()
    };

    for (index, value) in entry_array(&root, "models")?.iter().enumerate() {
        match resolve_model(&format!("models[{index}]"), value) {
            Ok(entry) => fragment.models.push(entry),
            Err(err) => {
                debug!(error = %err, "Rejected model entry");
                fragment.rejected.push(err);
            }
        }
    }

    for (index, value) in entry_array(&root, "custom_nodes")?.iter().enumerate() {
        match resolve_node(&format!("custom_nodes[{index}]"), value) {
            Ok(entry) => fragment.nodes.push(entry),
            Err(err) => {
                debug!(error = %err, "Rejected custom node entry");
                fragment.rejected.push(err);
            }
        }
    }

    Ok(fragment)
}

fn top_level_string(root: &Map<String, Value>, key: &str) -> ManifestResult<Option<String>> {
    match root.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        // Numeric versions ("version": 2) are common enough to accept.
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(ManifestError::malformed(key, "expected a string")),
    }
}

fn entry_array<'a>(root: &'a Map<String, Value>, key: &str) -> ManifestResult<&'a [Value]> {
    match root.get(key) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(_) => Err(ManifestError::malformed(key, "expected an array")),
    }
}
