//! Typed manifest entries and their default resolution.
//!
//! Manifest entries arrive as loosely-typed JSON objects where almost every
//! key is optional. Each raw entry is resolved exactly once, at parse time,
//! into a fully-populated [`ModelEntry`] or [`NodeEntry`]; nothing downstream
//! ever has to re-derive a default.

use std::path::{Component, Path, PathBuf};

use reqwest::Url;
use serde_json::{Map, Value};

use super::error::{ManifestError, ManifestResult};

/// Sentinel type for models that do not declare one.
pub const UNKNOWN_TYPE: &str = "unknown";

/// Default parent directory for custom node repositories.
pub const DEFAULT_NODE_DIR: &str = "custom_nodes";

/// Model types that have a conventional destination directory.
pub const KNOWN_MODEL_TYPES: &[&str] = &[
    "checkpoint",
    "vae",
    "lora",
    "controlnet",
    "upscale",
    "embeddings",
    "clip",
];

/// Extension used when neither the manifest nor the URL yields a filename.
const FALLBACK_EXTENSION: &str = "safetensors";

/// Name used when an entry provides nothing to derive a name from.
const FALLBACK_NAME: &str = "Unknown";

/// Conventional destination directory for a model type.
///
/// Types outside [`KNOWN_MODEL_TYPES`] land next to the checkpoints.
pub fn default_model_dir(model_type: &str) -> &'static str {
    match model_type {
        "checkpoint" => "models/checkpoints",
        "vae" => "models/vae",
        "lora" => "models/loras",
        "controlnet" => "models/controlnet",
        "upscale" => "models/upscale_models",
        "embeddings" => "models/embeddings",
        "clip" => "models/clip",
        _ => "models/checkpoints",
    }
}

/// A downloadable model artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelEntry {
    /// Display name.
    pub name: String,
    /// Model category, e.g. `checkpoint` or `lora`.
    pub model_type: String,
    /// Absolute download URL.
    pub url: String,
    /// Directory relative to the destination root.
    pub destination_path: PathBuf,
    /// File name inside `destination_path`.
    pub filename: String,
    /// Expected SHA-256 digest (hex). `Some("")` is a real, unmatchable value.
    pub expected_hash: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
}

impl ModelEntry {
    /// Key used to detect duplicate models across manifests.
    pub fn identity_key(&self) -> String {
        self.url.to_lowercase()
    }

    /// Target file path relative to the destination root.
    pub fn relative_target(&self) -> PathBuf {
        self.destination_path.join(&self.filename)
    }
}

/// A git-hosted custom node repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEntry {
    /// Display name.
    pub name: String,
    /// Absolute repository URL.
    pub repo_url: String,
    /// Clone directory relative to the destination root.
    pub destination_path: PathBuf,
    /// Free-form description.
    pub description: Option<String>,
}

impl NodeEntry {
    /// Key used to detect duplicate nodes across manifests.
    pub fn identity_key(&self) -> String {
        self.repo_url.to_lowercase()
    }
}

/// Resolve a raw JSON model entry located at `field` (e.g. `models[3]`).
pub(crate) fn resolve_model(field: &str, value: &Value) -> ManifestResult<ModelEntry> {
    let object = as_object(field, value)?;

    let url = required_string(object, field, &["url"])?;
    let parsed = parse_absolute_url(&format!("{field}.url"), &url)?;

    let model_type = optional_string(object, field, &["type"])?
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNKNOWN_TYPE.to_string());

    let destination_path = match optional_string(object, field, &["path", "destination_path"])? {
        Some(path) => relative_path(&format!("{field}.path"), &path)?,
        None => PathBuf::from(default_model_dir(&model_type)),
    };

    let name = optional_string(object, field, &["name"])?.filter(|n| !n.trim().is_empty());

    let filename = match optional_string(object, field, &["filename"])? {
        Some(filename) if !filename.is_empty() => {
            single_component(&format!("{field}.filename"), &filename)?;
            filename
        }
        _ => filename_from_url(&parsed).unwrap_or_else(|| {
            let base = name.as_deref().unwrap_or(FALLBACK_NAME).replace(' ', "_");
            format!("{base}.{FALLBACK_EXTENSION}")
        }),
    };

    Ok(ModelEntry {
        name: name.unwrap_or_else(|| filename.clone()),
        model_type,
        url,
        destination_path,
        filename,
        expected_hash: optional_string(object, field, &["sha256", "expected_hash"])?,
        description: optional_string(object, field, &["description"])?,
    })
}

/// Resolve a raw JSON custom node entry located at `field` (e.g. `custom_nodes[0]`).
pub(crate) fn resolve_node(field: &str, value: &Value) -> ManifestResult<NodeEntry> {
    let object = as_object(field, value)?;

    let repo_url = required_string(object, field, &["repo", "repo_url"])?;
    let parsed = parse_absolute_url(&format!("{field}.repo"), &repo_url)?;

    let name = optional_string(object, field, &["name"])?
        .filter(|n| !n.trim().is_empty())
        .or_else(|| repo_name_from_url(&parsed))
        .unwrap_or_else(|| FALLBACK_NAME.to_string());

    let parent = match optional_string(object, field, &["path", "destination_path"])? {
        Some(path) => relative_path(&format!("{field}.path"), &path)?,
        None => PathBuf::from(DEFAULT_NODE_DIR),
    };

    let dir_name = name.replace([' ', '/'], "-");
    single_component(&format!("{field}.name"), &dir_name)?;

    Ok(NodeEntry {
        name,
        repo_url,
        destination_path: parent.join(dir_name),
        description: optional_string(object, field, &["description"])?,
    })
}

fn as_object<'a>(field: &str, value: &'a Value) -> ManifestResult<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| ManifestError::malformed(field, "expected a JSON object"))
}

/// Look up the first present key among `keys`, treating `null` as absent.
fn optional_string(
    object: &Map<String, Value>,
    field: &str,
    keys: &[&str],
) -> ManifestResult<Option<String>> {
    for key in keys {
        match object.get(*key) {
            None | Some(Value::Null) => continue,
            Some(Value::String(s)) => return Ok(Some(s.clone())),
            Some(other) => {
                return Err(ManifestError::malformed(
                    format!("{field}.{key}"),
                    format!("expected a string, found {}", json_kind(other)),
                ))
            }
        }
    }
    Ok(None)
}

fn required_string(
    object: &Map<String, Value>,
    field: &str,
    keys: &[&str],
) -> ManifestResult<String> {
    match optional_string(object, field, keys)? {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ManifestError::missing(format!("{field}.{}", keys[0]))),
    }
}

fn parse_absolute_url(field: &str, raw: &str) -> ManifestResult<Url> {
    let url = Url::parse(raw).map_err(|e| ManifestError::malformed(field, e))?;
    if url.cannot_be_a_base() {
        return Err(ManifestError::malformed(
            field,
            "expected a hierarchical URL such as https://host/path",
        ));
    }
    Ok(url)
}

/// Last non-empty path segment of the URL.
fn filename_from_url(url: &Url) -> Option<String> {
    url.path_segments()?
        .rev()
        .find(|segment| !segment.is_empty())
        .filter(|segment| *segment != "." && *segment != "..")
        .map(str::to_string)
}

fn repo_name_from_url(url: &Url) -> Option<String> {
    filename_from_url(url).map(|segment| {
        segment
            .strip_suffix(".git")
            .map(str::to_string)
            .unwrap_or(segment)
    })
}

/// A relative path that cannot escape the destination root.
fn relative_path(field: &str, raw: &str) -> ManifestResult<PathBuf> {
    if raw.trim().is_empty() {
        return Err(ManifestError::malformed(field, "path must not be empty"));
    }

    let path = Path::new(raw);
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => {
                return Err(ManifestError::malformed(
                    field,
                    "path must be relative and stay inside the destination root",
                ))
            }
        }
    }
    Ok(path.to_path_buf())
}

fn single_component(field: &str, raw: &str) -> ManifestResult<()> {
    let mut components = Path::new(raw).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(ManifestError::malformed(
            field,
            format!("`{raw}` is not a plain file or directory name"),
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
