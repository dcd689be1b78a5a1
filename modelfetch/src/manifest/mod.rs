//! Manifest loading: sources, parsing, default resolution and merging.
//!
//! The flow is `ManifestSource` → raw text ([`ManifestResolver`]) →
//! [`ManifestFragment`] ([`parse_manifest`]) → [`Plan`](crate::plan::Plan)
//! ([`ManifestMerger`]).

mod entry;
mod error;
mod merge;
mod parser;
mod source;

pub use entry::{
    default_model_dir, ModelEntry, NodeEntry, DEFAULT_NODE_DIR, KNOWN_MODEL_TYPES, UNKNOWN_TYPE,
};
pub use error::{ManifestError, ManifestResult};
pub use merge::ManifestMerger;
pub use parser::{parse_manifest, ManifestFragment};
pub use source::{ManifestFetcher, ManifestResolver, ManifestSource, DEFAULT_MANIFEST_TIMEOUT};
