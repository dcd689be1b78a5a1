//! Error types for manifest loading and parsing.

use thiserror::Error;

/// Result type for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;

/// Errors that can occur while resolving, parsing or merging manifests.
///
/// None of these abort a run: a rejected entry or an unreachable source is
/// recorded and the remaining entries and sources still load.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ManifestError {
    /// The document or one of its entries does not have the expected shape.
    #[error("malformed manifest at `{field}`: {reason}")]
    MalformedManifest { field: String, reason: String },

    /// An entry lacks a mandatory field.
    #[error("missing required field `{field}`")]
    MissingRequiredField { field: String },

    /// The manifest source could not be read or fetched.
    #[error("manifest {source_ref} is unreachable: {reason}")]
    ManifestUnreachable { source_ref: String, reason: String },
}

impl ManifestError {
    pub(crate) fn malformed(field: impl Into<String>, reason: impl ToString) -> Self {
        Self::MalformedManifest {
            field: field.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn missing(field: impl Into<String>) -> Self {
        Self::MissingRequiredField {
            field: field.into(),
        }
    }

    pub(crate) fn unreachable(source_ref: impl Into<String>, reason: impl ToString) -> Self {
        Self::ManifestUnreachable {
            source_ref: source_ref.into(),
            reason: reason.to_string(),
        }
    }

    /// The field path this error refers to, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MalformedManifest { field, .. } | Self::MissingRequiredField { field } => {
                Some(field)
            }
            Self::ManifestUnreachable { .. } => None,
        }
    }
}
