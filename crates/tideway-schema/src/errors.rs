//! Validation error types.

use thiserror::Error;

/// Errors raised while binding raw request data against a schema.
///
/// Binding is fail-fast: the first failing field in declaration order is
/// the one reported. Paths are dotted (`profile.age`) with array indexes
/// in brackets (`tags[2]`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field was absent from every raw source.
    #[error("missing required field '{path}'")]
    MissingField {
        /// Full dotted path of the absent field.
        path: String,
    },

    /// A field was present but could not be converted to its declared kind.
    #[error("field '{path}' expected {expected}, got '{found}'")]
    TypeMismatch {
        /// Full dotted path of the offending field.
        path: String,
        /// The declared kind name (`integer`, `object`, ...).
        expected: &'static str,
        /// Display form of the offending raw value.
        found: String,
    },
}

impl ValidationError {
    /// The dotted path of the field that failed.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::MissingField { path } | Self::TypeMismatch { path, .. } => path,
        }
    }
}
