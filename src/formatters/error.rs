//! Errors raised while turning a source document into a base unit.

use thiserror::Error;

/// Extraction failures.
///
/// `MalformedInput` stops the unit. The other variants are local to one
/// node or word: the formatter logs them, records them as diagnostics and
/// keeps going.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormatError {
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("<{element}> node {index} has no `{attribute}` attribute")]
    MissingAttribute {
        element: String,
        index: usize,
        attribute: &'static str,
    },

    #[error("missing field `{field}` in {context}")]
    MissingField { field: &'static str, context: String },

    #[error("invalid geometry for word {word}: {reason}")]
    InvalidGeometry { word: usize, reason: String },
}

impl FormatError {
    /// Whether the error stops extraction of the whole unit.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FormatError::MalformedInput(_))
    }
}
