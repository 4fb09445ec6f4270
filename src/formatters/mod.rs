//! Formatters turn one source document into a base unit: a base text and
//! the annotation layers anchored on it.

pub mod cursor;
pub mod editor;
pub mod error;
pub mod google_vision;
pub mod language;

pub use cursor::{BaseTextWriter, OffsetCursor};
pub use editor::{EditorParser, MarkupTag, MissingIdPolicy, PARAGRAPH_BREAK};
pub use error::FormatError;
pub use google_vision::{GoogleVisionFormatter, OcrResponse, PageExtraction};
pub use language::normalize_language;

use uuid::Uuid;

use crate::models::{BaseUnit, LayerKind};

/// Result of formatting one document.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub unit: BaseUnit,
    /// Node-local problems that were skipped.
    pub diagnostics: Vec<FormatError>,
}

/// Stable id for an annotation that has none in its source.
///
/// Derived from the unit, the layer and the annotation's ordinal so that
/// formatting the same input twice yields the same ids.
pub(crate) fn derived_annotation_id(unit_name: &str, kind: LayerKind, ordinal: usize) -> String {
    let key = format!("{}/{}/{}", unit_name, kind, ordinal);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes())
        .simple()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_ids_are_stable_and_distinct() {
        let a = derived_annotation_id("v1", LayerKind::BoundingBox, 0);
        assert_eq!(a, derived_annotation_id("v1", LayerKind::BoundingBox, 0));
        assert_eq!(a.len(), 32);
        assert_ne!(a, derived_annotation_id("v1", LayerKind::BoundingBox, 1));
        assert_ne!(a, derived_annotation_id("v1", LayerKind::Language, 0));
        assert_ne!(a, derived_annotation_id("v2", LayerKind::BoundingBox, 0));
    }
}
