//! Word-level bounding boxes recovered from OCR.

use serde::{Deserialize, Serialize};

use super::annotation::AnnotationAttributes;

/// Axis-aligned box around one recognized word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub left: i64,
    pub right: i64,
    pub top: i64,
    pub bottom: i64,
    /// Reconstructed word text, including a trailing break space if any.
    pub text: String,
    pub confidence: Option<f32>,
    /// Normalized language code.
    pub language: String,
}

impl BBox {
    pub fn width(&self) -> i64 {
        (self.right - self.left).max(0)
    }

    pub fn height(&self) -> i64 {
        (self.bottom - self.top).max(0)
    }

    /// Number of characters this word contributes to the base text.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn to_attributes(&self) -> AnnotationAttributes {
        AnnotationAttributes::BoundingBox {
            left: self.left,
            right: self.right,
            top: self.top,
            bottom: self.bottom,
            confidence: self.confidence,
            language: self.language.clone(),
        }
    }
}
