//! Spans and annotations over a base text.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Half-open character range `[start, end)` into one base text.
///
/// Offsets count Unicode scalar values, not bytes. Spans are minted by
/// [`OffsetCursor::emit_span`](crate::formatters::OffsetCursor::emit_span);
/// there is no public constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    start: usize,
    end: usize,
}

impl Span {
    pub(crate) fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start {} past end {}", start, end);
        Self { start, end }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Move the span right by `offset` characters (used when merging units).
    pub(crate) fn shifted(self, offset: usize) -> Self {
        Self::new(self.start + offset, self.end + offset)
    }

    /// Smallest span covering both `self` and `other`.
    pub(crate) fn cover(self, other: Span) -> Self {
        Self::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.start, self.end)
    }
}

/// Kind-specific payload of an annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnnotationAttributes {
    /// Axis-aligned word box from OCR.
    BoundingBox {
        left: i64,
        right: i64,
        top: i64,
        bottom: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        confidence: Option<f32>,
        language: String,
    },
    /// Run of text in a language other than the document default.
    Language { language: String },
    /// Word recognized below the layer's confidence threshold.
    OcrConfidence { confidence: f32 },
    /// One scanned page of a volume.
    Page { imgnum: usize, reference: String },
    /// Semantic tag from editor markup, with any extra source attributes.
    Markup {
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        metadata: BTreeMap<String, String>,
    },
}

/// A span plus its attributes, keyed by an ID unique within its layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: String,
    pub span: Span,
    #[serde(flatten)]
    pub attributes: AnnotationAttributes,
}

impl Annotation {
    pub fn new(id: impl Into<String>, span: Span, attributes: AnnotationAttributes) -> Self {
        Self {
            id: id.into(),
            span,
            attributes,
        }
    }

    pub(crate) fn shifted(mut self, offset: usize) -> Self {
        self.span = self.span.shifted(offset);
        self
    }
}
