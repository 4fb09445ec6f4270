//! One finished document unit: a base text and the layers built over it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::annotation::Span;
use super::layer::{LayerKind, LayerSet};

/// A span that breaks the unit's offset invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpanViolation {
    #[error("{layer} annotation {id} span {span} exceeds base length {base_len}")]
    OutOfBounds {
        layer: LayerKind,
        id: String,
        span: Span,
        base_len: usize,
    },

    #[error("{layer} annotation {id} starts at {start}, before previous start {previous}")]
    OutOfOrder {
        layer: LayerKind,
        id: String,
        start: usize,
        previous: usize,
    },
}

/// Base text of a page, volume or HTML document plus its layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseUnit {
    pub base_name: String,
    pub base_text: String,
    pub layers: LayerSet,
}

impl BaseUnit {
    /// Length of the base text in characters.
    pub fn char_len(&self) -> usize {
        self.base_text.chars().count()
    }

    /// The slice of the base text a span denotes.
    pub fn text_at(&self, span: Span) -> String {
        self.base_text
            .chars()
            .skip(span.start())
            .take(span.len())
            .collect()
    }

    /// Check that every span is inside the base text and that each layer is
    /// in non-decreasing start order.
    pub fn check_spans(&self) -> Result<(), SpanViolation> {
        let base_len = self.char_len();
        for (kind, layer) in &self.layers {
            let mut previous = 0;
            for ann in layer.annotations() {
                if ann.span.end() > base_len {
                    return Err(SpanViolation::OutOfBounds {
                        layer: *kind,
                        id: ann.id.clone(),
                        span: ann.span,
                        base_len,
                    });
                }
                if ann.span.start() < previous {
                    return Err(SpanViolation::OutOfOrder {
                        layer: *kind,
                        id: ann.id.clone(),
                        start: ann.span.start(),
                        previous,
                    });
                }
                previous = ann.span.start();
            }
        }
        Ok(())
    }
}
