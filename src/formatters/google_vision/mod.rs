//! Formatter for Google Vision OCR output of scanned pechas.
//!
//! One response covers one page image. Words are visited in reading order
//! (block, paragraph, word); every word with a usable bounding polygon adds
//! its text to the page base and a `BoundingBox` annotation over it.

mod response;

pub use response::{
    Block, BoundingPoly, BreakType, DetectedBreak, DetectedLanguage, EntityAnnotation,
    FullTextAnnotation, OcrResponse, Page, Paragraph, Symbol, TextProperty, Vertex, Word,
};

use tracing::{error, trace, warn};

use super::cursor::BaseTextWriter;
use super::error::FormatError;
use super::language::normalize_language;
use super::derived_annotation_id;
use crate::models::{
    layer_mut, Annotation, AnnotationAttributes, BBox, BaseUnit, Layer, LayerKind, LayerSet, Span,
};

/// Words below this confidence go into the OCR confidence layer.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.9;

/// Output of one non-empty page.
#[derive(Debug, Clone)]
pub struct PageExtraction {
    pub unit: BaseUnit,
    /// Word-local failures that were skipped.
    pub diagnostics: Vec<FormatError>,
    /// Confidence of every emitted word that reported one, in reading order.
    pub word_confidences: Vec<f32>,
}

impl PageExtraction {
    /// Words that made it into the base text.
    pub fn word_count(&self) -> usize {
        self.unit
            .layers
            .get(&LayerKind::BoundingBox)
            .map(|l| l.len())
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct GoogleVisionFormatter {
    default_language: String,
    confidence_threshold: f32,
}

impl GoogleVisionFormatter {
    pub fn new(default_language: impl Into<String>) -> Self {
        Self {
            default_language: default_language.into(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }

    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Decode a raw JSON payload into the response records.
    pub fn parse_response(value: serde_json::Value) -> Result<OcrResponse, FormatError> {
        serde_json::from_value(value).map_err(|e| FormatError::MalformedInput(e.to_string()))
    }

    /// Normalized language of a word, from its first detected language.
    pub fn language_code(&self, property: Option<&TextProperty>) -> String {
        let code = property.and_then(|p| p.first_language()).unwrap_or("");
        normalize_language(code, &self.default_language)
    }

    /// Concatenate a word's symbols, adding a space after each symbol that
    /// carries a `SPACE` break.
    pub fn word_text(word: &Word) -> String {
        let mut text = String::new();
        for symbol in &word.symbols {
            text.push_str(&symbol.text);
            if symbol.has_space_attached() {
                text.push(' ');
            }
        }
        text
    }

    /// Reduce a word's polygon to a box.
    ///
    /// The polygon must have exactly four vertices with `x`/`y` on vertex 0,
    /// `x` on vertex 1 and `y` on vertex 2. Left and right come from the top
    /// edge (vertices 0 and 1), top and bottom from vertices 0 and 2.
    pub fn word_bbox(&self, word: &Word, word_index: usize) -> Result<BBox, FormatError> {
        let invalid = |reason: &str| FormatError::InvalidGeometry {
            word: word_index,
            reason: reason.to_string(),
        };

        let vertices = &word
            .bounding_box
            .as_ref()
            .ok_or_else(|| invalid("no bounding polygon"))?
            .vertices;
        if vertices.len() != 4 {
            return Err(invalid(&format!("{} vertices, expected 4", vertices.len())));
        }

        let (Some(left), Some(top), Some(right), Some(bottom)) =
            (vertices[0].x, vertices[0].y, vertices[1].x, vertices[2].y)
        else {
            return Err(invalid("corner vertex is missing a coordinate"));
        };

        Ok(BBox {
            left,
            right,
            top,
            bottom,
            text: Self::word_text(word),
            confidence: word.confidence,
            language: self.language_code(word.property.as_ref()),
        })
    }

    /// Boxes for every word of the response in reading order; malformed
    /// words yield their geometry error in place.
    pub fn char_base_bboxes(&self, response: &OcrResponse) -> Vec<Result<BBox, FormatError>> {
        let Some(full_text) = response.full_text_annotation.as_ref() else {
            return Vec::new();
        };
        full_text
            .pages
            .iter()
            .flat_map(|page| &page.blocks)
            .flat_map(|block| &block.paragraphs)
            .flat_map(|paragraph| &paragraph.words)
            .enumerate()
            .map(|(index, word)| self.word_bbox(word, index))
            .collect()
    }

    /// Decode and format one page payload.
    ///
    /// `Ok(None)` means the page is empty (no page text or no word tree);
    /// that is logged, not raised. A payload that does not decode is
    /// `MalformedInput`.
    pub fn format_page_value(
        &self,
        base_name: &str,
        value: serde_json::Value,
    ) -> Result<Option<PageExtraction>, FormatError> {
        let response = Self::parse_response(value)?;
        Ok(self.format_page(base_name, &response))
    }

    /// Build the base text and layers of one page.
    pub fn format_page(&self, base_name: &str, response: &OcrResponse) -> Option<PageExtraction> {
        if response.page_description().is_none() {
            error!(
                "OCR page {} is empty (no textAnnotations[0]/description)",
                base_name
            );
            return None;
        }
        if response.full_text_annotation.is_none() {
            let err = FormatError::MissingField {
                field: "fullTextAnnotation",
                context: base_name.to_string(),
            };
            error!("OCR page {} has no word tree: {}", base_name, err);
            return None;
        }

        let mut pass = PagePass::new(self, base_name);
        for bbox in self.char_base_bboxes(response) {
            match bbox {
                Ok(bbox) => pass.push_word(bbox),
                Err(err) => {
                    warn!("Skipping word on page {}: {}", base_name, err);
                    pass.diagnostics.push(err);
                }
            }
        }
        Some(pass.finish())
    }
}

/// Mutable state of one page: text and cursor, layers, the open language run.
struct PagePass<'a> {
    formatter: &'a GoogleVisionFormatter,
    base_name: &'a str,
    writer: BaseTextWriter,
    layers: LayerSet,
    diagnostics: Vec<FormatError>,
    word_confidences: Vec<f32>,
    words: usize,
    language_run: Option<(String, Span)>,
    language_runs: usize,
}

impl<'a> PagePass<'a> {
    fn new(formatter: &'a GoogleVisionFormatter, base_name: &'a str) -> Self {
        Self {
            formatter,
            base_name,
            writer: BaseTextWriter::new(),
            layers: LayerSet::new(),
            diagnostics: Vec::new(),
            word_confidences: Vec::new(),
            words: 0,
            language_run: None,
            language_runs: 0,
        }
    }

    fn push_word(&mut self, bbox: BBox) {
        let ordinal = self.words;
        self.words += 1;
        trace!(
            "{} word {}: {} chars, {}x{} box at ({}, {})",
            self.base_name,
            ordinal,
            bbox.char_len(),
            bbox.width(),
            bbox.height(),
            bbox.left,
            bbox.top
        );

        let span = self.writer.push_span(&bbox.text);
        layer_mut(&mut self.layers, LayerKind::BoundingBox).insert(Annotation::new(
            derived_annotation_id(self.base_name, LayerKind::BoundingBox, ordinal),
            span,
            bbox.to_attributes(),
        ));

        if let Some(confidence) = bbox.confidence {
            self.word_confidences.push(confidence);
            let threshold = self.formatter.confidence_threshold;
            if confidence < threshold {
                self.layers
                    .entry(LayerKind::OcrConfidence)
                    .or_insert_with(|| {
                        Layer::new(LayerKind::OcrConfidence).with_confidence_threshold(threshold)
                    })
                    .insert(Annotation::new(
                        derived_annotation_id(self.base_name, LayerKind::OcrConfidence, ordinal),
                        span,
                        AnnotationAttributes::OcrConfidence { confidence },
                    ));
            }
        }

        self.track_language(bbox.language, span);
    }

    fn track_language(&mut self, language: String, span: Span) {
        if language == self.formatter.default_language {
            self.close_language_run();
            return;
        }
        match self.language_run.as_mut() {
            Some((current, run)) if *current == language => *run = run.cover(span),
            _ => {
                self.close_language_run();
                self.language_run = Some((language, span));
            }
        }
    }

    fn close_language_run(&mut self) {
        let Some((language, span)) = self.language_run.take() else {
            return;
        };
        let ordinal = self.language_runs;
        self.language_runs += 1;
        layer_mut(&mut self.layers, LayerKind::Language).insert(Annotation::new(
            derived_annotation_id(self.base_name, LayerKind::Language, ordinal),
            span,
            AnnotationAttributes::Language { language },
        ));
    }

    fn finish(mut self) -> PageExtraction {
        self.close_language_run();
        PageExtraction {
            unit: BaseUnit {
                base_name: self.base_name.to_string(),
                base_text: self.writer.finish(),
                layers: self.layers,
            },
            diagnostics: self.diagnostics,
            word_confidences: self.word_confidences,
        }
    }
}
