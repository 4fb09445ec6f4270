//! Annotation layers and the closed set of layer kinds.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::annotation::Annotation;

/// Revision assigned to freshly produced layers.
pub const DEFAULT_REVISION: &str = "00001";

/// Every layer kind a pecha can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LayerKind {
    BookTitle,
    Author,
    Chapter,
    Citation,
    /// Root text ("tsawa") passages.
    Tsawa,
    /// Structural outline ("sabche") headings.
    Sabche,
    BoundingBox,
    Language,
    #[serde(rename = "OCRConfidence")]
    OcrConfidence,
    Pagination,
}

impl LayerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BookTitle => "BookTitle",
            Self::Author => "Author",
            Self::Chapter => "Chapter",
            Self::Citation => "Citation",
            Self::Tsawa => "Tsawa",
            Self::Sabche => "Sabche",
            Self::BoundingBox => "BoundingBox",
            Self::Language => "Language",
            Self::OcrConfidence => "OCRConfidence",
            Self::Pagination => "Pagination",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "BookTitle" => Some(Self::BookTitle),
            "Author" => Some(Self::Author),
            "Chapter" => Some(Self::Chapter),
            "Citation" => Some(Self::Citation),
            "Tsawa" => Some(Self::Tsawa),
            "Sabche" => Some(Self::Sabche),
            "BoundingBox" => Some(Self::BoundingBox),
            "Language" => Some(Self::Language),
            "OCRConfidence" => Some(Self::OcrConfidence),
            "Pagination" => Some(Self::Pagination),
            _ => None,
        }
    }
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Annotations of one kind over one base text, in insertion order.
///
/// An id index sits beside the ordered list so inserts and lookups stay
/// constant time on volume-sized layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "LayerRecord", into = "LayerRecord")]
pub struct Layer {
    annotation_type: LayerKind,
    revision: String,
    confidence_threshold: Option<f32>,
    annotations: Vec<Annotation>,
    index: HashMap<String, usize>,
}

/// On-disk shape of a layer.
#[derive(Serialize, Deserialize)]
struct LayerRecord {
    annotation_type: LayerKind,
    revision: String,
    /// Threshold below which words land in an OCR confidence layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    confidence_threshold: Option<f32>,
    #[serde(default)]
    annotations: Vec<Annotation>,
}

impl From<LayerRecord> for Layer {
    fn from(record: LayerRecord) -> Self {
        let mut layer = Layer {
            annotation_type: record.annotation_type,
            revision: record.revision,
            confidence_threshold: record.confidence_threshold,
            annotations: Vec::with_capacity(record.annotations.len()),
            index: HashMap::with_capacity(record.annotations.len()),
        };
        for annotation in record.annotations {
            layer.insert(annotation);
        }
        layer
    }
}

impl From<Layer> for LayerRecord {
    fn from(layer: Layer) -> Self {
        LayerRecord {
            annotation_type: layer.annotation_type,
            revision: layer.revision,
            confidence_threshold: layer.confidence_threshold,
            annotations: layer.annotations,
        }
    }
}

impl Layer {
    pub fn new(annotation_type: LayerKind) -> Self {
        Self {
            annotation_type,
            revision: DEFAULT_REVISION.to_string(),
            confidence_threshold: None,
            annotations: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = Some(threshold);
        self
    }

    pub fn kind(&self) -> LayerKind {
        self.annotation_type
    }

    pub fn revision(&self) -> &str {
        &self.revision
    }

    pub fn confidence_threshold(&self) -> Option<f32> {
        self.confidence_threshold
    }

    /// Insert an annotation.
    ///
    /// An annotation whose ID is already present replaces the old one in
    /// place; the replaced annotation is returned.
    pub fn insert(&mut self, annotation: Annotation) -> Option<Annotation> {
        if let Some(&position) = self.index.get(&annotation.id) {
            return Some(std::mem::replace(&mut self.annotations[position], annotation));
        }
        self.index
            .insert(annotation.id.clone(), self.annotations.len());
        self.annotations.push(annotation);
        None
    }

    pub fn get(&self, id: &str) -> Option<&Annotation> {
        self.index.get(id).map(|&position| &self.annotations[position])
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub(crate) fn into_annotations(self) -> Vec<Annotation> {
        self.annotations
    }
}

/// Layers of one base text, keyed (and serialized) in kind order.
pub type LayerSet = BTreeMap<LayerKind, Layer>;

/// Fetch the layer of `kind`, creating an empty one on first use.
pub(crate) fn layer_mut(layers: &mut LayerSet, kind: LayerKind) -> &mut Layer {
    layers.entry(kind).or_insert_with(|| Layer::new(kind))
}
