//! Typed view of a Google Vision `AnnotateImageResponse`.
//!
//! Only the fields the formatter reads are modelled. Lists default to empty
//! and scalars to `None`, so a partially populated response still decodes;
//! whether the parts that matter are present is decided by the formatter.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrResponse {
    #[serde(default)]
    pub text_annotations: Vec<EntityAnnotation>,
    pub full_text_annotation: Option<FullTextAnnotation>,
}

impl OcrResponse {
    /// Text of the first whole-page annotation, if the engine produced one.
    pub fn page_description(&self) -> Option<&str> {
        self.text_annotations
            .first()
            .and_then(|a| a.description.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityAnnotation {
    pub locale: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullTextAnnotation {
    #[serde(default)]
    pub pages: Vec<Page>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub property: Option<TextProperty>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(default)]
    pub blocks: Vec<Block>,
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub property: Option<TextProperty>,
    pub bounding_box: Option<BoundingPoly>,
    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,
    pub block_type: Option<String>,
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paragraph {
    pub property: Option<TextProperty>,
    pub bounding_box: Option<BoundingPoly>,
    #[serde(default)]
    pub words: Vec<Word>,
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    pub property: Option<TextProperty>,
    pub bounding_box: Option<BoundingPoly>,
    #[serde(default)]
    pub symbols: Vec<Symbol>,
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Symbol {
    pub property: Option<TextProperty>,
    #[serde(default)]
    pub text: String,
    pub confidence: Option<f32>,
}

impl Symbol {
    /// Whether the engine detected a plain space right after this symbol.
    pub fn has_space_attached(&self) -> bool {
        self.property
            .as_ref()
            .and_then(|p| p.detected_break.as_ref())
            .is_some_and(|b| b.break_type == BreakType::Space)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextProperty {
    #[serde(default)]
    pub detected_languages: Vec<DetectedLanguage>,
    pub detected_break: Option<DetectedBreak>,
}

impl TextProperty {
    pub fn first_language(&self) -> Option<&str> {
        self.detected_languages
            .first()
            .map(|l| l.language_code.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedLanguage {
    #[serde(default)]
    pub language_code: String,
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedBreak {
    #[serde(rename = "type", default)]
    pub break_type: BreakType,
    pub is_prefix: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakType {
    Space,
    SureSpace,
    EolSureSpace,
    Hyphen,
    LineBreak,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingPoly {
    #[serde(default)]
    pub vertices: Vec<Vertex>,
}

/// Polygon corner. The engine omits coordinates it considers zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vertex {
    pub x: Option<i64>,
    pub y: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_break_types() {
        let symbol: Symbol = serde_json::from_value(serde_json::json!({
            "text": "a",
            "property": {"detectedBreak": {"type": "SPACE"}}
        }))
        .unwrap();
        assert!(symbol.has_space_attached());

        let symbol: Symbol = serde_json::from_value(serde_json::json!({
            "text": "a",
            "property": {"detectedBreak": {"type": "EOL_SURE_SPACE"}}
        }))
        .unwrap();
        assert!(!symbol.has_space_attached());

        let symbol: Symbol = serde_json::from_value(serde_json::json!({
            "text": "a",
            "property": {"detectedBreak": {"type": "SOMETHING_NEW"}}
        }))
        .unwrap();
        let brk = symbol.property.unwrap().detected_break.unwrap();
        assert_eq!(brk.break_type, BreakType::Unknown);
    }

    #[test]
    fn test_missing_lists_decode_empty() {
        let response: OcrResponse = serde_json::from_value(serde_json::json!({
            "fullTextAnnotation": {"pages": [{"blocks": [{}]}]}
        }))
        .unwrap();
        assert!(response.text_annotations.is_empty());
        assert_eq!(response.page_description(), None);
        let block = &response.full_text_annotation.unwrap().pages[0].blocks[0];
        assert!(block.paragraphs.is_empty());
    }

    #[test]
    fn test_vertex_missing_coordinate() {
        let poly: BoundingPoly =
            serde_json::from_value(serde_json::json!({"vertices": [{"x": 3}, {"y": 4}]})).unwrap();
        assert_eq!(poly.vertices[0], Vertex { x: Some(3), y: None });
        assert_eq!(poly.vertices[1], Vertex { x: None, y: Some(4) });
    }
}
