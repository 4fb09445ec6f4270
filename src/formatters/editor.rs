//! Parser for the semantically tagged HTML produced by the pecha editor.
//!
//! Each `<p>` becomes one line of the base text. Inside a paragraph, text
//! nodes are copied literally and child elements carrying one of the known
//! tag classes become annotations in the matching layer.

use std::collections::BTreeMap;

use scraper::{node::Node, ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::cursor::BaseTextWriter;
use super::error::FormatError;
use super::{derived_annotation_id, Extraction};
use crate::models::{layer_mut, Annotation, AnnotationAttributes, BaseUnit, LayerKind, LayerSet};

/// Character appended to the base text after every paragraph.
pub const PARAGRAPH_BREAK: &str = "\n";

/// Tag classes the editor emits, in classification priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupTag {
    BookTitle,
    Author,
    Chapter,
    Citation,
    RootText,
    Sabche,
}

impl MarkupTag {
    /// Checked first to last; the first class an element carries wins.
    pub const PRIORITY: [MarkupTag; 6] = [
        MarkupTag::BookTitle,
        MarkupTag::Author,
        MarkupTag::Chapter,
        MarkupTag::Citation,
        MarkupTag::RootText,
        MarkupTag::Sabche,
    ];

    pub fn class_name(&self) -> &'static str {
        match self {
            Self::BookTitle => "book-title",
            Self::Author => "author",
            Self::Chapter => "chapter",
            Self::Citation => "citation",
            Self::RootText => "root-text",
            Self::Sabche => "sabche",
        }
    }

    pub fn layer_kind(&self) -> LayerKind {
        match self {
            Self::BookTitle => LayerKind::BookTitle,
            Self::Author => LayerKind::Author,
            Self::Chapter => LayerKind::Chapter,
            Self::Citation => LayerKind::Citation,
            Self::RootText => LayerKind::Tsawa,
            Self::Sabche => LayerKind::Sabche,
        }
    }

    /// Pick the tag for an element's class list, if any class is known.
    pub fn classify<'a>(classes: impl IntoIterator<Item = &'a str>) -> Option<Self> {
        let classes: Vec<&str> = classes.into_iter().collect();
        Self::PRIORITY
            .into_iter()
            .find(|tag| classes.contains(&tag.class_name()))
    }
}

/// What to do with a tagged element that has no `id` attribute.
///
/// Either way the element is reported as a `MissingAttribute` diagnostic and
/// later offsets are unaffected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingIdPolicy {
    /// Annotate it under an ID derived from the base name and tag position.
    #[default]
    Derive,
    /// Treat its text as literal and emit no annotation.
    Skip,
}

/// Builds one base unit from one editor HTML document.
///
/// Per-document state lives in a pass created per call, so a parser can be
/// reused and shared between threads.
#[derive(Debug, Default, Clone)]
pub struct EditorParser {
    missing_id: MissingIdPolicy,
}

impl EditorParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_missing_id_policy(mut self, policy: MissingIdPolicy) -> Self {
        self.missing_id = policy;
        self
    }

    /// Parse raw bytes, failing if they are not UTF-8.
    pub fn parse_bytes(&self, base_name: &str, html: &[u8]) -> Result<Extraction, FormatError> {
        let html = std::str::from_utf8(html)
            .map_err(|e| FormatError::MalformedInput(format!("markup is not UTF-8: {}", e)))?;
        self.parse(base_name, html)
    }

    pub fn parse(&self, base_name: &str, html: &str) -> Result<Extraction, FormatError> {
        let document = Html::parse_document(html);
        let paragraph_selector = Selector::parse("p")
            .map_err(|e| FormatError::MalformedInput(format!("paragraph selector: {}", e)))?;

        let mut pass = ParagraphPass::new(base_name, self.missing_id);
        let mut paragraphs = 0usize;
        for paragraph in document.select(&paragraph_selector) {
            pass.visit_paragraph(paragraph);
            paragraphs += 1;
        }

        if paragraphs == 0 {
            let stray: String = document.root_element().text().collect();
            if !stray.trim().is_empty() {
                return Err(FormatError::MalformedInput(
                    "document has text but no <p> paragraphs".to_string(),
                ));
            }
        }

        debug!(
            "Parsed editor document {}: {} paragraphs, {} characters",
            base_name,
            paragraphs,
            pass.writer.position()
        );

        Ok(pass.finish())
    }
}

/// State of one parse: the writer (text + cursor), the layers and the
/// diagnostics collected so far.
struct ParagraphPass<'a> {
    base_name: &'a str,
    missing_id: MissingIdPolicy,
    writer: BaseTextWriter,
    layers: LayerSet,
    diagnostics: Vec<FormatError>,
    tagged_nodes: usize,
}

impl<'a> ParagraphPass<'a> {
    fn new(base_name: &'a str, missing_id: MissingIdPolicy) -> Self {
        Self {
            base_name,
            missing_id,
            writer: BaseTextWriter::new(),
            layers: LayerSet::new(),
            diagnostics: Vec::new(),
            tagged_nodes: 0,
        }
    }

    fn visit_paragraph(&mut self, paragraph: ElementRef<'_>) {
        for child in paragraph.children() {
            match child.value() {
                Node::Text(text) => self.writer.push_literal(text),
                Node::Element(_) => {
                    if let Some(element) = ElementRef::wrap(child) {
                        self.visit_element(element);
                    }
                }
                _ => {}
            }
        }
        self.writer.push_literal(PARAGRAPH_BREAK);
    }

    fn visit_element(&mut self, element: ElementRef<'_>) {
        let text: String = element.text().collect();
        let Some(tag) = MarkupTag::classify(element.value().classes()) else {
            self.writer.push_literal(&text);
            return;
        };

        let index = self.tagged_nodes;
        self.tagged_nodes += 1;

        let id = match element.value().attr("id") {
            Some(id) => id.to_string(),
            None => {
                let err = FormatError::MissingAttribute {
                    element: element.value().name().to_string(),
                    index,
                    attribute: "id",
                };
                self.diagnostics.push(err.clone());
                match self.missing_id {
                    MissingIdPolicy::Skip => {
                        warn!("Skipping {} annotation: {}", tag.class_name(), err);
                        self.writer.push_literal(&text);
                        return;
                    }
                    MissingIdPolicy::Derive => {
                        warn!("Deriving id for {} annotation: {}", tag.class_name(), err);
                        derived_annotation_id(self.base_name, tag.layer_kind(), index)
                    }
                }
            }
        };

        let metadata: BTreeMap<String, String> = element
            .value()
            .attrs()
            .filter(|(name, _)| *name != "id" && *name != "class")
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();

        let span = self.writer.push_span(&text);
        let layer = layer_mut(&mut self.layers, tag.layer_kind());
        let replaced = layer.insert(Annotation::new(
            id.clone(),
            span,
            AnnotationAttributes::Markup { metadata },
        ));
        if replaced.is_some() {
            warn!(
                "Duplicate {} annotation id '{}'; keeping the later one",
                tag.class_name(),
                id
            );
        }
    }

    fn finish(self) -> Extraction {
        Extraction {
            unit: BaseUnit {
                base_name: self.base_name.to_string(),
                base_text: self.writer.finish(),
                layers: self.layers,
            },
            diagnostics: self.diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(extraction: &Extraction, kind: LayerKind) -> Vec<(String, usize, usize)> {
        extraction
            .unit
            .layers
            .get(&kind)
            .map(|layer| {
                layer
                    .annotations()
                    .iter()
                    .map(|a| (a.id.clone(), a.span.start(), a.span.end()))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn test_author_paragraph() {
        let html = r#"<p><span class="author" id="a1">Jamyang</span> wrote this</p>"#;
        let out = EditorParser::new().parse("vol1", html).unwrap();

        assert_eq!(out.unit.base_name, "vol1");
        assert_eq!(out.unit.base_text, "Jamyang wrote this\n");
        assert_eq!(spans(&out, LayerKind::Author), vec![("a1".to_string(), 0, 7)]);
        assert_eq!(out.unit.layers.len(), 1);
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_every_tag_class_lands_in_its_layer() {
        let html = r#"
            <p><span class="book-title" id="t">Title</span></p>
            <p><span class="author" id="a">Au</span><span class="chapter" id="c">Ch</span></p>
            <p>x<span class="citation" id="ci">Cit</span>y<span class="root-text" id="r">Root</span></p>
            <p><span class="sabche" id="s">Sab</span></p>
        "#;
        let out = EditorParser::new().parse("b", html).unwrap();

        assert_eq!(out.unit.base_text, "Title\nAuCh\nxCityRoot\nSab\n");
        assert_eq!(spans(&out, LayerKind::BookTitle), vec![("t".to_string(), 0, 5)]);
        assert_eq!(spans(&out, LayerKind::Author), vec![("a".to_string(), 6, 8)]);
        assert_eq!(spans(&out, LayerKind::Chapter), vec![("c".to_string(), 8, 10)]);
        assert_eq!(spans(&out, LayerKind::Citation), vec![("ci".to_string(), 12, 15)]);
        assert_eq!(spans(&out, LayerKind::Tsawa), vec![("r".to_string(), 16, 20)]);
        assert_eq!(spans(&out, LayerKind::Sabche), vec![("s".to_string(), 21, 24)]);
        out.unit.check_spans().unwrap();
    }

    #[test]
    fn test_annotated_text_matches_span() {
        let html = r#"<p>བཀྲ་<span class="citation" id="c1">ཤིས་བདེ་</span>ལེགས།</p>"#;
        let out = EditorParser::new().parse("b", html).unwrap();
        let ann = &out.unit.layers[&LayerKind::Citation].annotations()[0];

        assert_eq!(out.unit.text_at(ann.span), "ཤིས་བདེ་");
        assert_eq!(ann.span.len(), "ཤིས་བདེ་".chars().count());
    }

    #[test]
    fn test_priority_order_decides_multi_class() {
        let html = r#"<p><span class="citation author" id="x">Both</span></p>"#;
        let out = EditorParser::new().parse("b", html).unwrap();

        assert_eq!(spans(&out, LayerKind::Author), vec![("x".to_string(), 0, 4)]);
        assert!(!out.unit.layers.contains_key(&LayerKind::Citation));
        assert_eq!(
            MarkupTag::classify(["sabche", "book-title"]),
            Some(MarkupTag::BookTitle)
        );
        assert_eq!(MarkupTag::classify(["highlight"]), None);
    }

    #[test]
    fn test_unknown_class_is_literal_text() {
        let html = r#"<p><b class="bold">Hi</b> <span>there</span><span class="author" id="a">Me</span></p>"#;
        let out = EditorParser::new().parse("b", html).unwrap();

        assert_eq!(out.unit.base_text, "Hi thereMe\n");
        assert_eq!(spans(&out, LayerKind::Author), vec![("a".to_string(), 8, 10)]);
    }

    #[test]
    fn test_author_without_id_gets_derived_id() {
        let html = r#"<p><span class="author">Jamyang</span> wrote this</p>"#;
        let out = EditorParser::new().parse("vol1", html).unwrap();

        assert_eq!(out.unit.base_text, "Jamyang wrote this\n");
        let authors = spans(&out, LayerKind::Author);
        assert_eq!(authors.len(), 1);
        assert_eq!((authors[0].1, authors[0].2), (0, 7));
        assert_eq!(authors[0].0, derived_annotation_id("vol1", LayerKind::Author, 0));
        assert_eq!(out.diagnostics.len(), 1);
    }

    #[test]
    fn test_missing_id_skip_keeps_alignment() {
        let html = r#"<p><span class="author">Nobody</span> and <span class="author" id="a2">Somebody</span></p>"#;
        let out = EditorParser::new()
            .with_missing_id_policy(MissingIdPolicy::Skip)
            .parse("b", html)
            .unwrap();

        assert_eq!(out.unit.base_text, "Nobody and Somebody\n");
        assert_eq!(spans(&out, LayerKind::Author), vec![("a2".to_string(), 11, 19)]);
        assert_eq!(out.diagnostics.len(), 1);
        assert!(matches!(
            &out.diagnostics[0],
            FormatError::MissingAttribute { attribute: "id", index: 0, .. }
        ));
    }

    #[test]
    fn test_extra_attributes_become_metadata() {
        let html = r#"<p><span class="citation" id="c" data-source="Kangyur">x</span></p>"#;
        let out = EditorParser::new().parse("b", html).unwrap();
        let ann = &out.unit.layers[&LayerKind::Citation].annotations()[0];

        match &ann.attributes {
            AnnotationAttributes::Markup { metadata } => {
                assert_eq!(metadata.get("data-source").map(String::as_str), Some("Kangyur"));
                assert!(!metadata.contains_key("id"));
            }
            other => panic!("unexpected attributes {:?}", other),
        }
    }

    #[test]
    fn test_nested_markup_counts_all_text() {
        let html = r#"<p><span class="chapter" id="c"><i>Chap</i>ter</span> one</p>"#;
        let out = EditorParser::new().parse("b", html).unwrap();

        assert_eq!(out.unit.base_text, "Chapter one\n");
        assert_eq!(spans(&out, LayerKind::Chapter), vec![("c".to_string(), 0, 7)]);
    }

    #[test]
    fn test_empty_document_has_empty_base() {
        let out = EditorParser::new().parse("b", "").unwrap();
        assert_eq!(out.unit.base_text, "");
        assert!(out.unit.layers.is_empty());
    }

    #[test]
    fn test_text_without_paragraphs_is_malformed() {
        let err = EditorParser::new()
            .parse("b", "<div>loose text</div>")
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let err = EditorParser::new()
            .parse_bytes("b", &[b'<', b'p', b'>', 0xff, 0xfe])
            .unwrap_err();
        assert!(matches!(err, FormatError::MalformedInput(_)));
    }

    #[test]
    fn test_parsing_twice_is_identical() {
        let html = r#"<p><span class="sabche" id="s1">A</span>b</p><p><span class="author" id="a">C</span></p>"#;
        let parser = EditorParser::new();
        let first = parser.parse("b", html).unwrap();
        let second = parser.parse("b", html).unwrap();

        assert_eq!(first.unit, second.unit);
        assert_eq!(
            serde_yaml::to_string(&first.unit.layers).unwrap(),
            serde_yaml::to_string(&second.unit.layers).unwrap()
        );
    }
}
