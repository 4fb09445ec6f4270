//! Pecha metadata record.
//!
//! Built once from a [`MetadataInit`] with defaults filled in and URL fields
//! validated. Afterwards only `last_modified` moves (via [`PechaMetadata::touch`])
//! and the assembly step registers bases and OCR statistics.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Errors raised while validating metadata.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("invalid {field} url: {reason}")]
    InvalidUrl { field: &'static str, reason: String },

    #[error("pecha id must not be blank")]
    BlankId,
}

/// How the pecha first came into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitialCreationType {
    Ocr,
    Ebook,
    Input,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CopyrightStatus {
    #[default]
    Unknown,
    Copyrighted,
    #[serde(rename = "Public Domain")]
    PublicDomain,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Copyright {
    #[serde(default)]
    pub status: CopyrightStatus,
    #[serde(default)]
    pub notice: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_url: Option<String>,
}

/// Creative Commons license family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LicenseType {
    #[serde(rename = "CC0")]
    Cc0,
    #[serde(rename = "Public Domain Mark")]
    PublicDomainMark,
    #[serde(rename = "CC BY")]
    CcBy,
    #[serde(rename = "CC BY-SA")]
    CcBySa,
    #[serde(rename = "CC BY-ND")]
    CcByNd,
    #[serde(rename = "CC BY-NC")]
    CcByNc,
    #[serde(rename = "CC BY-NC-SA")]
    CcByNcSa,
    #[serde(rename = "CC BY-NC-ND")]
    CcByNcNd,
}

/// Per-base bookkeeping stored alongside the metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseInfo {
    pub base_file: String,
    pub order: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_metadata: Option<serde_json::Value>,
}

/// Caller-supplied metadata fields; everything left `None` gets a default.
#[derive(Debug, Clone, Default)]
pub struct MetadataInit {
    pub id: Option<String>,
    pub legacy_id: Option<String>,
    pub default_language: Option<String>,
    pub source: Option<String>,
    pub source_file: Option<String>,
    pub parser: Option<String>,
    pub imported: Option<DateTime<Utc>>,
    pub last_modified: Option<DateTime<Utc>>,
    pub copyright: Option<Copyright>,
    pub license: Option<LicenseType>,
    pub ocr_import_info: Option<serde_json::Value>,
    pub source_metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PechaMetadata {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    legacy_id: Option<String>,
    initial_creation_type: InitialCreationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parser: Option<String>,
    imported: DateTime<Utc>,
    last_modified: DateTime<Utc>,
    copyright: Copyright,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    license: Option<LicenseType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ocr_import_info: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_metadata: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    statistics: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    quality: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ocr_word_mean_confidence_index: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ocr_word_median_confidence_index: Option<f32>,
    #[serde(default)]
    bases: BTreeMap<String, BaseInfo>,
}

/// Generate an initial pecha ID: `I` followed by 8 uppercase hex digits.
pub fn generate_pecha_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("I{}", hex[..8].to_uppercase())
}

fn validate_http_url(field: &'static str, value: &str) -> Result<(), MetadataError> {
    let url = Url::parse(value).map_err(|e| MetadataError::InvalidUrl {
        field,
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(MetadataError::InvalidUrl {
            field,
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

impl PechaMetadata {
    /// Build a record, filling defaults and validating URL fields.
    pub fn new(
        initial_creation_type: InitialCreationType,
        init: MetadataInit,
    ) -> Result<Self, MetadataError> {
        let id = match init.id {
            Some(id) if id.trim().is_empty() => return Err(MetadataError::BlankId),
            Some(id) => id,
            None => generate_pecha_id(),
        };

        if let Some(ref parser) = init.parser {
            validate_http_url("parser", parser)?;
        }
        let copyright = init.copyright.unwrap_or_default();
        if let Some(ref info_url) = copyright.info_url {
            validate_http_url("copyright info", info_url)?;
        }

        let now = Utc::now();
        Ok(Self {
            id,
            legacy_id: init.legacy_id,
            initial_creation_type,
            default_language: init.default_language,
            source: init.source,
            source_file: init.source_file,
            parser: init.parser,
            imported: init.imported.unwrap_or(now),
            last_modified: init.last_modified.unwrap_or(now),
            copyright,
            license: init.license,
            ocr_import_info: init.ocr_import_info,
            source_metadata: init.source_metadata,
            statistics: None,
            quality: None,
            ocr_word_mean_confidence_index: None,
            ocr_word_median_confidence_index: None,
            bases: BTreeMap::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn initial_creation_type(&self) -> InitialCreationType {
        self.initial_creation_type
    }

    pub fn default_language(&self) -> Option<&str> {
        self.default_language.as_deref()
    }

    pub fn imported(&self) -> DateTime<Utc> {
        self.imported
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    pub fn copyright(&self) -> &Copyright {
        &self.copyright
    }

    pub fn license(&self) -> Option<LicenseType> {
        self.license
    }

    pub fn bases(&self) -> &BTreeMap<String, BaseInfo> {
        &self.bases
    }

    pub fn statistics(&self) -> Option<&serde_json::Value> {
        self.statistics.as_ref()
    }

    pub fn ocr_confidence_indices(&self) -> (Option<f32>, Option<f32>) {
        (
            self.ocr_word_mean_confidence_index,
            self.ocr_word_median_confidence_index,
        )
    }

    /// Bump `last_modified` to now.
    pub fn touch(&mut self) {
        self.last_modified = Utc::now();
    }

    pub(crate) fn register_base(&mut self, base_name: &str, source_metadata: Option<serde_json::Value>) {
        let order = self
            .bases
            .get(base_name)
            .map(|b| b.order)
            .unwrap_or(self.bases.len() + 1);
        self.bases.insert(
            base_name.to_string(),
            BaseInfo {
                base_file: format!("{}.txt", base_name),
                order,
                source_metadata,
            },
        );
    }

    pub(crate) fn set_ocr_statistics(
        &mut self,
        statistics: serde_json::Value,
        mean: Option<f32>,
        median: Option<f32>,
    ) {
        self.statistics = Some(statistics);
        self.ocr_word_mean_confidence_index = mean;
        self.ocr_word_median_confidence_index = median;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_filled() {
        let meta = PechaMetadata::new(InitialCreationType::Ocr, MetadataInit::default()).unwrap();

        assert_eq!(meta.id().len(), 9);
        assert!(meta.id().starts_with('I'));
        assert!(meta.id()[1..]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        assert_eq!(meta.copyright(), &Copyright::default());
        assert_eq!(meta.copyright().status, CopyrightStatus::Unknown);
        assert_eq!(meta.imported(), meta.last_modified());
    }

    #[test]
    fn test_supplied_id_is_kept() {
        let meta = PechaMetadata::new(
            InitialCreationType::Input,
            MetadataInit {
                id: Some("I12345678".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(meta.id(), "I12345678");
    }

    #[test]
    fn test_blank_id_rejected() {
        let result = PechaMetadata::new(
            InitialCreationType::Input,
            MetadataInit {
                id: Some("  ".to_string()),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(MetadataError::BlankId)));
    }

    #[test]
    fn test_parser_url_must_be_http() {
        let result = PechaMetadata::new(
            InitialCreationType::Ebook,
            MetadataInit {
                parser: Some("ftp://example.org/parser".to_string()),
                ..Default::default()
            },
        );
        assert!(matches!(
            result,
            Err(MetadataError::InvalidUrl { field: "parser", .. })
        ));

        let result = PechaMetadata::new(
            InitialCreationType::Ebook,
            MetadataInit {
                copyright: Some(Copyright {
                    status: CopyrightStatus::Copyrighted,
                    notice: "All rights reserved".to_string(),
                    info_url: Some("not a url".to_string()),
                }),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(MetadataError::InvalidUrl { .. })));
    }

    #[test]
    fn test_touch_moves_last_modified() {
        let earlier = Utc::now() - chrono::Duration::days(1);
        let mut meta = PechaMetadata::new(
            InitialCreationType::Ocr,
            MetadataInit {
                imported: Some(earlier),
                last_modified: Some(earlier),
                ..Default::default()
            },
        )
        .unwrap();

        meta.touch();
        assert_eq!(meta.imported(), earlier);
        assert!(meta.last_modified() > earlier);
    }

    #[test]
    fn test_register_base_keeps_order() {
        let mut meta = PechaMetadata::new(InitialCreationType::Ocr, MetadataInit::default()).unwrap();
        meta.register_base("I0886", None);
        meta.register_base("I0887", None);
        meta.register_base("I0886", None);

        assert_eq!(meta.bases()["I0886"].order, 1);
        assert_eq!(meta.bases()["I0887"].order, 2);
        assert_eq!(meta.bases()["I0887"].base_file, "I0887.txt");
    }

    #[test]
    fn test_serialized_names() {
        let meta = PechaMetadata::new(
            InitialCreationType::Ocr,
            MetadataInit {
                license: Some(LicenseType::CcByNcSa),
                copyright: Some(Copyright {
                    status: CopyrightStatus::PublicDomain,
                    ..Default::default()
                }),
                ..Default::default()
            },
        )
        .unwrap();
        let yaml = serde_yaml::to_string(&meta).unwrap();
        assert!(yaml.contains("initial_creation_type: ocr"));
        assert!(yaml.contains("license: CC BY-NC-SA"));
        assert!(yaml.contains("status: Public Domain"));
    }
}
