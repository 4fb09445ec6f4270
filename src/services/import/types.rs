//! Volume import types and events.

use serde::Serialize;
use serde_json::json;

use crate::formatters::FormatError;
use crate::models::BaseUnit;

/// Outcome of one page of a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    /// Page text and layers were merged into the volume.
    Imported,
    /// The response had no text (or no usable words).
    Empty,
    /// The provider has no response for the image.
    Missing,
    /// The response could not be decoded.
    Malformed,
    /// The provider failed after retries.
    ProviderUnavailable,
    /// Extraction panicked or was cancelled.
    Failed,
}

/// Events emitted during volume import.
#[derive(Debug, Clone)]
pub enum ImportEvent {
    /// Image list fetched
    Started {
        image_group: String,
        total_images: usize,
    },
    /// One page finished, in completion order
    PageFinished {
        image_id: String,
        imgnum: usize,
        status: PageStatus,
    },
    /// All pages finished and merged
    Finished { imported: usize, skipped: usize },
}

/// Per-page result.
#[derive(Debug, Clone)]
pub struct PageReport {
    pub image_id: String,
    /// 1-based position of the image in the group.
    pub imgnum: usize,
    pub status: PageStatus,
    pub diagnostics: Vec<FormatError>,
    pub error: Option<String>,
}

/// Word count and confidence indices of a volume.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VolumeStatistics {
    pub word_count: usize,
    pub mean_confidence: Option<f32>,
    pub median_confidence: Option<f32>,
}

impl VolumeStatistics {
    pub fn from_confidences(word_count: usize, confidences: &[f32]) -> Self {
        if confidences.is_empty() {
            return Self {
                word_count,
                ..Default::default()
            };
        }

        let mean = confidences.iter().sum::<f32>() / confidences.len() as f32;
        let mut sorted = confidences.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        Self {
            word_count,
            mean_confidence: Some(mean),
            median_confidence: Some(median),
        }
    }

    /// Statistics block as stored in pecha metadata.
    pub fn to_value(&self) -> serde_json::Value {
        json!({
            "ocr_word_count": self.word_count,
            "ocr_word_mean_confidence_index": self.mean_confidence,
            "ocr_word_median_confidence_index": self.median_confidence,
        })
    }
}

/// Result of importing one image group.
#[derive(Debug, Clone)]
pub struct VolumeImport {
    pub image_group: String,
    /// Merged base text and layers of every non-empty page.
    pub unit: BaseUnit,
    /// One report per listed image, in image order.
    pub pages: Vec<PageReport>,
    pub statistics: VolumeStatistics,
    /// Set when the image list itself could not be fetched.
    pub listing_error: Option<String>,
}

impl VolumeImport {
    pub fn count(&self, status: PageStatus) -> usize {
        self.pages.iter().filter(|p| p.status == status).count()
    }
}
