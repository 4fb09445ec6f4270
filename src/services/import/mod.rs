//! Volume import service.
//!
//! Fetches every page of an image group from an OCR data provider, formats
//! the pages on the blocking pool with bounded concurrency and merges them
//! into one base unit. Emits events for progress tracking.

mod types;

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::formatters::{derived_annotation_id, BaseTextWriter, GoogleVisionFormatter, PageExtraction};
use crate::models::{
    layer_mut, Annotation, AnnotationAttributes, BaseUnit, Layer, LayerKind, LayerSet, Pecha,
    PechaMetadata,
};
use crate::provider::OcrDataProvider;

pub use types::{ImportEvent, PageReport, PageStatus, VolumeImport, VolumeStatistics};

/// Separator appended after the text of every non-empty page.
pub const PAGE_SEPARATOR: &str = "\n";

/// Default number of pages formatted concurrently.
pub const DEFAULT_WORKERS: usize = 4;

struct PageOutcome {
    report: PageReport,
    extraction: Option<PageExtraction>,
}

/// Service for importing OCR'd volumes.
pub struct VolumeImporter {
    provider: Arc<dyn OcrDataProvider>,
    formatter: Arc<GoogleVisionFormatter>,
    workers: usize,
}

impl VolumeImporter {
    pub fn new(provider: Arc<dyn OcrDataProvider>, formatter: GoogleVisionFormatter) -> Self {
        Self {
            provider,
            formatter: Arc::new(formatter),
            workers: DEFAULT_WORKERS,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub async fn import_volume(&self, image_group: &str) -> VolumeImport {
        self.import_volume_with_events(image_group, None).await
    }

    /// Import one image group, sending progress events if a channel is given.
    ///
    /// Never fails: listing failure yields an empty volume with
    /// `listing_error` set, page failures are recorded in the page reports.
    pub async fn import_volume_with_events(
        &self,
        image_group: &str,
        event_tx: Option<mpsc::Sender<ImportEvent>>,
    ) -> VolumeImport {
        let images = match self.provider.list_images(image_group).await {
            Ok(images) => images,
            Err(e) => {
                error!("Could not list images of {}: {}", image_group, e);
                return VolumeImport {
                    image_group: image_group.to_string(),
                    unit: empty_unit(image_group),
                    pages: Vec::new(),
                    statistics: VolumeStatistics::default(),
                    listing_error: Some(e.to_string()),
                };
            }
        };

        info!("Importing {} pages of {}", images.len(), image_group);
        send(
            &event_tx,
            ImportEvent::Started {
                image_group: image_group.to_string(),
                total_images: images.len(),
            },
        )
        .await;

        let mut pages = stream::iter(images.into_iter().enumerate())
            .map(|(index, image_id)| self.import_page(image_group, image_id, index + 1))
            .buffer_unordered(self.workers);

        let mut outcomes = Vec::new();
        while let Some(outcome) = pages.next().await {
            send(
                &event_tx,
                ImportEvent::PageFinished {
                    image_id: outcome.report.image_id.clone(),
                    imgnum: outcome.report.imgnum,
                    status: outcome.report.status,
                },
            )
            .await;
            outcomes.push(outcome);
        }
        outcomes.sort_by_key(|o| o.report.imgnum);

        let volume = merge_pages(image_group, outcomes);
        let imported = volume.count(PageStatus::Imported);
        send(
            &event_tx,
            ImportEvent::Finished {
                imported,
                skipped: volume.pages.len() - imported,
            },
        )
        .await;
        volume
    }

    async fn import_page(&self, image_group: &str, image_id: String, imgnum: usize) -> PageOutcome {
        let mut report = PageReport {
            image_id: image_id.clone(),
            imgnum,
            status: PageStatus::Imported,
            diagnostics: Vec::new(),
            error: None,
        };

        let value = match self.provider.get_ocr_response(image_group, &image_id).await {
            Ok(Some(value)) => value,
            Ok(None) => {
                warn!("No OCR response for {}/{}", image_group, image_id);
                report.status = PageStatus::Missing;
                return PageOutcome {
                    report,
                    extraction: None,
                };
            }
            Err(e) => {
                error!("Provider failed for {}/{}: {}", image_group, image_id, e);
                report.status = PageStatus::ProviderUnavailable;
                report.error = Some(e.to_string());
                return PageOutcome {
                    report,
                    extraction: None,
                };
            }
        };

        let formatter = self.formatter.clone();
        let base_name = image_id.clone();
        let formatted =
            tokio::task::spawn_blocking(move || formatter.format_page_value(&base_name, value))
                .await;

        let extraction = match formatted {
            Ok(Ok(Some(extraction))) => {
                report.diagnostics = extraction.diagnostics.clone();
                if extraction.unit.base_text.is_empty() {
                    report.status = PageStatus::Empty;
                    None
                } else {
                    debug!(
                        "Formatted {}/{}: {} words",
                        image_group,
                        image_id,
                        extraction.word_count()
                    );
                    Some(extraction)
                }
            }
            Ok(Ok(None)) => {
                report.status = PageStatus::Empty;
                None
            }
            Ok(Err(e)) => {
                warn!("Skipping {}/{}: {}", image_group, image_id, e);
                report.status = PageStatus::Malformed;
                report.error = Some(e.to_string());
                None
            }
            Err(e) => {
                error!("Formatting task for {}/{} failed: {}", image_group, image_id, e);
                report.status = PageStatus::Failed;
                report.error = Some(e.to_string());
                None
            }
        };

        PageOutcome { report, extraction }
    }
}

async fn send(event_tx: &Option<mpsc::Sender<ImportEvent>>, event: ImportEvent) {
    if let Some(tx) = event_tx {
        let _ = tx.send(event).await;
    }
}

fn empty_unit(base_name: &str) -> BaseUnit {
    BaseUnit {
        base_name: base_name.to_string(),
        base_text: String::new(),
        layers: LayerSet::new(),
    }
}

/// Concatenate page units (already in image order) into one volume unit.
///
/// Each page's spans are shifted by the page's offset in the volume text and
/// a `Pagination` annotation covers the page's text.
fn merge_pages(image_group: &str, outcomes: Vec<PageOutcome>) -> VolumeImport {
    let mut writer = BaseTextWriter::new();
    let mut layers = LayerSet::new();
    let mut reports = Vec::with_capacity(outcomes.len());
    let mut word_count = 0;
    let mut confidences = Vec::new();

    for PageOutcome { report, extraction } in outcomes {
        if let Some(page) = extraction {
            word_count += page.word_count();
            confidences.extend_from_slice(&page.word_confidences);

            let offset = writer.position();
            let page_span = writer.push_span(&page.unit.base_text);
            writer.push_literal(PAGE_SEPARATOR);

            for (kind, layer) in page.unit.layers {
                let threshold = layer.confidence_threshold();
                let target = layers.entry(kind).or_insert_with(|| match threshold {
                    Some(t) => Layer::new(kind).with_confidence_threshold(t),
                    None => Layer::new(kind),
                });
                for annotation in layer.into_annotations() {
                    target.insert(annotation.shifted(offset));
                }
            }

            layer_mut(&mut layers, LayerKind::Pagination).insert(Annotation::new(
                derived_annotation_id(image_group, LayerKind::Pagination, report.imgnum),
                page_span,
                AnnotationAttributes::Page {
                    imgnum: report.imgnum,
                    reference: report.image_id.clone(),
                },
            ));
        }
        reports.push(report);
    }

    VolumeImport {
        image_group: image_group.to_string(),
        unit: BaseUnit {
            base_name: image_group.to_string(),
            base_text: writer.finish(),
            layers,
        },
        pages: reports,
        statistics: VolumeStatistics::from_confidences(word_count, &confidences),
        listing_error: None,
    }
}

impl VolumeImport {
    /// Add the volume to a pecha, recording its statistics and page list.
    pub fn add_to(self, pecha: &mut Pecha) {
        apply_statistics(&mut pecha.metadata, &self.statistics);
        let source = serde_json::json!({
            "image_group": self.image_group,
            "pages": self
                .pages
                .iter()
                .map(|p| serde_json::json!({
                    "imgnum": p.imgnum,
                    "reference": p.image_id,
                    "status": p.status,
                }))
                .collect::<Vec<_>>(),
        });
        pecha.add_unit_with_source(self.unit, Some(source));
    }
}

/// Store volume statistics in the metadata.
///
/// Word counts of several volumes accumulate; confidence indices are those
/// of the last volume.
pub fn apply_statistics(metadata: &mut PechaMetadata, statistics: &VolumeStatistics) {
    let previous = metadata
        .statistics()
        .and_then(|s| s.get("ocr_word_count"))
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as usize;
    let mut merged = statistics.clone();
    merged.word_count += previous;
    metadata.set_ocr_statistics(
        merged.to_value(),
        statistics.mean_confidence,
        statistics.median_confidence,
    );
}
