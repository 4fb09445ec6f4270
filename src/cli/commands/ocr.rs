//! OCR volume import command.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use console::style;
use indicatif::ProgressBar;
use tokio::sync::mpsc;

use super::progress_style;
use crate::config::Settings;
use crate::formatters::GoogleVisionFormatter;
use crate::models::{InitialCreationType, MetadataInit, Pecha, PechaMetadata};
use crate::provider::{LocalDiskProvider, OcrDataProvider, RetryingProvider};
use crate::services::{ImportEvent, PageStatus, VolumeImporter};
use crate::storage::PechaWriter;

/// Provider for one volume import: retries over the local store.
///
/// Each page is fetched once and released after formatting, so no payload
/// cache sits in this chain.
fn volume_provider(settings: &Settings, ocr_dir: &Path) -> Arc<dyn OcrDataProvider> {
    Arc::new(RetryingProvider::new(
        Arc::new(LocalDiskProvider::new(ocr_dir)),
        settings.provider_retries,
        settings.retry_delay(),
    ))
}

/// Import one image group from the local OCR store and write it as a pecha.
pub async fn cmd_ocr(settings: &Settings, image_group: &str) -> anyhow::Result<()> {
    let Some(ocr_dir) = settings.ocr_dir.clone() else {
        anyhow::bail!("No OCR directory configured. Pass --ocr-dir or set ocr_dir in config.");
    };

    let provider = volume_provider(settings, &ocr_dir);

    let formatter = GoogleVisionFormatter::new(settings.default_language.clone())
        .with_confidence_threshold(settings.confidence_threshold);
    let importer = VolumeImporter::new(provider, formatter).with_workers(settings.workers);

    let (event_tx, mut event_rx) = mpsc::channel::<ImportEvent>(100);
    let bar_style = progress_style()?;

    let event_handler = tokio::spawn(async move {
        let mut progress: Option<ProgressBar> = None;
        while let Some(event) = event_rx.recv().await {
            match event {
                ImportEvent::Started {
                    image_group,
                    total_images,
                } => {
                    println!(
                        "{} Importing {} pages of {}",
                        style("→").cyan(),
                        total_images,
                        image_group
                    );
                    let bar = ProgressBar::new(total_images as u64);
                    bar.set_style(bar_style.clone());
                    bar.enable_steady_tick(Duration::from_millis(120));
                    bar.set_message("Formatting pages...");
                    progress = Some(bar);
                }
                ImportEvent::PageFinished {
                    image_id, status, ..
                } => {
                    if let Some(ref bar) = progress {
                        if status != PageStatus::Imported {
                            bar.suspend(|| {
                                eprintln!("  {} {}: {:?}", style("!").yellow(), image_id, status);
                            });
                        }
                        bar.inc(1);
                    }
                }
                ImportEvent::Finished { imported, skipped } => {
                    if let Some(bar) = progress.take() {
                        bar.finish_and_clear();
                    }
                    println!(
                        "{} {} pages imported, {} skipped",
                        style("✓").green(),
                        imported,
                        skipped
                    );
                }
            }
        }
    });

    let volume = importer
        .import_volume_with_events(image_group, Some(event_tx))
        .await;
    let _ = event_handler.await;

    if let Some(ref error) = volume.listing_error {
        anyhow::bail!("Could not list images of {}: {}", image_group, error);
    }

    let metadata = PechaMetadata::new(
        InitialCreationType::Ocr,
        MetadataInit {
            default_language: Some(settings.default_language.clone()),
            ocr_import_info: Some(serde_json::json!({
                "image_group": image_group,
                "ocr_dir": ocr_dir.display().to_string(),
                "confidence_threshold": settings.confidence_threshold,
                "imported_at": chrono::Utc::now().to_rfc3339(),
            })),
            ..Default::default()
        },
    )?;
    let mut pecha = Pecha::new(metadata);
    let words = volume.statistics.word_count;
    volume.add_to(&mut pecha);

    let opf_dir = PechaWriter::new(&settings.output_dir).save(&pecha).await?;
    println!(
        "{} Pecha {} written to {} ({} words)",
        style("✓").green(),
        pecha.id(),
        opf_dir.display(),
        words
    );
    Ok(())
}
