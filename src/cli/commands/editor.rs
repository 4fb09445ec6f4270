//! Editor HTML import command.

use std::path::Path;

use console::style;

use crate::config::Settings;
use crate::formatters::EditorParser;
use crate::models::{InitialCreationType, MetadataInit, Pecha, PechaMetadata};
use crate::storage::PechaWriter;

/// Build a pecha from one editor HTML export.
pub async fn cmd_editor(
    settings: &Settings,
    file: &Path,
    base_name: Option<String>,
) -> anyhow::Result<()> {
    let html = tokio::fs::read(file)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", file.display(), e))?;

    let base_name = base_name.unwrap_or_else(|| {
        file.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "v001".to_string())
    });

    println!(
        "{} Parsing {} as base {}",
        style("→").cyan(),
        file.display(),
        base_name
    );
    let extraction = EditorParser::new().parse_bytes(&base_name, &html)?;

    for diagnostic in &extraction.diagnostics {
        println!("  {} {}", style("!").yellow(), diagnostic);
    }

    let metadata = PechaMetadata::new(
        InitialCreationType::Input,
        MetadataInit {
            source_file: Some(file.display().to_string()),
            ..Default::default()
        },
    )?;
    let mut pecha = Pecha::new(metadata);
    let annotations: usize = extraction.unit.layers.values().map(|l| l.len()).sum();
    pecha.add_unit(extraction.unit);

    let opf_dir = PechaWriter::new(&settings.output_dir).save(&pecha).await?;
    println!(
        "{} Pecha {} written to {} ({} annotations)",
        style("✓").green(),
        pecha.id(),
        opf_dir.display(),
        annotations
    );
    Ok(())
}
