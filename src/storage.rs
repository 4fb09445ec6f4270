//! Storage helpers for pechas on disk.
//!
//! Layout under the output directory:
//! `{output}/{id}/{id}.opf/meta.yml`, `.../base/{base}.txt` and
//! `.../layers/{base}/{Kind}.yml`.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info};

use crate::models::{Layer, LayerKind, Pecha, PechaMetadata};

/// Construct the `.opf` directory of a pecha.
pub fn opf_path(output_dir: &Path, pecha_id: &str) -> PathBuf {
    output_dir
        .join(pecha_id)
        .join(format!("{}.opf", pecha_id))
}

/// Construct the path of one base text.
pub fn base_path(opf_dir: &Path, base_name: &str) -> PathBuf {
    opf_dir.join("base").join(format!("{}.txt", base_name))
}

/// Construct the path of one layer file.
pub fn layer_path(opf_dir: &Path, base_name: &str, kind: LayerKind) -> PathBuf {
    opf_dir
        .join("layers")
        .join(base_name)
        .join(format!("{}.yml", kind))
}

/// Writes pechas to an output directory.
#[derive(Debug, Clone)]
pub struct PechaWriter {
    output_dir: PathBuf,
}

impl PechaWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Save metadata, every base and every non-empty layer.
    ///
    /// Returns the `.opf` directory that was written.
    pub async fn save(&self, pecha: &Pecha) -> anyhow::Result<PathBuf> {
        let opf_dir = opf_path(&self.output_dir, pecha.id());

        for base_name in pecha.base_names() {
            let text = pecha.base(base_name).unwrap_or_default();
            write_file(&base_path(&opf_dir, base_name), text.as_bytes()).await?;

            let Some(layers) = pecha.layers(base_name) else {
                continue;
            };
            for (kind, layer) in layers {
                if layer.is_empty() {
                    continue;
                }
                let yaml = serde_yaml::to_string(layer)
                    .with_context(|| format!("Failed to serialize {} layer", kind))?;
                write_file(&layer_path(&opf_dir, base_name, *kind), yaml.as_bytes()).await?;
                debug!("Wrote {} annotations to {} layer of {}", layer.len(), kind, base_name);
            }
        }

        let meta = serde_yaml::to_string(&pecha.metadata).context("Failed to serialize metadata")?;
        write_file(&opf_dir.join("meta.yml"), meta.as_bytes()).await?;

        info!("Saved pecha {} to {}", pecha.id(), opf_dir.display());
        Ok(opf_dir)
    }
}

async fn write_file(path: &Path, contents: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Load a layer file back from an `.opf` directory.
pub async fn read_layer(opf_dir: &Path, base_name: &str, kind: LayerKind) -> anyhow::Result<Layer> {
    let path = layer_path(opf_dir, base_name, kind);
    let content = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load a base text back from an `.opf` directory.
pub async fn read_base(opf_dir: &Path, base_name: &str) -> anyhow::Result<String> {
    let path = base_path(opf_dir, base_name);
    tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

/// Load pecha metadata back from an `.opf` directory.
pub async fn read_metadata(opf_dir: &Path) -> anyhow::Result<PechaMetadata> {
    let path = opf_dir.join("meta.yml");
    let content = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatters::EditorParser;
    use crate::models::{InitialCreationType, MetadataInit};
    use tempfile::TempDir;

    fn sample_pecha() -> Pecha {
        let html = r#"<p><span class="author" id="a1">Jamyang</span> wrote this</p>
<p><span class="book-title" id="t1">ཀ་ཁ</span></p>"#;
        let extraction = EditorParser::new().parse("v001", html).unwrap();
        let meta = PechaMetadata::new(InitialCreationType::Input, MetadataInit::default()).unwrap();
        let mut pecha = Pecha::new(meta);
        pecha.add_unit(extraction.unit);
        pecha
    }

    #[test]
    fn test_paths() {
        let opf = opf_path(Path::new("/out"), "IABCD1234");
        assert_eq!(opf, PathBuf::from("/out/IABCD1234/IABCD1234.opf"));
        assert_eq!(
            layer_path(&opf, "v001", LayerKind::OcrConfidence),
            PathBuf::from("/out/IABCD1234/IABCD1234.opf/layers/v001/OCRConfidence.yml")
        );
        assert_eq!(
            base_path(&opf, "v001"),
            PathBuf::from("/out/IABCD1234/IABCD1234.opf/base/v001.txt")
        );
    }

    #[tokio::test]
    async fn test_save_and_read_back() {
        let dir = TempDir::new().unwrap();
        let pecha = sample_pecha();
        let writer = PechaWriter::new(dir.path());

        let opf_dir = writer.save(&pecha).await.unwrap();

        assert_eq!(read_base(&opf_dir, "v001").await.unwrap(), "Jamyang wrote this\nཀ་ཁ\n");
        let authors = read_layer(&opf_dir, "v001", LayerKind::Author).await.unwrap();
        assert_eq!(&authors, &pecha.layers("v001").unwrap()[&LayerKind::Author]);
        let titles = read_layer(&opf_dir, "v001", LayerKind::BookTitle).await.unwrap();
        assert_eq!(titles.annotations()[0].span.start(), 19);
        assert_eq!(titles.annotations()[0].span.end(), 22);

        let meta = read_metadata(&opf_dir).await.unwrap();
        assert_eq!(meta.id(), pecha.id());
        assert_eq!(meta.bases()["v001"].base_file, "v001.txt");
    }

    #[tokio::test]
    async fn test_empty_layers_are_not_written() {
        let dir = TempDir::new().unwrap();
        let opf_dir = PechaWriter::new(dir.path()).save(&sample_pecha()).await.unwrap();

        assert!(!layer_path(&opf_dir, "v001", LayerKind::Chapter).exists());
        assert!(read_layer(&opf_dir, "v001", LayerKind::Chapter).await.is_err());
    }
}
