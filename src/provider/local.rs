//! Provider over OCR artifacts stored on local disk.
//!
//! Layout: `<root>/<image_group>/<stem>.json.gz` (or `<stem>.json`).

use std::io::Read;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use flate2::read::GzDecoder;
use serde_json::Value;
use tracing::debug;

use super::{image_stem, OcrDataProvider, ProviderError, ProviderResult};

#[derive(Debug, Clone)]
pub struct LocalDiskProvider {
    root: PathBuf,
}

impl LocalDiskProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn group_dir(&self, image_group_id: &str) -> PathBuf {
        self.root.join(image_group_id)
    }
}

fn artifact_stem(file_name: &str) -> Option<&str> {
    file_name
        .strip_suffix(".json.gz")
        .or_else(|| file_name.strip_suffix(".json"))
}

fn decode(path: &Path, bytes: Vec<u8>) -> ProviderResult<Value> {
    let bytes = if path.extension().is_some_and(|ext| ext == "gz") {
        let mut out = Vec::new();
        GzDecoder::new(bytes.as_slice())
            .read_to_end(&mut out)
            .map_err(|e| ProviderError::Decode {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        out
    } else {
        bytes
    };
    serde_json::from_slice(&bytes).map_err(|e| ProviderError::Decode {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl OcrDataProvider for LocalDiskProvider {
    async fn list_images(&self, image_group_id: &str) -> ProviderResult<Vec<String>> {
        let dir = self.group_dir(image_group_id);
        let mut entries = tokio::fs::read_dir(&dir).await.map_err(|e| {
            ProviderError::Unavailable(format!("{}: {}", dir.display(), e))
        })?;

        let mut stems = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(stem) = artifact_stem(name) {
                stems.push(stem.to_string());
            }
        }
        stems.sort();
        stems.dedup();
        debug!("Found {} OCR artifacts in {}", stems.len(), dir.display());
        Ok(stems)
    }

    async fn get_ocr_response(
        &self,
        image_group_id: &str,
        image_id: &str,
    ) -> ProviderResult<Option<Value>> {
        let dir = self.group_dir(image_group_id);

        // Ids from `list_images` are stems already; others may carry an
        // image extension.
        let mut names = vec![image_id];
        let stem = image_stem(image_id);
        if stem != image_id {
            names.push(stem);
        }
        let candidates = names
            .into_iter()
            .flat_map(|name| [format!("{}.json.gz", name), format!("{}.json", name)]);

        for candidate in candidates {
            let path = dir.join(candidate);
            match tokio::fs::read(&path).await {
                Ok(bytes) => {
                    let value = tokio::task::spawn_blocking(move || decode(&path, bytes))
                        .await
                        .map_err(|e| ProviderError::Unavailable(e.to_string()))??;
                    return Ok(Some(value));
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }
}
