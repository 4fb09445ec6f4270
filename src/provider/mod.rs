//! Pluggable source of OCR responses.
//!
//! Implementations fetch the raw Google Vision payload for one image of an
//! image group. A missing payload is `Ok(None)`; storage failures are
//! `ProviderError`, which callers treat as a soft per-page failure.

mod cache;
mod local;
mod retry;

pub use cache::CachedProvider;
pub use local::LocalDiskProvider;
pub use retry::RetryingProvider;

use async_trait::async_trait;
use serde_json::Value;

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors from OCR data providers.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider unavailable: {0}")]
    Unavailable(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },
}

/// Access to stored OCR responses.
#[async_trait]
pub trait OcrDataProvider: Send + Sync {
    /// Image ids of a group, in scan order.
    async fn list_images(&self, image_group_id: &str) -> ProviderResult<Vec<String>>;

    /// Raw OCR response for one image, `None` when none is stored.
    async fn get_ocr_response(
        &self,
        image_group_id: &str,
        image_id: &str,
    ) -> ProviderResult<Option<Value>>;
}

/// Drop the extension from an image id (`I123.tif` -> `I123`).
///
/// An artifact suffix (`.json.gz`, `.json`) is stripped alone, so dotted
/// stems such as `I1KG.0001.json` keep their inner dot.
pub(crate) fn image_stem(image_id: &str) -> &str {
    if let Some(stem) = image_id
        .strip_suffix(".json.gz")
        .or_else(|| image_id.strip_suffix(".json"))
    {
        return stem;
    }
    match image_id.rfind('.') {
        Some(dot) if dot > 0 => &image_id[..dot],
        _ => image_id,
    }
}
