//! Retry decorator for flaky providers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use super::{OcrDataProvider, ProviderResult};

/// Retries failed calls up to `retries` extra times, sleeping
/// `delay * attempt` between attempts. `Ok(None)` is not retried.
pub struct RetryingProvider {
    inner: Arc<dyn OcrDataProvider>,
    retries: u32,
    delay: Duration,
}

impl RetryingProvider {
    pub fn new(inner: Arc<dyn OcrDataProvider>, retries: u32, delay: Duration) -> Self {
        Self {
            inner,
            retries,
            delay,
        }
    }

    async fn backoff(&self, what: &str, attempt: u32, err: &super::ProviderError) {
        warn!(
            "{} failed (attempt {}/{}): {}",
            what,
            attempt,
            self.retries + 1,
            err
        );
        tokio::time::sleep(self.delay * attempt).await;
    }
}

#[async_trait]
impl OcrDataProvider for RetryingProvider {
    async fn list_images(&self, image_group_id: &str) -> ProviderResult<Vec<String>> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.inner.list_images(image_group_id).await {
                Err(e) if attempt <= self.retries => {
                    self.backoff(&format!("Listing {}", image_group_id), attempt, &e)
                        .await
                }
                result => return result,
            }
        }
    }

    async fn get_ocr_response(
        &self,
        image_group_id: &str,
        image_id: &str,
    ) -> ProviderResult<Option<Value>> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.inner.get_ocr_response(image_group_id, image_id).await {
                Err(e) if attempt <= self.retries => {
                    self.backoff(
                        &format!("Fetching {}/{}", image_group_id, image_id),
                        attempt,
                        &e,
                    )
                    .await
                }
                result => return result,
            }
        }
    }
}
