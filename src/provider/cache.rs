//! In-memory memoization of provider results.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{OcrDataProvider, ProviderResult};

/// Caches successful results per group and per `(group, image)`.
/// Errors are not cached.
pub struct CachedProvider {
    inner: Arc<dyn OcrDataProvider>,
    images: RwLock<HashMap<String, Vec<String>>>,
    responses: RwLock<HashMap<(String, String), Option<Value>>>,
}

impl CachedProvider {
    pub fn new(inner: Arc<dyn OcrDataProvider>) -> Self {
        Self {
            inner,
            images: RwLock::new(HashMap::new()),
            responses: RwLock::new(HashMap::new()),
        }
    }

    pub async fn cached_responses(&self) -> usize {
        self.responses.read().await.len()
    }
}

#[async_trait]
impl OcrDataProvider for CachedProvider {
    async fn list_images(&self, image_group_id: &str) -> ProviderResult<Vec<String>> {
        if let Some(images) = self.images.read().await.get(image_group_id) {
            return Ok(images.clone());
        }
        let images = self.inner.list_images(image_group_id).await?;
        self.images
            .write()
            .await
            .insert(image_group_id.to_string(), images.clone());
        Ok(images)
    }

    async fn get_ocr_response(
        &self,
        image_group_id: &str,
        image_id: &str,
    ) -> ProviderResult<Option<Value>> {
        let key = (image_group_id.to_string(), image_id.to_string());
        if let Some(response) = self.responses.read().await.get(&key) {
            return Ok(response.clone());
        }
        let response = self
            .inner
            .get_ocr_response(image_group_id, image_id)
            .await?;
        self.responses.write().await.insert(key, response.clone());
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct Counting {
        calls: AtomicU32,
    }

    #[async_trait]
    impl OcrDataProvider for Counting {
        async fn list_images(&self, group: &str) -> ProviderResult<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![format!("{}-1", group)])
        }

        async fn get_ocr_response(&self, _group: &str, id: &str) -> ProviderResult<Option<Value>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(serde_json::json!({ "id": id })))
        }
    }

    #[tokio::test]
    async fn test_second_lookup_hits_cache() {
        let inner = Arc::new(Counting::default());
        let provider = CachedProvider::new(inner.clone());

        assert_eq!(provider.list_images("g").await.unwrap(), vec!["g-1"]);
        assert_eq!(provider.list_images("g").await.unwrap(), vec!["g-1"]);
        let first = provider.get_ocr_response("g", "a").await.unwrap();
        let second = provider.get_ocr_response("g", "a").await.unwrap();
        assert_eq!(first, second);
        provider.get_ocr_response("g", "b").await.unwrap();

        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
        assert_eq!(provider.cached_responses().await, 2);
    }
}
