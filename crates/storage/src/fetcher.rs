//! Object retrieval for ingestion notifications.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use object_store::path::Path;
use object_store::ObjectStore;
use tracing::debug;

use shelfsync_core::config::AwsConfig;

use crate::backend::build_s3_store;
use crate::error::FetchError;

/// Reads the full body of one object.
#[async_trait]
pub trait ObjectFetcher: Send + Sync {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Bytes, FetchError>;
}

type StoreFactory =
    Box<dyn Fn(&str) -> Result<Arc<dyn ObjectStore>, object_store::Error> + Send + Sync>;

/// [`ObjectFetcher`] over `object_store`, one client per bucket.
///
/// Clients are built on first use and cached.
pub struct ObjectStoreFetcher {
    factory: StoreFactory,
    stores: RwLock<HashMap<String, Arc<dyn ObjectStore>>>,
}

impl ObjectStoreFetcher {
    /// Fetcher for S3 / S3-compatible buckets described by `aws`.
    pub fn s3(aws: AwsConfig) -> Self {
        Self::with_factory(move |bucket| build_s3_store(&aws, bucket))
    }

    pub fn with_factory<F>(factory: F) -> Self
    where
        F: Fn(&str) -> Result<Arc<dyn ObjectStore>, object_store::Error> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            stores: RwLock::new(HashMap::new()),
        }
    }

    fn store_for(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>, FetchError> {
        if let Some(store) = self
            .stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(bucket)
        {
            return Ok(store.clone());
        }

        let store = (self.factory)(bucket)?;
        self.stores
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(bucket.to_string())
            .or_insert_with(|| store.clone());
        Ok(store)
    }
}

#[async_trait]
impl ObjectFetcher for ObjectStoreFetcher {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Bytes, FetchError> {
        let store = self.store_for(bucket)?;
        let path = Path::from(key);

        debug!(bucket, key, "fetching object");

        let result = store.get(&path).await?;
        Ok(result.bytes().await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use object_store::memory::InMemory;
    use object_store::PutPayload;

    use super::*;

    async fn seeded_store() -> Arc<dyn ObjectStore> {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        store
            .put(
                &Path::from("daily/feed 2025.json"),
                PutPayload::from_static(br#"[{"sku":"A1"}]"#),
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn fetches_existing_object() {
        let store = seeded_store().await;
        let fetcher = ObjectStoreFetcher::with_factory(move |_| Ok(store.clone()));

        let bytes = fetcher.fetch("catalog", "daily/feed 2025.json").await.unwrap();
        assert_eq!(&bytes[..], br#"[{"sku":"A1"}]"#);
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let store = seeded_store().await;
        let fetcher = ObjectStoreFetcher::with_factory(move |_| Ok(store.clone()));

        let err = fetcher.fetch("catalog", "nope.json").await.unwrap_err();
        assert!(matches!(err, FetchError::NotFound(_)));
    }

    #[tokio::test]
    async fn store_is_built_once_per_bucket() {
        let store = seeded_store().await;
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = builds.clone();
        let fetcher = ObjectStoreFetcher::with_factory(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(store.clone())
        });

        fetcher.fetch("catalog", "daily/feed 2025.json").await.unwrap();
        fetcher.fetch("catalog", "daily/feed 2025.json").await.unwrap();
        fetcher.fetch("archive", "nope.json").await.unwrap_err();
        assert_eq!(builds.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn factory_failure_is_reported() {
        let fetcher = ObjectStoreFetcher::with_factory(|_| {
            Err(object_store::Error::Generic {
                store: "S3",
                source: "bad endpoint".into(),
            })
        });
        let err = fetcher.fetch("catalog", "a.json").await.unwrap_err();
        assert!(matches!(err, FetchError::Other(_)));
    }
}
