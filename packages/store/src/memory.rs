#![allow(clippy::module_name_repetitions)]
//! In-memory [`ObjectStore`] for tests.
//!
//! Records every write (body and headers) so assertions can inspect what
//! would have reached the bucket. Keys can be preloaded to simulate a
//! remote that already holds objects.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::{ObjectStore, StoreError, UploadHeaders};

/// An object as written to the [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Raw body bytes.
    pub body: Vec<u8>,
    /// Headers the object was written with.
    pub headers: UploadHeaders,
}

/// In-memory object store keyed by object key.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store preloaded with the given keys (empty bodies,
    /// placeholder headers), simulating objects that already exist
    /// remotely.
    #[must_use]
    pub fn with_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        {
            let mut objects = store.lock();
            for key in keys {
                objects.insert(
                    key.into(),
                    StoredObject {
                        body: Vec::new(),
                        headers: UploadHeaders::long_lived("application/octet-stream", false),
                    },
                );
            }
        }
        store
    }

    /// All keys currently present, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Returns a copy of the object at `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.lock().get(key).cloned()
    }

    /// Number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the store holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, StoredObject>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .lock()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        headers: &UploadHeaders,
    ) -> Result<(), StoreError> {
        self.lock().insert(
            key.to_string(),
            StoredObject {
                body,
                headers: headers.clone(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_only_matching_prefix() {
        let store = MemoryStore::with_keys(["cdn/a.css", "cdn/b.js", "other/c.png"]);
        let keys = store.list_keys("cdn/").await.unwrap();
        assert_eq!(keys, vec!["cdn/a.css", "cdn/b.js"]);
    }

    #[tokio::test]
    async fn empty_prefix_lists_everything() {
        let store = MemoryStore::with_keys(["x", "y"]);
        assert_eq!(store.list_keys("").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn put_records_body_and_headers() {
        let store = MemoryStore::new();
        let headers = UploadHeaders::long_lived("text/css", true);
        store
            .put_object("k/app.css", b"body{}".to_vec(), &headers)
            .await
            .unwrap();

        let stored = store.get("k/app.css").unwrap();
        assert_eq!(stored.body, b"body{}");
        assert_eq!(stored.headers.content_encoding.as_deref(), Some("gzip"));
    }
}
