//! In-memory storage backend.
//!
//! Keeps every object in a `HashMap`; used by service and resolver tests so
//! they can assert on exact key layout without touching the filesystem.

use crate::traits::{ObjectStorage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Storage implementation that keeps objects in memory
#[derive(Clone, Default)]
pub struct MemoryStorage {
    objects: Arc<Mutex<HashMap<String, Bytes>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if an object exists (for test assertions)
    pub fn has_object(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    /// Get object data (for test assertions)
    pub fn object(&self, key: &str) -> Option<Bytes> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    /// Number of stored objects
    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn put(&self, key: &str, data: Bytes, _content_type: &str) -> StorageResult<()> {
        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn copy(&self, from_key: &str, to_key: &str) -> StorageResult<()> {
        let mut objects = self.objects.lock().unwrap();
        let data = objects
            .get(from_key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(from_key.to_string()))?;
        objects.insert(to_key.to_string(), data);
        Ok(())
    }

    async fn list_by_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage_round_trip() {
        let storage = MemoryStorage::new();
        let data = Bytes::from_static(b"pixels");

        storage.put("a/b.jpg", data.clone(), "image/jpeg").await.unwrap();
        assert_eq!(storage.get("a/b.jpg").await.unwrap(), data);

        storage.delete("a/b.jpg").await.unwrap();
        assert!(matches!(
            storage.get("a/b.jpg").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_storage_copy_and_list() {
        let storage = MemoryStorage::new();
        storage
            .put("temp_faces/1_0.jpg", Bytes::from_static(b"face"), "image/jpeg")
            .await
            .unwrap();

        storage
            .copy("temp_faces/1_0.jpg", "faces/key.jpg")
            .await
            .unwrap();
        assert!(storage.has_object("faces/key.jpg"));

        let keys = storage.list_by_prefix("faces/").await.unwrap();
        assert_eq!(keys, vec!["faces/key.jpg"]);
    }

    #[tokio::test]
    async fn test_memory_storage_delete_missing_is_ok() {
        let storage = MemoryStorage::new();
        assert!(storage.delete("nope.jpg").await.is_ok());
    }
}
