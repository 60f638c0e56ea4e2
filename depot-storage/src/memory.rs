//! In-memory storage backend.
//!
//! Objects live in a `BTreeMap` behind a `RwLock`, so listings come out in
//! path order for free. Contents are lost when the last handle is dropped.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, instrument};

use crate::error::{Result, StorageError};
use crate::path::ObjectPath;
use crate::traits::{ObjectMeta, ObjectStorage};

#[derive(Debug, Clone)]
struct MemoryObject {
    data: Bytes,
    last_modified: i64,
}

impl MemoryObject {
    fn meta(&self, path: &ObjectPath) -> ObjectMeta {
        ObjectMeta {
            path: path.clone(),
            size: self.data.len() as u64,
            last_modified: Some(self.last_modified),
            etag: None,
        }
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// In-memory storage backend.
///
/// Clones share the same underlying objects.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    objects: Arc<RwLock<BTreeMap<ObjectPath, MemoryObject>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    #[instrument(skip(self, data), fields(path = %path, size = data.len()))]
    async fn write(&self, path: &ObjectPath, data: Bytes) -> Result<()> {
        debug!("Storing {} bytes in memory", data.len());
        self.objects.write().insert(
            path.clone(),
            MemoryObject {
                data,
                last_modified: now_secs(),
            },
        );
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn read(&self, path: &ObjectPath) -> Result<Bytes> {
        self.objects
            .read()
            .get(path)
            .map(|obj| obj.data.clone())
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn exists(&self, path: &ObjectPath) -> Result<bool> {
        Ok(self.objects.read().contains_key(path))
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn delete(&self, path: &ObjectPath) -> Result<()> {
        self.objects.write().remove(path);
        Ok(())
    }

    async fn list(&self, prefix: &ObjectPath) -> Result<Vec<ObjectMeta>> {
        let objects = self.objects.read();
        Ok(objects
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.as_str().starts_with(prefix.as_str()))
            .filter(|(path, _)| path.starts_with(prefix))
            .map(|(path, obj)| obj.meta(path))
            .collect())
    }

    #[instrument(skip(self), fields(from = %from, to = %to))]
    async fn rename(&self, from: &ObjectPath, to: &ObjectPath) -> Result<()> {
        let mut objects = self.objects.write();
        let obj = objects
            .remove(from)
            .ok_or_else(|| StorageError::NotFound(from.to_string()))?;
        objects.insert(to.clone(), obj);
        Ok(())
    }

    #[instrument(skip(self), fields(from = %from, to = %to))]
    async fn copy(&self, from: &ObjectPath, to: &ObjectPath) -> Result<()> {
        let mut objects = self.objects.write();
        let obj = objects
            .get(from)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(from.to_string()))?;
        objects.insert(
            to.clone(),
            MemoryObject {
                data: obj.data,
                last_modified: now_secs(),
            },
        );
        Ok(())
    }

    async fn head(&self, path: &ObjectPath) -> Result<ObjectMeta> {
        self.objects
            .read()
            .get(path)
            .map(|obj| obj.meta(path))
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> ObjectPath {
        ObjectPath::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let storage = MemoryStorage::new();
        let path = p("a/b.txt");

        storage.write(&path, Bytes::from("hello")).await.unwrap();
        assert_eq!(storage.read(&path).await.unwrap(), Bytes::from("hello"));
        assert_eq!(storage.len(), 1);
    }

    #[tokio::test]
    async fn test_read_not_found() {
        let storage = MemoryStorage::new();
        let err = storage.read(&p("missing")).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let storage = MemoryStorage::new();
        let other = storage.clone();

        storage.write(&p("x"), Bytes::from("1")).await.unwrap();
        assert!(other.exists(&p("x")).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_idempotent() {
        let storage = MemoryStorage::new();
        storage.write(&p("x"), Bytes::from("1")).await.unwrap();
        storage.delete(&p("x")).await.unwrap();
        storage.delete(&p("x")).await.unwrap();
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_list_is_segment_wise_and_sorted() {
        let storage = MemoryStorage::new();
        for name in ["a/c.txt", "a/b.txt", "a/sub/d.txt", "ab/e.txt", "z.txt"] {
            storage.write(&p(name), Bytes::from("x")).await.unwrap();
        }

        let listed: Vec<String> = storage
            .list(&p("a"))
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.path.to_string())
            .collect();
        assert_eq!(listed, vec!["a/b.txt", "a/c.txt", "a/sub/d.txt"]);

        assert_eq!(storage.list(&ObjectPath::root()).await.unwrap().len(), 5);
        assert_eq!(storage.list(&p("z.txt")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rename_and_copy() {
        let storage = MemoryStorage::new();
        storage.write(&p("old"), Bytes::from("data")).await.unwrap();

        storage.rename(&p("old"), &p("new")).await.unwrap();
        assert!(!storage.exists(&p("old")).await.unwrap());

        storage.copy(&p("new"), &p("copy")).await.unwrap();
        assert_eq!(storage.read(&p("copy")).await.unwrap(), Bytes::from("data"));
        assert!(storage.exists(&p("new")).await.unwrap());

        let err = storage.rename(&p("old"), &p("x")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_head() {
        let storage = MemoryStorage::new();
        storage.write(&p("f"), Bytes::from("12345")).await.unwrap();
        let meta = storage.head(&p("f")).await.unwrap();
        assert_eq!(meta.size, 5);
        assert!(meta.last_modified.is_some());
        assert_eq!(storage.backend_name(), "memory");
    }
}
