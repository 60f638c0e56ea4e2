//! The adapter contract.
//!
//! Adapters only ever receive [`ObjectPath`]s that already passed validation
//! and carry any backend directory prefix. They never see identifiers.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::path::ObjectPath;

/// What an adapter knows about one stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Path of the object relative to the adapter root
    pub path: ObjectPath,
    /// Size in bytes
    pub size: u64,
    /// Seconds since the Unix epoch, when the backend reports it
    pub last_modified: Option<i64>,
    /// Entity tag, for backends that compute one
    pub etag: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Keep at most this many entries, after sorting
    pub limit: Option<usize>,
}

/// Byte-level operations every backend adapter provides.
///
/// One instance serves every request resolved to its backend, hence the
/// `Send + Sync` bound. Missing objects surface as
/// [`StorageError::NotFound`](crate::StorageError::NotFound) whatever the
/// backend.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `data` at `path`, replacing any previous object. Intermediate
    /// directories are created where the backend has them.
    async fn write(&self, path: &ObjectPath, data: Bytes) -> Result<()>;

    async fn write_bytes(&self, path: &ObjectPath, data: &[u8]) -> Result<()> {
        self.write(path, Bytes::copy_from_slice(data)).await
    }

    /// Full contents of the object.
    ///
    /// # Errors
    ///
    /// `StorageError::NotFound` if nothing is stored at `path`.
    async fn read(&self, path: &ObjectPath) -> Result<Bytes>;

    async fn read_vec(&self, path: &ObjectPath) -> Result<Vec<u8>> {
        self.read(path).await.map(|data| data.to_vec())
    }

    /// `true` only for objects; directories and prefixes do not count.
    async fn exists(&self, path: &ObjectPath) -> Result<bool>;

    /// Idempotent: removing a missing object succeeds.
    async fn delete(&self, path: &ObjectPath) -> Result<()>;

    /// Objects at or below `prefix`, sorted by path.
    ///
    /// Matching is per segment, so `docs` covers `docs/a` but not `docsx/a`.
    /// A prefix naming an object yields that object alone.
    async fn list(&self, prefix: &ObjectPath) -> Result<Vec<ObjectMeta>>;

    async fn list_with_options(
        &self,
        prefix: &ObjectPath,
        options: ListOptions,
    ) -> Result<Vec<ObjectMeta>> {
        let mut found = self.list(prefix).await?;
        if let Some(limit) = options.limit {
            found.truncate(limit);
        }
        Ok(found)
    }

    /// Move an object. Atomic only where the backend offers it. Moving an
    /// object onto itself leaves it untouched.
    ///
    /// # Errors
    ///
    /// `StorageError::NotFound` if `from` does not exist.
    async fn rename(&self, from: &ObjectPath, to: &ObjectPath) -> Result<()>;

    /// Duplicate an object. The default round-trips through memory.
    ///
    /// # Errors
    ///
    /// `StorageError::NotFound` if `from` does not exist.
    async fn copy(&self, from: &ObjectPath, to: &ObjectPath) -> Result<()> {
        let data = self.read(from).await?;
        self.write(to, data).await
    }

    /// Metadata of one object.
    ///
    /// # Errors
    ///
    /// `StorageError::NotFound` for missing objects and for directories.
    async fn head(&self, path: &ObjectPath) -> Result<ObjectMeta>;

    /// Remove everything [`list`](Self::list) returns for `prefix`, returning
    /// how many objects went away.
    async fn delete_prefix(&self, prefix: &ObjectPath) -> Result<usize> {
        let doomed = self.list(prefix).await?;
        for meta in &doomed {
            self.delete(&meta.path).await?;
        }
        Ok(doomed.len())
    }

    /// Short adapter label used in logs.
    fn backend_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStorage;

    fn p(s: &str) -> ObjectPath {
        ObjectPath::parse(s).unwrap()
    }

    async fn seeded(names: &[&str]) -> MemoryStorage {
        let storage = MemoryStorage::new();
        for name in names {
            storage.write_bytes(&p(name), name.as_bytes()).await.unwrap();
        }
        storage
    }

    #[tokio::test]
    async fn test_slice_helpers() {
        let storage = seeded(&["blob"]).await;
        assert_eq!(storage.read_vec(&p("blob")).await.unwrap(), b"blob");
    }

    #[tokio::test]
    async fn test_limit_applies_after_sorting() {
        let storage = seeded(&["q/3", "q/1", "q/2"]).await;

        let first_two = storage
            .list_with_options(&p("q"), ListOptions { limit: Some(2) })
            .await
            .unwrap();
        let names: Vec<_> = first_two.iter().map(|m| m.path.as_str()).collect();
        assert_eq!(names, ["q/1", "q/2"]);

        let unlimited = storage
            .list_with_options(&p("q"), ListOptions::default())
            .await
            .unwrap();
        assert_eq!(unlimited.len(), 3);
    }

    #[tokio::test]
    async fn test_delete_prefix_leaves_siblings() {
        let storage = seeded(&["tmp/a", "tmp/b/c", "tmpfile", "keep/a"]).await;

        assert_eq!(storage.delete_prefix(&p("tmp")).await.unwrap(), 2);

        let left: Vec<_> = storage
            .list(&ObjectPath::root())
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.path.to_string())
            .collect();
        assert_eq!(left, ["keep/a", "tmpfile"]);
    }
}
