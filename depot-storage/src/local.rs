//! Disk-backed adapter.
//!
//! Each object is one regular file below the root, e.g. `users/42/report.pdf`
//! lives at `<root>/users/42/report.pdf`. Directories are implicit and never
//! reported as objects.

use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tokio::fs;
use tracing::{debug, instrument};

use crate::error::{Result, StorageError};
use crate::path::ObjectPath;
use crate::traits::{ObjectMeta, ObjectStorage};

/// Map `io::ErrorKind::NotFound` onto the backend-neutral variant.
fn not_found_as(path: &ObjectPath) -> impl FnOnce(io::Error) -> StorageError + '_ {
    move |e| match e.kind() {
        io::ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
        _ => StorageError::Io(e),
    }
}

fn object_meta(path: ObjectPath, metadata: &std::fs::Metadata) -> ObjectMeta {
    let last_modified = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64);
    ObjectMeta {
        path,
        size: metadata.len(),
        last_modified,
        etag: None,
    }
}

#[derive(Debug, Clone, Copy)]
enum Relocate {
    Rename,
    Copy,
}

/// Files under a root directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// The root does not need to exist yet; it is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Like [`new`](Self::new) but creates the root immediately.
    pub fn with_created_root(root: impl Into<PathBuf>) -> Result<Self> {
        let storage = Self::new(root);
        std::fs::create_dir_all(&storage.root)?;
        Ok(storage)
    }

    pub fn base_path(&self) -> &Path {
        &self.root
    }

    fn file_path(&self, path: &ObjectPath) -> PathBuf {
        path.to_path_buf(&self.root)
    }

    /// Inverse of `file_path`. `None` for names that are not valid objects.
    fn object_path(&self, file: &Path) -> Option<ObjectPath> {
        let relative = file.strip_prefix(&self.root).ok()?;
        let segments = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()?;
        ObjectPath::parse(&segments.join("/")).ok()
    }

    async fn create_parent_dirs(file: &Path) -> Result<()> {
        match file.parent() {
            Some(dir) => Ok(fs::create_dir_all(dir).await?),
            None => Ok(()),
        }
    }

    async fn relocate(&self, from: &ObjectPath, to: &ObjectPath, mode: Relocate) -> Result<()> {
        let source = self.file_path(from);
        if !fs::metadata(&source)
            .await
            .map_err(not_found_as(from))?
            .is_file()
        {
            return Err(StorageError::NotFound(from.to_string()));
        }
        // fs::copy would truncate the source before reading it
        if from == to {
            return Ok(());
        }

        let target = self.file_path(to);
        Self::create_parent_dirs(&target).await?;
        debug!(?mode, source = ?source, target = ?target, "relocating file");
        match mode {
            Relocate::Rename => fs::rename(&source, &target).await?,
            Relocate::Copy => {
                fs::copy(&source, &target).await?;
            }
        }
        Ok(())
    }

    /// Walk every regular file below `dir` without recursion.
    async fn walk(&self, dir: PathBuf) -> Result<Vec<ObjectMeta>> {
        let mut found = Vec::new();
        let mut stack = vec![dir];

        while let Some(current) = stack.pop() {
            let mut entries = fs::read_dir(&current).await?;
            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    stack.push(entry.path());
                    continue;
                }
                if !file_type.is_file() {
                    continue;
                }
                let Some(object) = self.object_path(&entry.path()) else {
                    debug!(file = ?entry.path(), "skipping file with unaddressable name");
                    continue;
                };
                found.push(object_meta(object, &entry.metadata().await?));
            }
        }

        found.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(found)
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    #[instrument(skip(self, data), fields(path = %path, size = data.len()))]
    async fn write(&self, path: &ObjectPath, data: Bytes) -> Result<()> {
        if path.is_root() {
            return Err(StorageError::Backend(
                "cannot write to the backend root".to_string(),
            ));
        }
        let file = self.file_path(path);
        Self::create_parent_dirs(&file).await?;
        fs::write(&file, &data).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn read(&self, path: &ObjectPath) -> Result<Bytes> {
        let data = fs::read(self.file_path(path))
            .await
            .map_err(not_found_as(path))?;
        Ok(Bytes::from(data))
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn exists(&self, path: &ObjectPath) -> Result<bool> {
        match fs::metadata(self.file_path(path)).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn delete(&self, path: &ObjectPath) -> Result<()> {
        match fs::remove_file(self.file_path(path)).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    #[instrument(skip(self), fields(prefix = %prefix))]
    async fn list(&self, prefix: &ObjectPath) -> Result<Vec<ObjectMeta>> {
        let start = self.file_path(prefix);
        let metadata = match fs::metadata(&start).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if metadata.is_file() {
            return Ok(vec![object_meta(prefix.clone(), &metadata)]);
        }
        self.walk(start).await
    }

    #[instrument(skip(self), fields(from = %from, to = %to))]
    async fn rename(&self, from: &ObjectPath, to: &ObjectPath) -> Result<()> {
        self.relocate(from, to, Relocate::Rename).await
    }

    #[instrument(skip(self), fields(from = %from, to = %to))]
    async fn copy(&self, from: &ObjectPath, to: &ObjectPath) -> Result<()> {
        self.relocate(from, to, Relocate::Copy).await
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn head(&self, path: &ObjectPath) -> Result<ObjectMeta> {
        let metadata = fs::metadata(self.file_path(path))
            .await
            .map_err(not_found_as(path))?;
        if !metadata.is_file() {
            return Err(StorageError::NotFound(path.to_string()));
        }
        Ok(object_meta(path.clone(), &metadata))
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}
