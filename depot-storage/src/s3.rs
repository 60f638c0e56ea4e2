//! S3 adapter on top of `object_store`.
//!
//! Works against AWS and anything speaking the S3 API (MinIO, Ceph RGW,
//! ...). Object paths are used as keys verbatim: directory prefixes are
//! applied by the resolver before a path ever reaches this adapter.

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as Key;
use object_store::ObjectStore;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::{Result, StorageError};
use crate::path::ObjectPath;
use crate::traits::{ObjectMeta, ObjectStorage};

/// Connection settings for one bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for non-AWS services
    pub endpoint: Option<String>,
    /// Path-style addressing (`endpoint/bucket/key`), needed by most
    /// self-hosted services
    pub force_path_style: bool,
    pub allow_http: bool,
    /// Access key id and secret; the AWS credential chain is used when unset
    pub credentials: Option<(String, String)>,
}

impl S3Config {
    pub const DEFAULT_REGION: &'static str = "us-east-1";

    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: Self::DEFAULT_REGION.to_string(),
            endpoint: None,
            force_path_style: false,
            allow_http: false,
            credentials: None,
        }
    }

    /// Preset for a MinIO-style service at `endpoint`.
    pub fn minio(bucket: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self::new(bucket)
            .with_endpoint(endpoint)
            .with_path_style(true)
            .with_allow_http(true)
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_path_style(mut self, enabled: bool) -> Self {
        self.force_path_style = enabled;
        self
    }

    pub fn with_allow_http(mut self, enabled: bool) -> Self {
        self.allow_http = enabled;
        self
    }

    pub fn with_credentials(mut self, key_id: impl Into<String>, secret: impl Into<String>) -> Self {
        self.credentials = Some((key_id.into(), secret.into()));
        self
    }

    fn build(&self) -> Result<Arc<dyn ObjectStore>> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&self.bucket)
            .with_region(&self.region)
            .with_allow_http(self.allow_http)
            .with_virtual_hosted_style_request(!self.force_path_style);

        if let Some(endpoint) = &self.endpoint {
            builder = builder.with_endpoint(endpoint);
        }
        if let Some((key_id, secret)) = &self.credentials {
            builder = builder
                .with_access_key_id(key_id)
                .with_secret_access_key(secret);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::Config(format!("bucket '{}': {}", self.bucket, e)))?;
        Ok(Arc::new(store))
    }
}

/// Translate `object_store` errors, folding NotFound into the neutral variant.
fn classify(path: &ObjectPath) -> impl FnOnce(object_store::Error) -> StorageError + '_ {
    move |e| match e {
        object_store::Error::NotFound { .. } => StorageError::NotFound(path.to_string()),
        other => StorageError::ObjectStore(other),
    }
}

fn key(path: &ObjectPath) -> Key {
    Key::from(path.as_str())
}

/// Bucket-backed adapter. Cheap to clone.
#[derive(Clone)]
pub struct S3Storage {
    store: Arc<dyn ObjectStore>,
}

impl S3Storage {
    pub fn new(config: S3Config) -> Result<Self> {
        debug!(bucket = %config.bucket, region = %config.region, "building S3 client");
        Ok(Self {
            store: config.build()?,
        })
    }

    /// Wrap an existing store, e.g. `object_store::memory::InMemory` in tests.
    pub fn from_store(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    fn meta(path: ObjectPath, meta: object_store::ObjectMeta) -> ObjectMeta {
        ObjectMeta {
            path,
            size: meta.size as u64,
            last_modified: Some(meta.last_modified.timestamp()),
            etag: meta.e_tag,
        }
    }
}

impl std::fmt::Debug for S3Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "S3Storage({})", self.store)
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    #[instrument(skip(self, data), fields(path = %path, size = data.len()))]
    async fn write(&self, path: &ObjectPath, data: Bytes) -> Result<()> {
        self.store
            .put(&key(path), data.into())
            .await
            .map_err(classify(path))?;
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn read(&self, path: &ObjectPath) -> Result<Bytes> {
        let object = self.store.get(&key(path)).await.map_err(classify(path))?;
        object.bytes().await.map_err(classify(path))
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn exists(&self, path: &ObjectPath) -> Result<bool> {
        match self.head(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn delete(&self, path: &ObjectPath) -> Result<()> {
        match self.store.delete(&key(path)).await.map_err(classify(path)) {
            Err(e) if !e.is_not_found() => Err(e),
            _ => Ok(()),
        }
    }

    #[instrument(skip(self), fields(prefix = %prefix))]
    async fn list(&self, prefix: &ObjectPath) -> Result<Vec<ObjectMeta>> {
        let scope = (!prefix.is_root()).then(|| key(prefix));
        let listed: Vec<object_store::ObjectMeta> = self
            .store
            .list(scope.as_ref())
            .try_collect()
            .await
            .map_err(classify(prefix))?;

        let mut objects: Vec<ObjectMeta> = listed
            .into_iter()
            .filter_map(|meta| {
                let path = ObjectPath::parse(meta.location.as_ref()).ok()?;
                Some(Self::meta(path, meta))
            })
            .collect();

        // object_store lists strictly below a prefix; a prefix that is itself
        // an object still lists that object.
        if objects.is_empty() && !prefix.is_root() {
            if let Ok(meta) = self.head(prefix).await {
                objects.push(meta);
            }
        }

        objects.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(objects)
    }

    #[instrument(skip(self), fields(from = %from, to = %to))]
    async fn rename(&self, from: &ObjectPath, to: &ObjectPath) -> Result<()> {
        if from == to {
            return self.head(from).await.map(|_| ());
        }
        // S3 has no rename
        self.copy(from, to).await?;
        self.store.delete(&key(from)).await.map_err(classify(from))
    }

    #[instrument(skip(self), fields(from = %from, to = %to))]
    async fn copy(&self, from: &ObjectPath, to: &ObjectPath) -> Result<()> {
        // S3 refuses a copy onto itself that changes nothing
        if from == to {
            return self.head(from).await.map(|_| ());
        }
        self.store
            .copy(&key(from), &key(to))
            .await
            .map_err(classify(from))
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn head(&self, path: &ObjectPath) -> Result<ObjectMeta> {
        let meta = self.store.head(&key(path)).await.map_err(classify(path))?;
        Ok(Self::meta(path.clone(), meta))
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    fn p(s: &str) -> ObjectPath {
        ObjectPath::parse(s).unwrap()
    }

    fn bucket() -> S3Storage {
        S3Storage::from_store(Arc::new(InMemory::new()))
    }

    #[test]
    fn test_config_builders() {
        let aws = S3Config::new("reports").with_region("eu-west-1");
        assert_eq!(aws.region, "eu-west-1");
        assert_eq!(aws.endpoint, None);
        assert!(!aws.force_path_style && !aws.allow_http);

        let minio = S3Config::minio("local", "http://localhost:9000")
            .with_credentials("minioadmin", "secret");
        assert_eq!(minio.region, S3Config::DEFAULT_REGION);
        assert!(minio.force_path_style && minio.allow_http);
        assert_eq!(
            minio.credentials,
            Some(("minioadmin".to_string(), "secret".to_string()))
        );
    }

    #[test]
    fn test_new_builds_client_without_network() {
        let storage = S3Storage::new(
            S3Config::minio("b", "http://127.0.0.1:9").with_credentials("id", "secret"),
        )
        .unwrap();
        assert_eq!(storage.backend_name(), "s3");
    }

    #[tokio::test]
    async fn test_object_lifecycle() {
        let storage = bucket();
        let original = p("users/42/report.pdf");
        let archived = p("archive/report.pdf");

        storage.write(&original, Bytes::from_static(b"pdf")).await.unwrap();
        assert!(storage.exists(&original).await.unwrap());
        assert_eq!(storage.head(&original).await.unwrap().size, 3);

        storage.rename(&original, &archived).await.unwrap();
        assert!(!storage.exists(&original).await.unwrap());
        assert_eq!(storage.read_vec(&archived).await.unwrap(), b"pdf");

        storage.delete(&archived).await.unwrap();
        storage.delete(&archived).await.unwrap();
        assert!(storage.read(&archived).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list_scopes_and_single_object() {
        let storage = bucket();
        for name in ["a/2", "a/1", "a/sub/3", "ab/4"] {
            storage.write(&p(name), Bytes::from_static(b"x")).await.unwrap();
        }

        let listed = storage.list(&p("a")).await.unwrap();
        let names: Vec<_> = listed.iter().map(|m| m.path.as_str()).collect();
        assert_eq!(names, ["a/1", "a/2", "a/sub/3"]);

        assert_eq!(storage.list(&p("a/1")).await.unwrap().len(), 1);
        assert_eq!(storage.list(&ObjectPath::root()).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_rename_onto_itself_keeps_object() {
        let storage = bucket();
        storage.write(&p("a.txt"), Bytes::from_static(b"precious")).await.unwrap();

        storage.rename(&p("a.txt"), &p("./a.txt")).await.unwrap();
        storage.copy(&p("a.txt"), &p("a.txt")).await.unwrap();
        assert_eq!(storage.read_vec(&p("a.txt")).await.unwrap(), b"precious");

        assert!(storage
            .rename(&p("gone"), &p("gone"))
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_missing_source() {
        let storage = bucket();
        assert!(storage
            .copy(&p("missing"), &p("dest"))
            .await
            .unwrap_err()
            .is_not_found());
        assert!(storage
            .rename(&p("missing"), &p("dest"))
            .await
            .unwrap_err()
            .is_not_found());
    }
}
