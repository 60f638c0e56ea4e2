//! Adapter construction from backend definitions.
//!
//! One [`AdapterFactory`] per [`BackendKind`]. The defaults cover local
//! disk, memory and (with the `s3` feature) S3; hosts add others through
//! [`AdapterFactories::register`].

use depot_storage::{LocalStorage, MemoryStorage, ObjectStorage, StorageError};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::config::expand_tilde;
use crate::definition::BackendDefinition;
use crate::error::{FactoryError, OptionError};
use crate::kind::BackendKind;

/// Builds a live adapter for one definition.
pub trait AdapterFactory: Send + Sync {
    fn create(
        &self,
        definition: &BackendDefinition,
    ) -> Result<Arc<dyn ObjectStorage>, StorageError>;
}

fn option_err(e: OptionError) -> StorageError {
    StorageError::Config(e.to_string())
}

/// Local filesystem under the `root` option.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalAdapterFactory;

impl AdapterFactory for LocalAdapterFactory {
    fn create(
        &self,
        definition: &BackendDefinition,
    ) -> Result<Arc<dyn ObjectStorage>, StorageError> {
        let root = definition.get_str("root").map_err(option_err)?;
        let root =
            expand_tilde(Path::new(root)).map_err(|e| StorageError::Config(e.to_string()))?;

        let storage = if definition.bool_or("create_root", false).map_err(option_err)? {
            LocalStorage::with_created_root(root)?
        } else {
            LocalStorage::new(root)
        };
        Ok(Arc::new(storage))
    }
}

/// Fresh in-memory store per adapter instance.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryAdapterFactory;

impl AdapterFactory for MemoryAdapterFactory {
    fn create(
        &self,
        _definition: &BackendDefinition,
    ) -> Result<Arc<dyn ObjectStorage>, StorageError> {
        Ok(Arc::new(MemoryStorage::new()))
    }
}

/// S3 via `object_store`.
///
/// A `client` option holding an [`S3Storage`](depot_storage::S3Storage) or
/// an `Arc<dyn ObjectStore>` is used as-is; otherwise a client is built
/// from the remaining options.
#[cfg(feature = "s3")]
#[derive(Debug, Default, Clone, Copy)]
pub struct S3AdapterFactory;

#[cfg(feature = "s3")]
impl AdapterFactory for S3AdapterFactory {
    fn create(
        &self,
        definition: &BackendDefinition,
    ) -> Result<Arc<dyn ObjectStorage>, StorageError> {
        use depot_storage::{S3Config, S3Storage};
        use object_store::ObjectStore;

        if let Some(handle) = definition.options().get("client").and_then(|v| v.as_handle()) {
            if let Some(storage) = handle.downcast_ref::<S3Storage>() {
                return Ok(Arc::new(storage.clone()));
            }
            if let Some(store) = handle.downcast_ref::<Arc<dyn ObjectStore>>() {
                return Ok(Arc::new(S3Storage::from_store(store.clone())));
            }
            return Err(StorageError::Config(format!(
                "unsupported S3 client handle: {}",
                handle.type_name()
            )));
        }

        let bucket = definition.get_str("bucket").map_err(option_err)?;
        let mut config = S3Config::new(bucket)
            .with_path_style(
                definition
                    .bool_or("force_path_style", false)
                    .map_err(option_err)?,
            )
            .with_allow_http(definition.bool_or("allow_http", false).map_err(option_err)?);
        if let Some(region) = definition.str_opt("region").map_err(option_err)? {
            config = config.with_region(region);
        }
        if let Some(endpoint) = definition.str_opt("endpoint").map_err(option_err)? {
            config = config.with_endpoint(endpoint);
        }
        if let (Some(key_id), Some(secret)) = (
            definition.str_opt("access_key_id").map_err(option_err)?,
            definition.str_opt("secret_access_key").map_err(option_err)?,
        ) {
            config = config.with_credentials(key_id, secret);
        }

        Ok(Arc::new(S3Storage::new(config)?))
    }
}

/// Factory table keyed by backend kind.
#[derive(Clone)]
pub struct AdapterFactories {
    factories: HashMap<BackendKind, Arc<dyn AdapterFactory>>,
}

impl AdapterFactories {
    /// No factories at all.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Local, memory and, when compiled in, S3.
    pub fn with_defaults() -> Self {
        let mut factories = Self::empty();
        factories.register(BackendKind::Local, LocalAdapterFactory);
        factories.register(BackendKind::Memory, MemoryAdapterFactory);
        #[cfg(feature = "s3")]
        factories.register(BackendKind::S3, S3AdapterFactory);
        factories
    }

    /// Install or replace the factory for a kind.
    pub fn register(&mut self, kind: BackendKind, factory: impl AdapterFactory + 'static) {
        debug!(kind = %kind, "Registered adapter factory");
        self.factories.insert(kind, Arc::new(factory));
    }

    pub fn for_kind(&self, kind: BackendKind) -> Result<Arc<dyn AdapterFactory>, FactoryError> {
        self.factories
            .get(&kind)
            .cloned()
            .ok_or(FactoryError::UnsupportedBackendKind(kind))
    }

    pub fn supports(&self, kind: BackendKind) -> bool {
        self.factories.contains_key(&kind)
    }

    /// Look up the factory and build an adapter in one step.
    pub fn create(
        &self,
        definition: &BackendDefinition,
    ) -> Result<Arc<dyn ObjectStorage>, FactoryError> {
        self.for_kind(definition.kind())?
            .create(definition)
            .map_err(|source| FactoryError::Adapter {
                backend: definition.name().to_string(),
                source,
            })
    }
}

impl Default for AdapterFactories {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for AdapterFactories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.factories.keys().collect();
        kinds.sort();
        f.debug_struct("AdapterFactories")
            .field("kinds", &kinds)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{OptionValue, Options};
    use depot_storage::{Bytes, ObjectPath};

    fn definition(kind: BackendKind, options: &[(&str, OptionValue)]) -> BackendDefinition {
        let options: Options = options
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        BackendDefinition::new("test", kind, options, None).unwrap()
    }

    #[test]
    fn test_defaults_and_unsupported() {
        let factories = AdapterFactories::with_defaults();
        assert!(factories.supports(BackendKind::Local));
        assert!(factories.supports(BackendKind::Memory));
        for kind in [BackendKind::Ftp, BackendKind::Sftp, BackendKind::GridFs] {
            assert!(matches!(
                factories.for_kind(kind),
                Err(FactoryError::UnsupportedBackendKind(k)) if k == kind
            ));
        }
        assert!(!AdapterFactories::empty().supports(BackendKind::Memory));
    }

    #[tokio::test]
    async fn test_local_factory_creates_root() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path().join("files");
        let def = definition(
            BackendKind::Local,
            &[
                ("root", root.to_string_lossy().into_owned().into()),
                ("create_root", true.into()),
            ],
        );

        let adapter = AdapterFactories::with_defaults().create(&def).unwrap();
        assert!(root.is_dir());

        let path = ObjectPath::parse("a.txt").unwrap();
        adapter.write(&path, Bytes::from("hi")).await.unwrap();
        assert!(root.join("a.txt").is_file());
    }

    #[tokio::test]
    async fn test_memory_factory_instances_are_independent() {
        let def = definition(BackendKind::Memory, &[]);
        let factories = AdapterFactories::with_defaults();
        let a = factories.create(&def).unwrap();
        let b = factories.create(&def).unwrap();

        let path = ObjectPath::parse("x").unwrap();
        a.write(&path, Bytes::from("1")).await.unwrap();
        assert!(!b.exists(&path).await.unwrap());
    }

    struct Failing;

    impl AdapterFactory for Failing {
        fn create(&self, _: &BackendDefinition) -> Result<Arc<dyn ObjectStorage>, StorageError> {
            Err(StorageError::Backend("offline".to_string()))
        }
    }

    #[test]
    fn test_register_custom_factory() {
        let mut factories = AdapterFactories::with_defaults();
        factories.register(BackendKind::Ftp, Failing);

        let def = definition(BackendKind::Ftp, &[("host", "ftp.example.com".into())]);
        assert!(matches!(
            factories.create(&def),
            Err(FactoryError::Adapter { ref backend, .. }) if backend == "test"
        ));
    }
}
