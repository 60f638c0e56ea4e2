//! Facade tying registry, resolver and adapters together.
//!
//! Every operation takes an identifier (`backend:path`), resolves it against
//! the current registry snapshot and dispatches to the backend's adapter.
//! Paths in returned metadata are relative to the backend as the caller sees
//! it, i.e. without the backend's directory prefix.

use depot_storage::{Bytes, ListOptions, ObjectMeta, ObjectStorage, StorageError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::config::DepotConfig;
use crate::definition::BackendDefinition;
use crate::value::OptionValue;
use crate::error::{ConfigError, EngineError};
use crate::factory::AdapterFactories;
use crate::registry::{BackendRegistry, SharedRegistry};
use crate::resolver::{to_caller_path, ResolvedHandle, UriResolver};

struct CachedAdapter {
    definition: Arc<BackendDefinition>,
    adapter: Arc<dyn ObjectStorage>,
}

/// A resolved identifier together with the adapter serving it.
struct Target {
    handle: ResolvedHandle,
    adapter: Arc<dyn ObjectStorage>,
}

impl Target {
    fn backend(&self) -> &str {
        self.handle.backend_name()
    }

    fn storage_err(&self, source: StorageError) -> EngineError {
        EngineError::Storage {
            backend: self.backend().to_string(),
            source,
        }
    }

    fn to_caller_meta(&self, mut meta: ObjectMeta) -> ObjectMeta {
        meta.path = to_caller_path(self.handle.definition(), &meta.path);
        meta
    }

    /// Whether both targets address one stored object, either through the
    /// same backend or through two backends sharing a location.
    fn same_object(&self, other: &Target) -> bool {
        self.handle.normalized_path() == other.handle.normalized_path()
            && (self.backend() == other.backend()
                || shared_location(self.handle.definition(), other.handle.definition()))
    }

    /// Succeeds when the object exists, leaving it untouched.
    async fn ensure_exists(&self) -> Result<(), EngineError> {
        self.adapter
            .head(self.handle.normalized_path())
            .await
            .map(|_| ())
            .map_err(|e| self.storage_err(e))
    }
}

fn shared_location(a: &BackendDefinition, b: &BackendDefinition) -> bool {
    let keys = a.kind().location_options();
    a.kind() == b.kind()
        && !keys.is_empty()
        && keys.iter().all(|key| {
            match (a.options().get(key), b.options().get(key)) {
                // roots compare as paths, so `/srv/data/` equals `/srv/data`
                (Some(OptionValue::String(x)), Some(OptionValue::String(y))) => {
                    std::path::Path::new(x) == std::path::Path::new(y)
                }
                (x, y) => x == y,
            }
        })
}

/// Entry point for all object operations on identifiers.
///
/// Cheap to share behind an `Arc`; every call resolves against the registry
/// snapshot current at that moment.
pub struct StorageEngine {
    registry: SharedRegistry,
    factories: AdapterFactories,
    adapters: Mutex<HashMap<String, CachedAdapter>>,
}

impl StorageEngine {
    pub fn new(registry: impl Into<SharedRegistry>, factories: AdapterFactories) -> Self {
        Self {
            registry: registry.into(),
            factories,
            adapters: Mutex::new(HashMap::new()),
        }
    }

    /// Engine with the default adapter factories.
    pub fn with_defaults(registry: impl Into<SharedRegistry>) -> Self {
        Self::new(registry, AdapterFactories::with_defaults())
    }

    pub fn from_config(config: &DepotConfig) -> Result<Self, ConfigError> {
        Ok(Self::with_defaults(config.build_registry()?))
    }

    /// Current registry snapshot.
    pub fn registry(&self) -> Arc<BackendRegistry> {
        self.registry.snapshot()
    }

    pub fn shared_registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Replace the registry. Cached adapters of backends that disappeared
    /// are dropped; the rest are revalidated lazily on next use.
    pub fn swap_registry(&self, registry: BackendRegistry) -> Arc<BackendRegistry> {
        let previous = self.registry.swap(registry);
        let current = self.registry.snapshot();
        self.adapters.lock().retain(|name, _| current.exists(name));
        previous
    }

    /// Backend names in registration order.
    pub fn backend_names(&self) -> Vec<String> {
        self.registry().names().map(String::from).collect()
    }

    pub fn resolve(&self, identifier: &str) -> Result<ResolvedHandle, EngineError> {
        Ok(UriResolver::new(self.registry()).resolve(identifier)?)
    }

    /// Adapter for a definition, reused while the definition is unchanged.
    pub fn adapter_for(
        &self,
        definition: &Arc<BackendDefinition>,
    ) -> Result<Arc<dyn ObjectStorage>, EngineError> {
        let mut adapters = self.adapters.lock();
        if let Some(cached) = adapters.get(definition.name()) {
            if Arc::ptr_eq(&cached.definition, definition) || *cached.definition == **definition {
                return Ok(cached.adapter.clone());
            }
        }

        let adapter = self.factories.create(definition)?;
        debug!(
            backend = definition.name(),
            kind = %definition.kind(),
            "Created adapter"
        );

        // A caller holding a pre-swap snapshot must not cache an adapter the
        // current registry no longer describes.
        let current = self.registry.snapshot().lookup(definition.name()).ok();
        if !current.is_some_and(|current| *current == **definition) {
            return Ok(adapter);
        }
        adapters.insert(
            definition.name().to_string(),
            CachedAdapter {
                definition: definition.clone(),
                adapter: adapter.clone(),
            },
        );
        Ok(adapter)
    }

    fn target(&self, identifier: &str) -> Result<Target, EngineError> {
        let handle = self.resolve(identifier)?;
        let adapter = self.adapter_for(handle.definition())?;
        Ok(Target { handle, adapter })
    }

    /// Full contents of the object behind `identifier`.
    ///
    /// # Errors
    ///
    /// Resolution failures, or a storage error wrapping `NotFound` when the
    /// object is missing.
    #[instrument(skip(self))]
    pub async fn read(&self, identifier: &str) -> Result<Bytes, EngineError> {
        let target = self.target(identifier)?;
        target
            .adapter
            .read(target.handle.normalized_path())
            .await
            .map_err(|e| target.storage_err(e))
    }

    /// Store `data` under `identifier`, replacing any existing object.
    #[instrument(skip(self, data))]
    pub async fn write(
        &self,
        identifier: &str,
        data: impl Into<Bytes>,
    ) -> Result<(), EngineError> {
        let target = self.target(identifier)?;
        target
            .adapter
            .write(target.handle.normalized_path(), data.into())
            .await
            .map_err(|e| target.storage_err(e))
    }

    /// Idempotent: deleting a missing object succeeds.
    #[instrument(skip(self))]
    pub async fn delete(&self, identifier: &str) -> Result<(), EngineError> {
        let target = self.target(identifier)?;
        target
            .adapter
            .delete(target.handle.normalized_path())
            .await
            .map_err(|e| target.storage_err(e))
    }

    /// `true` only for objects, not for directories or prefixes.
    #[instrument(skip(self))]
    pub async fn exists(&self, identifier: &str) -> Result<bool, EngineError> {
        let target = self.target(identifier)?;
        target
            .adapter
            .exists(target.handle.normalized_path())
            .await
            .map_err(|e| target.storage_err(e))
    }

    /// Metadata without reading the contents.
    #[instrument(skip(self))]
    pub async fn head(&self, identifier: &str) -> Result<ObjectMeta, EngineError> {
        let target = self.target(identifier)?;
        let meta = target
            .adapter
            .head(target.handle.normalized_path())
            .await
            .map_err(|e| target.storage_err(e))?;
        Ok(target.to_caller_meta(meta))
    }

    /// Objects under the identifier's path, sorted by path.
    pub async fn list(&self, identifier: &str) -> Result<Vec<ObjectMeta>, EngineError> {
        self.list_with_options(identifier, ListOptions::default())
            .await
    }

    #[instrument(skip(self))]
    pub async fn list_with_options(
        &self,
        identifier: &str,
        options: ListOptions,
    ) -> Result<Vec<ObjectMeta>, EngineError> {
        let target = self.target(identifier)?;
        let objects = target
            .adapter
            .list_with_options(target.handle.normalized_path(), options)
            .await
            .map_err(|e| target.storage_err(e))?;
        Ok(objects
            .into_iter()
            .map(|meta| target.to_caller_meta(meta))
            .collect())
    }

    /// Copy an object, across backends if needed. Copying an object onto
    /// itself only checks that it exists.
    #[instrument(skip(self))]
    pub async fn copy(&self, from: &str, to: &str) -> Result<(), EngineError> {
        let source = self.target(from)?;
        let dest = self.target(to)?;

        if source.same_object(&dest) {
            debug!("Source and destination are the same object");
            return source.ensure_exists().await;
        }

        if Arc::ptr_eq(&source.adapter, &dest.adapter) {
            return source
                .adapter
                .copy(source.handle.normalized_path(), dest.handle.normalized_path())
                .await
                .map_err(|e| source.storage_err(e));
        }

        transfer(&source, &dest).await
    }

    /// Move an object, across backends if needed. Moving an object onto
    /// itself, including through another backend sharing its location, only
    /// checks that it exists.
    #[instrument(skip(self))]
    pub async fn move_object(&self, from: &str, to: &str) -> Result<(), EngineError> {
        let source = self.target(from)?;
        let dest = self.target(to)?;

        if source.same_object(&dest) {
            debug!("Source and destination are the same object");
            return source.ensure_exists().await;
        }

        if Arc::ptr_eq(&source.adapter, &dest.adapter) {
            return source
                .adapter
                .rename(source.handle.normalized_path(), dest.handle.normalized_path())
                .await
                .map_err(|e| source.storage_err(e));
        }

        transfer(&source, &dest).await?;
        source
            .adapter
            .delete(source.handle.normalized_path())
            .await
            .map_err(|e| source.storage_err(e))
    }
}

/// Read from one adapter, write to another.
async fn transfer(source: &Target, dest: &Target) -> Result<(), EngineError> {
    debug!(
        from = source.backend(),
        to = dest.backend(),
        "Cross-backend transfer"
    );
    let data = source
        .adapter
        .read(source.handle.normalized_path())
        .await
        .map_err(|e| source.storage_err(e))?;
    dest.adapter
        .write(dest.handle.normalized_path(), data)
        .await
        .map_err(|e| dest.storage_err(e))
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("backends", &self.backend_names())
            .field("factories", &self.factories)
            .finish()
    }
}
