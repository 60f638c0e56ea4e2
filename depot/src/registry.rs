//! The set of configured backends, keyed by name.
//!
//! A [`BackendRegistry`] is filled once at startup and never mutated after
//! it is shared. Hot reloading goes through [`SharedRegistry`]: build a new
//! registry, then swap the reference.

use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

use crate::config::BackendConfig;
use crate::definition::BackendDefinition;
use crate::error::{ConfigError, ResolutionError};

#[derive(Debug, Clone, Default)]
pub struct BackendRegistry {
    backends: IndexMap<String, Arc<BackendDefinition>>,
}

impl BackendRegistry {
    /// Empty registry; fill it with [`register`](Self::register).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from already-parsed configuration.
    ///
    /// Fails on the first invalid entry; no partially built registry is
    /// ever returned.
    pub fn from_config<'a, I>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (&'a String, &'a BackendConfig)>,
    {
        let mut registry = Self::new();
        for (name, config) in entries {
            registry.register(config.to_definition(name)?)?;
        }
        info!(backends = registry.len(), "Backend registry built");
        Ok(registry)
    }

    pub fn from_definitions<I>(definitions: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = BackendDefinition>,
    {
        let mut registry = Self::new();
        for definition in definitions {
            registry.register(definition)?;
        }
        Ok(registry)
    }

    /// Add a definition. Names are never overwritten.
    pub fn register(&mut self, definition: BackendDefinition) -> Result<(), ConfigError> {
        if self.backends.contains_key(definition.name()) {
            return Err(ConfigError::DuplicateBackendName(
                definition.name().to_string(),
            ));
        }
        self.backends
            .insert(definition.name().to_string(), Arc::new(definition));
        Ok(())
    }

    /// Definition registered under `name`, matched exactly.
    ///
    /// # Errors
    ///
    /// `UnknownBackend` when no such backend is configured.
    pub fn lookup(&self, name: &str) -> Result<Arc<BackendDefinition>, ResolutionError> {
        self.backends
            .get(name)
            .cloned()
            .ok_or_else(|| ResolutionError::UnknownBackend(name.to_string()))
    }

    /// Whether `name` is registered.
    pub fn exists(&self, name: &str) -> bool {
        self.backends.contains_key(name)
    }

    /// Backend names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.backends.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<BackendDefinition>> {
        self.backends.values()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

/// Swappable handle to the current registry.
///
/// Readers take a cheap [`snapshot`](Self::snapshot) and keep using it for
/// the rest of their call, even if a swap happens meanwhile.
#[derive(Debug, Clone)]
pub struct SharedRegistry {
    current: Arc<RwLock<Arc<BackendRegistry>>>,
}

impl SharedRegistry {
    pub fn new(registry: BackendRegistry) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(registry))),
        }
    }

    pub fn snapshot(&self) -> Arc<BackendRegistry> {
        self.current.read().clone()
    }

    /// Replace the registry, returning the previous one.
    pub fn swap(&self, registry: BackendRegistry) -> Arc<BackendRegistry> {
        let next = Arc::new(registry);
        info!(backends = next.len(), "Backend registry swapped");
        std::mem::replace(&mut *self.current.write(), next)
    }
}

impl From<BackendRegistry> for SharedRegistry {
    fn from(registry: BackendRegistry) -> Self {
        Self::new(registry)
    }
}
