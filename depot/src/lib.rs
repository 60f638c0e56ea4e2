//! Unified addressing over heterogeneous storage backends.
//!
//! Backends are declared by name in configuration, validated against a
//! per-kind option schema, and addressed with identifiers of the form
//! `<backend>:<path>`:
//!
//! ```
//! use depot::{BackendRegistry, DepotConfig, UriResolver};
//! use std::sync::Arc;
//!
//! let config = DepotConfig::from_toml_str(r#"
//!     [backends.docs]
//!     kind = "s3"
//!     directory = "users/42/"
//!     [backends.docs.options]
//!     bucket = "company-docs"
//! "#).unwrap();
//!
//! let registry = Arc::new(config.build_registry().unwrap());
//! let handle = UriResolver::new(registry).resolve("docs:report.pdf").unwrap();
//! assert_eq!(handle.normalized_path().as_str(), "users/42/report.pdf");
//! ```
//!
//! [`StorageEngine`] builds on the resolver and dispatches byte-level
//! operations to the adapters in `depot-storage`.
//!
//! # Features
//!
//! - `s3`: S3 adapter factory via `object_store`

pub mod config;
pub mod definition;
pub mod engine;
pub mod error;
pub mod factory;
pub mod kind;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod uri;
pub mod value;

pub use config::{expand_tilde, BackendConfig, DepotConfig, LoggingConfig};
pub use definition::BackendDefinition;
pub use engine::StorageEngine;
pub use error::{
    ConfigError, EngineError, FactoryError, OptionError, ResolutionError, SchemaError, UriError,
};
pub use factory::{AdapterFactories, AdapterFactory, LocalAdapterFactory, MemoryAdapterFactory};
pub use kind::{BackendKind, UnknownKind};
pub use registry::{BackendRegistry, SharedRegistry};
pub use resolver::{ResolvedHandle, UriResolver};
pub use schema::{OptionSchema, OptionType, ValidatedOptions};
pub use uri::{ParsedUri, SEPARATOR};
pub use value::{OpaqueHandle, OptionValue, Options};

#[cfg(feature = "s3")]
pub use factory::S3AdapterFactory;

// Re-export the storage layer for adapter authors
pub use depot_storage::{
    Bytes, ListOptions, ObjectMeta, ObjectPath, ObjectStorage, PathError, StorageError,
};
