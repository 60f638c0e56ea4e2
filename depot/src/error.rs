//! Error types for configuration, resolution and the storage engine.
//!
//! Configuration errors only happen while a registry is being built and
//! should abort startup. Everything raised per call (`ResolutionError`,
//! `EngineError`) is recoverable by the caller.

use depot_storage::{PathError, StorageError};
use std::path::PathBuf;
use thiserror::Error;

use crate::kind::BackendKind;
use crate::schema::OptionType;

/// Option mapping does not satisfy a backend kind's schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("missing required option '{0}'")]
    MissingRequiredOption(String),

    #[error("unknown option '{0}'")]
    UnknownOption(String),

    #[error("option '{name}' must be {expected}, got {actual}")]
    TypeMismatch {
        name: String,
        expected: OptionType,
        actual: &'static str,
    },
}

/// Invalid backend configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Backend '{backend}': {source}")]
    InvalidOptions {
        backend: String,
        #[source]
        source: SchemaError,
    },

    #[error("Backend '{backend}': unknown backend kind '{kind}'")]
    UnknownBackendKind { backend: String, kind: String },

    #[error("Duplicate backend name: {0}")]
    DuplicateBackendName(String),

    #[error("Invalid backend name {name:?}: {reason}")]
    InvalidBackendName { name: String, reason: &'static str },

    #[error("Backend '{backend}': invalid directory: {source}")]
    InvalidDirectory {
        backend: String,
        #[source]
        source: PathError,
    },

    #[error("Failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write config {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Cannot determine home directory")]
    NoHomeDir,
}

impl ConfigError {
    /// The schema violation behind this error, if any.
    pub fn schema_error(&self) -> Option<&SchemaError> {
        match self {
            ConfigError::InvalidOptions { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A backend option could not be read.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OptionError {
    #[error("Backend '{backend}' has no option '{option}'")]
    OptionNotFound { backend: String, option: String },

    #[error("Backend '{backend}': option '{option}' is {actual}, expected {expected}")]
    WrongType {
        backend: String,
        option: String,
        expected: OptionType,
        actual: &'static str,
    },
}

/// Identifier could not be split into server name and path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UriError {
    #[error("Malformed identifier {identifier:?}: {reason}")]
    MalformedIdentifier {
        identifier: String,
        reason: &'static str,
    },
}

/// Failure to turn an identifier into a backend + path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("Bad identifier: {0}")]
    BadIdentifier(#[from] UriError),

    #[error("Unknown backend: {0}")]
    UnknownBackend(String),

    #[error("Invalid path for backend '{backend}': {source}")]
    InvalidPath {
        backend: String,
        #[source]
        source: PathError,
    },
}

impl ResolutionError {
    /// Path tried to climb above the backend root.
    pub fn is_traversal(&self) -> bool {
        matches!(
            self,
            ResolutionError::InvalidPath {
                source: PathError::Traversal(_),
                ..
            }
        )
    }

    /// Caller sent something unusable, as opposed to naming a missing backend.
    pub fn is_bad_request(&self) -> bool {
        !matches!(self, ResolutionError::UnknownBackend(_))
    }
}

/// No adapter could be produced for a backend.
#[derive(Error, Debug)]
pub enum FactoryError {
    #[error("Unsupported backend kind: {0}")]
    UnsupportedBackendKind(BackendKind),

    #[error("Failed to create adapter for backend '{backend}': {source}")]
    Adapter {
        backend: String,
        #[source]
        source: StorageError,
    },
}

/// Errors from [`StorageEngine`](crate::StorageEngine) operations.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Factory(#[from] FactoryError),

    #[error("Backend '{backend}': {source}")]
    Storage {
        backend: String,
        #[source]
        source: StorageError,
    },
}

impl EngineError {
    /// Maps to an "object not found" response.
    pub fn is_not_found(&self) -> bool {
        match self {
            EngineError::Resolution(e) => !e.is_bad_request(),
            EngineError::Storage { source, .. } => source.is_not_found(),
            EngineError::Factory(_) => false,
        }
    }

    /// Maps to a "bad request" response.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, EngineError::Resolution(e) if e.is_bad_request())
    }

    pub fn is_traversal(&self) -> bool {
        matches!(self, EngineError::Resolution(e) if e.is_traversal())
    }
}
