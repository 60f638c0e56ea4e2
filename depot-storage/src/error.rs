//! Errors raised by path validation and adapters.

use std::io;
use thiserror::Error;

/// Reasons a raw path is refused by [`ObjectPath::parse`](crate::ObjectPath::parse).
///
/// The two variants are kept apart so callers can alert on traversal
/// attempts separately from ordinary malformed input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// A `..` segment would climb above the backend root
    #[error("Path escapes the backend root: {0}")]
    Traversal(String),

    /// Control character, NUL byte or a character outside the allow-list
    #[error("Invalid character {ch:?} at byte {offset} in path: {path:?}")]
    InvalidCharacter {
        path: String,
        ch: char,
        offset: usize,
    },
}

impl PathError {
    /// The raw path that was rejected.
    pub fn path(&self) -> &str {
        match self {
            PathError::Traversal(path) => path,
            PathError::InvalidCharacter { path, .. } => path,
        }
    }
}

/// Failure of an adapter operation.
///
/// Every adapter reports a missing object as `NotFound`, so callers can
/// classify without knowing the backend.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No object at this path
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),

    #[error("access denied: {0}")]
    PermissionDenied(String),

    /// Anything the backend refused that has no variant of its own
    #[error("backend failure: {0}")]
    Backend(String),

    #[cfg(feature = "s3")]
    #[error("object store: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// The adapter could not be set up from its options
    #[error("adapter configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            StorageError::Io(e) => Some(e.kind()),
            _ => None,
        }
    }

    /// Missing object, whether reported directly or as an I/O error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
            || self.io_kind() == Some(io::ErrorKind::NotFound)
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, StorageError::PermissionDenied(_))
            || self.io_kind() == Some(io::ErrorKind::PermissionDenied)
    }
}
