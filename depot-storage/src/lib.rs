//! Storage adapters and path validation for depot.
//!
//! This crate holds the byte-level half of depot: the [`ObjectStorage`] trait
//! every backend adapter implements, the adapters themselves, and the
//! [`ObjectPath`] type that guarantees adapters only ever see validated,
//! backend-relative paths.
//!
//! Adapters know nothing about backend names or identifiers. The `depot`
//! crate resolves `backend:path` to an adapter plus an [`ObjectPath`] and
//! hands over from there. [`LocalStorage`] and [`MemoryStorage`] are always
//! built; the S3 adapter sits behind the `s3` feature.
//!
//! # Example
//!
//! ```no_run
//! use depot_storage::{LocalStorage, ObjectPath, ObjectStorage};
//! use bytes::Bytes;
//!
//! # async fn example() -> depot_storage::Result<()> {
//! let storage = LocalStorage::new("./data");
//!
//! let path = ObjectPath::parse("users/42/report.pdf")?;
//! storage.write(&path, Bytes::from("contents")).await?;
//!
//! let data = storage.read(&path).await?;
//! let files = storage.list(&ObjectPath::parse("users")?).await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod local;
mod memory;
mod path;
mod traits;

#[cfg(feature = "s3")]
mod s3;

pub use error::{PathError, Result, StorageError};
pub use local::LocalStorage;
pub use memory::MemoryStorage;
pub use path::{ObjectPath, PATH_SEPARATOR};
pub use traits::{ListOptions, ObjectMeta, ObjectStorage};

#[cfg(feature = "s3")]
pub use s3::{S3Config, S3Storage};

pub use bytes::Bytes;
