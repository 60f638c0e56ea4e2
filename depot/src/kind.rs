//! Backend kinds and their option schemas.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::schema::OptionSchema;
use crate::schema::OptionType::{Any, Bool, Collection, Integer, String as Str};

static LOCAL: OptionSchema = OptionSchema::new(
    &[("root", Str)],
    &[("create_root", Bool), ("permissions", Collection)],
);

static S3: OptionSchema = OptionSchema::new(
    &[("bucket", Str)],
    &[
        ("region", Str),
        ("endpoint", Str),
        ("access_key_id", Str),
        ("secret_access_key", Str),
        ("force_path_style", Bool),
        ("allow_http", Bool),
        ("client", Any),
    ],
);

static FTP: OptionSchema = OptionSchema::new(
    &[("host", Str)],
    &[
        ("port", Integer),
        ("username", Str),
        ("password", Str),
        ("root", Str),
        ("ssl", Bool),
        ("passive", Bool),
        ("timeout", Integer),
    ],
);

static SFTP: OptionSchema = OptionSchema::new(
    &[("host", Str)],
    &[
        ("port", Integer),
        ("username", Str),
        ("password", Str),
        ("private_key", Str),
        ("passphrase", Str),
        ("root", Str),
        ("timeout", Integer),
    ],
);

static GRIDFS: OptionSchema = OptionSchema::new(
    &[("database", Str)],
    &[("bucket", Str), ("uri", Str), ("client", Any)],
);

static MEMORY: OptionSchema = OptionSchema::new(&[], &[]);

/// Family of a configured backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Local filesystem
    Local,
    /// S3-compatible object store
    S3,
    Ftp,
    Sftp,
    /// MongoDB GridFS
    GridFs,
    /// Process-local, non-persistent
    Memory,
}

impl BackendKind {
    pub const ALL: [BackendKind; 6] = [
        BackendKind::Local,
        BackendKind::S3,
        BackendKind::Ftp,
        BackendKind::Sftp,
        BackendKind::GridFs,
        BackendKind::Memory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::S3 => "s3",
            BackendKind::Ftp => "ftp",
            BackendKind::Sftp => "sftp",
            BackendKind::GridFs => "gridfs",
            BackendKind::Memory => "memory",
        }
    }

    /// The option schema every definition of this kind must satisfy.
    pub fn schema(&self) -> &'static OptionSchema {
        match self {
            BackendKind::Local => &LOCAL,
            BackendKind::S3 => &S3,
            BackendKind::Ftp => &FTP,
            BackendKind::Sftp => &SFTP,
            BackendKind::GridFs => &GRIDFS,
            BackendKind::Memory => &MEMORY,
        }
    }
}

impl BackendKind {
    /// Options that together pin down where a backend's objects live.
    ///
    /// Two definitions of the same kind with equal values for these options
    /// address the same store. Empty for kinds whose stores are never shared.
    pub fn location_options(&self) -> &'static [&'static str] {
        match self {
            BackendKind::Local => &["root"],
            BackendKind::S3 => &["bucket", "endpoint", "client"],
            BackendKind::Ftp | BackendKind::Sftp => &["host", "port", "root"],
            BackendKind::GridFs => &["database", "bucket", "uri", "client"],
            BackendKind::Memory => &[],
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// String did not name a known backend kind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown backend kind '{0}'")]
pub struct UnknownKind(pub String);

impl FromStr for BackendKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" | "fs" | "filesystem" => Ok(BackendKind::Local),
            "s3" | "aws" | "minio" => Ok(BackendKind::S3),
            "ftp" | "ftps" => Ok(BackendKind::Ftp),
            "sftp" => Ok(BackendKind::Sftp),
            "gridfs" | "mongo" => Ok(BackendKind::GridFs),
            "memory" | "in-memory" | "inmemory" => Ok(BackendKind::Memory),
            _ => Err(UnknownKind(s.to_string())),
        }
    }
}
