//! Backend-relative object paths.
//!
//! An [`ObjectPath`] is the only path type adapters accept. It can only be
//! built through [`ObjectPath::parse`], which validates and normalizes raw
//! input:
//!
//! - repeated `/` collapse and leading/trailing `/` are dropped, so paths are
//!   always relative to the backend root
//! - `.` segments are removed
//! - `..` pops the previous segment and fails with [`PathError::Traversal`]
//!   the moment it would climb above the root
//! - control characters, NUL, backslashes and anything outside the
//!   allow-list fail with [`PathError::InvalidCharacter`]
//!
//! # Examples
//!
//! ```
//! use depot_storage::{ObjectPath, PathError};
//!
//! let path = ObjectPath::parse("/users//42/./report.pdf").unwrap();
//! assert_eq!(path.as_str(), "users/42/report.pdf");
//!
//! let err = ObjectPath::parse("../../etc/passwd").unwrap_err();
//! assert!(matches!(err, PathError::Traversal(_)));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::PathError;

/// Segment separator inside object paths.
pub const PATH_SEPARATOR: char = '/';

/// Punctuation accepted in path segments besides letters, digits and space.
const ALLOWED_PUNCTUATION: &str = "._-/~@+=,()[]!&'$#%:;";

fn is_allowed_char(c: char) -> bool {
    if c.is_control() {
        return false;
    }
    c.is_alphanumeric() || c == ' ' || ALLOWED_PUNCTUATION.contains(c)
}

/// Validated, normalized path relative to a backend root.
///
/// The empty path is the root.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectPath(String);

impl ObjectPath {
    /// The backend root.
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Validate and normalize a raw path.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if let Some((offset, ch)) = raw.char_indices().find(|(_, c)| !is_allowed_char(*c)) {
            return Err(PathError::InvalidCharacter {
                path: raw.to_string(),
                ch,
                offset,
            });
        }

        // segments.len() is the depth below the root
        let mut segments: Vec<&str> = Vec::new();
        for segment in raw.split(PATH_SEPARATOR) {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(PathError::Traversal(raw.to_string()));
                    }
                }
                name => segments.push(name),
            }
        }

        Ok(Self(segments.join("/")))
    }

    /// Place `path` under `prefix` and re-validate the combination.
    ///
    /// The prefix is treated as untrusted text too: a prefix containing `..`
    /// that climbs out of the root is rejected just like user input.
    pub fn prefixed(prefix: &str, path: &ObjectPath) -> Result<Self, PathError> {
        let combined = format!("{}{}{}", prefix, PATH_SEPARATOR, path.0);
        Self::parse(&combined)
    }

    /// Append an already-validated path.
    pub fn join(&self, other: &ObjectPath) -> ObjectPath {
        match (self.is_root(), other.is_root()) {
            (true, _) => other.clone(),
            (_, true) => self.clone(),
            _ => ObjectPath(format!("{}/{}", self.0, other.0)),
        }
    }

    /// Append a single raw segment, validating it.
    pub fn child(&self, name: &str) -> Result<ObjectPath, PathError> {
        Ok(self.join(&ObjectPath::parse(name)?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Path segments, empty for the root.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(PATH_SEPARATOR).filter(|s| !s.is_empty())
    }

    /// Last segment, `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        self.segments().last()
    }

    /// Parent path, `None` for the root.
    pub fn parent(&self) -> Option<ObjectPath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind(PATH_SEPARATOR) {
            Some(idx) => Some(ObjectPath(self.0[..idx].to_string())),
            None => Some(ObjectPath::root()),
        }
    }

    /// Segment-wise prefix test: `a/bc` does not start with `a/b`.
    pub fn starts_with(&self, prefix: &ObjectPath) -> bool {
        if prefix.is_root() || self.0 == prefix.0 {
            return true;
        }
        self.0
            .strip_prefix(prefix.as_str())
            .is_some_and(|rest| rest.starts_with(PATH_SEPARATOR))
    }

    /// Remove a segment-wise prefix.
    pub fn strip_prefix(&self, prefix: &ObjectPath) -> Option<ObjectPath> {
        if !self.starts_with(prefix) {
            return None;
        }
        if prefix.is_root() {
            return Some(self.clone());
        }
        let rest = &self.0[prefix.0.len()..];
        Some(ObjectPath(rest.trim_start_matches(PATH_SEPARATOR).to_string()))
    }

    /// Convert to a filesystem path under `base`.
    pub fn to_path_buf(&self, base: &Path) -> PathBuf {
        self.segments().fold(base.to_path_buf(), |acc, s| acc.join(s))
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ObjectPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ObjectPath> for String {
    fn from(path: ObjectPath) -> Self {
        path.0
    }
}
