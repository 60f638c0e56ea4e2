//! Turns identifiers into a backend definition plus a normalized path.

use depot_storage::ObjectPath;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::definition::BackendDefinition;
use crate::error::ResolutionError;
use crate::registry::BackendRegistry;
use crate::uri::{ParsedUri, SEPARATOR};

/// Result of a successful resolution. Built fresh for every call.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedHandle {
    definition: Arc<BackendDefinition>,
    path: ObjectPath,
}

impl ResolvedHandle {
    pub fn definition(&self) -> &Arc<BackendDefinition> {
        &self.definition
    }

    pub fn backend_name(&self) -> &str {
        self.definition.name()
    }

    /// Path relative to the backend root, directory prefix included.
    pub fn normalized_path(&self) -> &ObjectPath {
        &self.path
    }

    /// Path as the caller addresses it, without the directory prefix.
    pub fn relative_path(&self) -> ObjectPath {
        to_caller_path(&self.definition, &self.path)
    }

    /// Canonical identifier for this handle.
    pub fn identifier(&self) -> String {
        format!("{}{}{}", self.backend_name(), SEPARATOR, self.relative_path())
    }
}

/// Strip a backend's directory prefix from an adapter-level path.
pub(crate) fn to_caller_path(definition: &BackendDefinition, path: &ObjectPath) -> ObjectPath {
    match definition.directory() {
        Some(dir) => path.strip_prefix(dir).unwrap_or_else(|| path.clone()),
        None => path.clone(),
    }
}

/// Resolves identifiers against one registry snapshot.
#[derive(Debug, Clone)]
pub struct UriResolver {
    registry: Arc<BackendRegistry>,
}

impl UriResolver {
    pub fn new(registry: Arc<BackendRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<BackendRegistry> {
        &self.registry
    }

    pub fn resolve(&self, identifier: &str) -> Result<ResolvedHandle, ResolutionError> {
        let parsed = ParsedUri::parse(identifier)?;
        let definition = self.registry.lookup(parsed.server_name())?;

        let invalid = |source| {
            let err = ResolutionError::InvalidPath {
                backend: definition.name().to_string(),
                source,
            };
            if err.is_traversal() {
                warn!(
                    backend = definition.name(),
                    identifier, "Rejected path traversal attempt"
                );
            }
            err
        };

        let normalized = ObjectPath::parse(parsed.path()).map_err(&invalid)?;
        let path = match definition.directory() {
            Some(dir) => ObjectPath::prefixed(dir.as_str(), &normalized).map_err(&invalid)?,
            None => normalized,
        };

        debug!(backend = definition.name(), path = %path, "Resolved identifier");
        Ok(ResolvedHandle { definition, path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UriError;
    use crate::kind::BackendKind;
    use crate::value::Options;
    use depot_storage::PathError;

    fn resolver() -> UriResolver {
        let mut s3_options = Options::new();
        s3_options.insert("bucket".to_string(), "bucket".into());

        let registry = BackendRegistry::from_definitions(vec![
            BackendDefinition::new("scratch", BackendKind::Memory, Options::new(), None).unwrap(),
            BackendDefinition::new("docs", BackendKind::S3, s3_options, Some("users/42/"))
                .unwrap(),
        ])
        .unwrap();
        UriResolver::new(Arc::new(registry))
    }

    #[test]
    fn test_resolve_plain() {
        let handle = resolver().resolve("scratch://a//b/./c.txt").unwrap();
        assert_eq!(handle.backend_name(), "scratch");
        assert_eq!(handle.normalized_path().as_str(), "a/b/c.txt");
        assert_eq!(handle.identifier(), "scratch:a/b/c.txt");
    }

    #[test]
    fn test_resolve_with_prefix() {
        let handle = resolver().resolve("docs:report.pdf").unwrap();
        assert_eq!(handle.normalized_path().as_str(), "users/42/report.pdf");
        assert_eq!(handle.relative_path().as_str(), "report.pdf");
        assert_eq!(handle.identifier(), "docs:report.pdf");
    }

    #[test]
    fn test_root_with_prefix() {
        let handle = resolver().resolve("docs:").unwrap();
        assert_eq!(handle.normalized_path().as_str(), "users/42");
        assert!(handle.relative_path().is_root());
    }

    #[test]
    fn test_error_kinds() {
        let r = resolver();
        assert!(matches!(
            r.resolve("noseparatorhere"),
            Err(ResolutionError::BadIdentifier(UriError::MalformedIdentifier { .. }))
        ));
        assert_eq!(
            r.resolve("ghost:foo").unwrap_err(),
            ResolutionError::UnknownBackend("ghost".to_string())
        );

        let err = r.resolve("docs:../../etc/passwd").unwrap_err();
        assert!(err.is_traversal());

        let err = r.resolve("scratch:bad\0name").unwrap_err();
        assert!(matches!(
            err,
            ResolutionError::InvalidPath {
                source: PathError::InvalidCharacter { ch: '\0', .. },
                ..
            }
        ));
        assert!(!err.is_traversal());
    }

    #[test]
    fn test_traversal_within_prefix_still_rejected() {
        // `..` is judged against the backend root the caller sees, not the
        // directory the prefix happens to add.
        let err = resolver().resolve("docs:../43/secret").unwrap_err();
        assert!(err.is_traversal());
    }
}
