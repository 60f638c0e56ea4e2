//! Resolution behaviour over a registry built from configuration.

use depot::{
    BackendConfig, BackendRegistry, ConfigError, DepotConfig, ParsedUri, PathError,
    ResolutionError, SchemaError, UriError, UriResolver,
};
use proptest::prelude::*;
use std::sync::Arc;

fn resolver() -> UriResolver {
    let config = DepotConfig::from_toml_str(
        r#"
        [backends.local]
        kind = "local"
        [backends.local.options]
        root = "/srv/files"

        [backends.docs]
        kind = "s3"
        directory = "users/42/"
        [backends.docs.options]
        bucket = "company-docs"
        region = "eu-west-1"

        [backends.scratch]
        kind = "memory"
        "#,
    )
    .unwrap();
    UriResolver::new(Arc::new(config.build_registry().unwrap()))
}

#[test]
fn test_traversal_rejected() {
    let err = resolver().resolve("local:../../etc/passwd").unwrap_err();
    assert!(err.is_traversal());
    assert!(matches!(
        err,
        ResolutionError::InvalidPath {
            source: PathError::Traversal(_),
            ref backend,
        } if backend == "local"
    ));
}

#[test]
fn test_traversal_inside_root_allowed() {
    let handle = resolver().resolve("local:a/b/../c").unwrap();
    assert_eq!(handle.normalized_path().as_str(), "a/c");
}

#[test]
fn test_unknown_backend() {
    assert_eq!(
        resolver().resolve("ghost:foo").unwrap_err(),
        ResolutionError::UnknownBackend("ghost".to_string())
    );
}

#[test]
fn test_malformed_identifier() {
    assert!(matches!(
        resolver().resolve("noseparatorhere"),
        Err(ResolutionError::BadIdentifier(
            UriError::MalformedIdentifier { .. }
        ))
    ));
}

#[test]
fn test_schema_enforced_at_registry_construction() {
    let mut backends = indexmap::IndexMap::new();
    backends.insert("docs".to_string(), BackendConfig::new("s3"));

    let err = BackendRegistry::from_config(&backends).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::InvalidOptions {
            source: SchemaError::MissingRequiredOption(ref name),
            ..
        } if name == "bucket"
    ));
}

#[test]
fn test_unknown_option_rejected() {
    let config = DepotConfig::from_toml_str(
        r#"
        [backends.scratch]
        kind = "memory"
        [backends.scratch.options]
        colour = "blue"
        "#,
    )
    .unwrap();
    let err = config.build_registry().unwrap_err();
    assert_eq!(
        err.schema_error(),
        Some(&SchemaError::UnknownOption("colour".to_string()))
    );
}

#[test]
fn test_type_mismatch_rejected() {
    let config = DepotConfig::from_toml_str(
        r#"
        [backends.docs]
        kind = "s3"
        [backends.docs.options]
        bucket = 42
        "#,
    )
    .unwrap();
    assert!(matches!(
        config.build_registry().unwrap_err().schema_error(),
        Some(SchemaError::TypeMismatch { name, .. }) if name == "bucket"
    ));
}

#[test]
fn test_prefix_composition() {
    let handle = resolver().resolve("docs:report.pdf").unwrap();
    assert_eq!(handle.backend_name(), "docs");
    assert_eq!(handle.normalized_path().as_str(), "users/42/report.pdf");
}

#[test]
fn test_prefix_cannot_be_escaped() {
    let err = resolver().resolve("docs:../../../etc/passwd").unwrap_err();
    assert!(err.is_traversal());
}

#[test]
fn test_invalid_characters() {
    let r = resolver();
    for identifier in ["local:a\0b", "local:a\\b", "local:line\nbreak"] {
        let err = r.resolve(identifier).unwrap_err();
        assert!(
            matches!(
                err,
                ResolutionError::InvalidPath {
                    source: PathError::InvalidCharacter { .. },
                    ..
                }
            ),
            "{:?}",
            identifier
        );
        assert!(!err.is_traversal());
    }
}

#[test]
fn test_absolute_paths_become_relative() {
    let handle = resolver().resolve("scratch:///tmp//x/./y").unwrap();
    assert_eq!(handle.normalized_path().as_str(), "tmp/x/y");
}

#[test]
fn test_error_classification() {
    let r = resolver();
    assert!(r.resolve("noseparatorhere").unwrap_err().is_bad_request());
    assert!(r.resolve("local:../x").unwrap_err().is_bad_request());
    assert!(!r.resolve("ghost:x").unwrap_err().is_bad_request());
}

proptest! {
    #[test]
    fn prop_resolution_is_deterministic(path in "[a-z0-9./]{0,24}") {
        let r = resolver();
        let identifier = format!("docs:{}", path);
        prop_assert_eq!(r.resolve(&identifier), r.resolve(&identifier));
    }

    #[test]
    fn prop_round_trip(name in "[a-z]{1,8}", path in "[a-z0-9/:.]{0,24}") {
        let identifier = format!("{}:{}", name, path);
        let parsed = ParsedUri::parse(&identifier).unwrap();
        prop_assert_eq!(parsed.render(), identifier);
        prop_assert_eq!(ParsedUri::parse(&parsed.render()).unwrap(), parsed);
    }

    #[test]
    fn prop_normalized_path_resolves_to_itself(path in "[a-c./]{0,24}") {
        let r = resolver();
        if let Ok(first) = r.resolve(&format!("scratch:{}", path)) {
            let again = r
                .resolve(&format!("scratch:{}", first.normalized_path()))
                .unwrap();
            prop_assert_eq!(first.normalized_path(), again.normalized_path());
        }
    }
}
