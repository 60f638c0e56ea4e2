//! Per-backend configuration entries.
//!
//! ```toml
//! [backends.docs]
//! kind = "s3"
//! directory = "users/42/"
//!
//! [backends.docs.options]
//! bucket = "company-docs"
//! region = "eu-west-1"
//! ```

use serde::{Deserialize, Serialize};

use crate::definition::BackendDefinition;
use crate::error::ConfigError;
use crate::value::{OptionValue, Options};

/// Raw `[backends.<name>]` table, validated by [`to_definition`](Self::to_definition).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Backend kind: "local", "s3", "memory", ...
    pub kind: String,

    /// Default prefix placed in front of every resolved path
    #[serde(
        default,
        alias = "prefix",
        alias = "default_prefix",
        skip_serializing_if = "Option::is_none"
    )]
    pub directory: Option<String>,

    /// Kind-specific options, checked against the kind's schema
    #[serde(default)]
    pub options: Options,
}

impl BackendConfig {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            options: Options::new(),
            directory: None,
        }
    }

    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    pub fn with_directory(mut self, directory: impl Into<String>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    pub fn to_definition(&self, name: &str) -> Result<BackendDefinition, ConfigError> {
        BackendDefinition::from_raw(
            name,
            &self.kind,
            self.options.clone(),
            self.directory.as_deref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::BackendKind;

    #[test]
    fn test_to_definition() {
        let config = BackendConfig::new("minio")
            .with_option("bucket", "b")
            .with_directory("team/");
        let def = config.to_definition("docs").unwrap();
        assert_eq!(def.kind(), BackendKind::S3);
        assert_eq!(def.get_str("bucket").unwrap(), "b");
        assert_eq!(def.directory().map(|d| d.as_str()), Some("team"));
    }

    #[test]
    fn test_prefix_alias() {
        let config: BackendConfig = toml::from_str(
            r#"
            kind = "memory"
            prefix = "cache/"
            "#,
        )
        .unwrap();
        assert_eq!(config.directory.as_deref(), Some("cache/"));
        assert!(config.options.is_empty());
    }
}
