//! Option schemas and the validator that gates backend options.
//!
//! A schema is declared once per [`BackendKind`](crate::BackendKind) as a
//! static table. Validation is strict: every required key must be present,
//! no key outside `required ∪ optional` is accepted, and each present value
//! must match its declared type. The options pass through unchanged.

use serde::Serialize;
use std::fmt;

use crate::error::SchemaError;
use crate::value::{OptionValue, Options};

/// Declared type of an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    String,
    Bool,
    Integer,
    /// List or mapping
    Collection,
    /// Anything, including opaque handles
    Any,
}

impl OptionType {
    pub fn accepts(self, value: &OptionValue) -> bool {
        match self {
            OptionType::String => matches!(value, OptionValue::String(_)),
            OptionType::Bool => matches!(value, OptionValue::Bool(_)),
            OptionType::Integer => matches!(value, OptionValue::Integer(_)),
            OptionType::Collection => {
                matches!(value, OptionValue::List(_) | OptionValue::Map(_))
            }
            OptionType::Any => true,
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OptionType::String => "string",
            OptionType::Bool => "boolean",
            OptionType::Integer => "integer",
            OptionType::Collection => "list or mapping",
            OptionType::Any => "any value",
        };
        f.write_str(name)
    }
}

/// Required and optional option declarations for one backend kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionSchema {
    pub required: &'static [(&'static str, OptionType)],
    pub optional: &'static [(&'static str, OptionType)],
}

impl OptionSchema {
    pub const fn new(
        required: &'static [(&'static str, OptionType)],
        optional: &'static [(&'static str, OptionType)],
    ) -> Self {
        Self { required, optional }
    }

    /// Declared type for `name`, `None` if the schema does not know it.
    pub fn expected_type(&self, name: &str) -> Option<OptionType> {
        self.required
            .iter()
            .chain(self.optional)
            .find(|(key, _)| *key == name)
            .map(|(_, ty)| *ty)
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|(key, _)| *key == name)
    }

    /// Check `options` against this schema.
    ///
    /// Missing required keys are reported first, in declaration order;
    /// after that the supplied options are checked in insertion order.
    pub fn validate(&self, options: Options) -> Result<ValidatedOptions, SchemaError> {
        if let Some((missing, _)) = self
            .required
            .iter()
            .find(|(key, _)| !options.contains_key(*key))
        {
            return Err(SchemaError::MissingRequiredOption(missing.to_string()));
        }

        for (name, value) in &options {
            let expected = self
                .expected_type(name)
                .ok_or_else(|| SchemaError::UnknownOption(name.clone()))?;
            if !expected.accepts(value) {
                return Err(SchemaError::TypeMismatch {
                    name: name.clone(),
                    expected,
                    actual: value.type_name(),
                });
            }
        }

        Ok(ValidatedOptions(options))
    }
}

/// Options that passed [`OptionSchema::validate`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedOptions(Options);

impl ValidatedOptions {
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &OptionValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Options {
        &self.0
    }

    pub fn into_inner(self) -> Options {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::OpaqueHandle;

    const SCHEMA: OptionSchema = OptionSchema::new(
        &[("host", OptionType::String), ("root", OptionType::String)],
        &[
            ("port", OptionType::Integer),
            ("ssl", OptionType::Bool),
            ("permissions", OptionType::Collection),
            ("client", OptionType::Any),
        ],
    );

    fn options(pairs: &[(&str, OptionValue)]) -> Options {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_valid_options_pass_unchanged() {
        let input = options(&[
            ("root", "/srv".into()),
            ("host", "example.com".into()),
            ("ssl", true.into()),
        ]);
        let validated = SCHEMA.validate(input.clone()).unwrap();
        assert_eq!(validated.as_map(), &input);

        // insertion order is kept
        let keys: Vec<&String> = validated.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["root", "host", "ssl"]);
    }

    #[test]
    fn test_missing_required_in_declaration_order() {
        let err = SCHEMA.validate(Options::new()).unwrap_err();
        assert_eq!(err, SchemaError::MissingRequiredOption("host".to_string()));

        let err = SCHEMA
            .validate(options(&[("host", "h".into())]))
            .unwrap_err();
        assert_eq!(err, SchemaError::MissingRequiredOption("root".to_string()));
    }

    #[test]
    fn test_unknown_option_rejected() {
        let err = SCHEMA
            .validate(options(&[
                ("host", "h".into()),
                ("root", "/".into()),
                ("colour", "blue".into()),
            ]))
            .unwrap_err();
        assert_eq!(err, SchemaError::UnknownOption("colour".to_string()));
    }

    #[test]
    fn test_type_mismatch() {
        let err = SCHEMA
            .validate(options(&[
                ("host", "h".into()),
                ("root", "/".into()),
                ("port", "21".into()),
            ]))
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::TypeMismatch {
                name: "port".to_string(),
                expected: OptionType::Integer,
                actual: "string",
            }
        );
    }

    #[test]
    fn test_collection_and_any() {
        let validated = SCHEMA
            .validate(options(&[
                ("host", "h".into()),
                ("root", "/".into()),
                ("permissions", OptionValue::List(vec!["0644".into()])),
                ("client", OpaqueHandle::new(42u8).into()),
            ]))
            .unwrap();
        assert_eq!(validated.len(), 4);
        assert!(validated.contains("client"));
        assert!(!OptionType::Collection.accepts(&"x".into()));
    }

    #[test]
    fn test_empty_schema_accepts_empty_options() {
        let empty = OptionSchema::new(&[], &[]);
        assert!(empty.validate(Options::new()).unwrap().is_empty());
        assert!(empty
            .validate(options(&[("anything", true.into())]))
            .is_err());
    }

    #[test]
    fn test_expected_type() {
        assert_eq!(SCHEMA.expected_type("port"), Some(OptionType::Integer));
        assert_eq!(SCHEMA.expected_type("nope"), None);
        assert!(SCHEMA.is_required("host"));
        assert!(!SCHEMA.is_required("port"));
    }
}
