//! Validated descriptor of one named backend.

use depot_storage::ObjectPath;

use crate::error::{ConfigError, OptionError};
use crate::kind::BackendKind;
use crate::schema::{OptionType, ValidatedOptions};
use crate::uri::SEPARATOR;
use crate::value::{OptionValue, Options};

/// One configured backend.
///
/// A definition only exists once its options satisfy the kind's schema,
/// its name is addressable and its directory is a valid relative path.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendDefinition {
    name: String,
    kind: BackendKind,
    options: ValidatedOptions,
    directory: Option<ObjectPath>,
}

impl BackendDefinition {
    pub fn new(
        name: impl Into<String>,
        kind: BackendKind,
        options: Options,
        directory: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        validate_name(&name)?;

        let options = kind
            .schema()
            .validate(options)
            .map_err(|source| ConfigError::InvalidOptions {
                backend: name.clone(),
                source,
            })?;

        let directory = directory
            .map(ObjectPath::parse)
            .transpose()
            .map_err(|source| ConfigError::InvalidDirectory {
                backend: name.clone(),
                source,
            })?
            .filter(|dir| !dir.is_root());

        Ok(Self {
            name,
            kind,
            options,
            directory,
        })
    }

    /// Build from an untyped kind string, as found in configuration.
    pub fn from_raw(
        name: impl Into<String>,
        kind: &str,
        options: Options,
        directory: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let kind = kind
            .parse::<BackendKind>()
            .map_err(|e| ConfigError::UnknownBackendKind {
                backend: name.clone(),
                kind: e.0,
            })?;
        Self::new(name, kind, options, directory)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn options(&self) -> &ValidatedOptions {
        &self.options
    }

    /// Prefix applied to every path resolved against this backend.
    pub fn directory(&self) -> Option<&ObjectPath> {
        self.directory.as_ref()
    }

    pub fn has_option(&self, name: &str) -> bool {
        self.options.contains(name)
    }

    pub fn get_option(&self, name: &str) -> Result<&OptionValue, OptionError> {
        self.options
            .get(name)
            .ok_or_else(|| OptionError::OptionNotFound {
                backend: self.name.clone(),
                option: name.to_string(),
            })
    }

    pub fn get_str(&self, name: &str) -> Result<&str, OptionError> {
        let value = self.get_option(name)?;
        value
            .as_str()
            .ok_or_else(|| self.wrong_type(name, OptionType::String, value))
    }

    pub fn get_bool(&self, name: &str) -> Result<bool, OptionError> {
        let value = self.get_option(name)?;
        value
            .as_bool()
            .ok_or_else(|| self.wrong_type(name, OptionType::Bool, value))
    }

    pub fn get_int(&self, name: &str) -> Result<i64, OptionError> {
        let value = self.get_option(name)?;
        value
            .as_i64()
            .ok_or_else(|| self.wrong_type(name, OptionType::Integer, value))
    }

    /// Optional string option: absent is `Ok(None)`, wrong type is an error.
    pub fn str_opt(&self, name: &str) -> Result<Option<&str>, OptionError> {
        if self.has_option(name) {
            self.get_str(name).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Optional boolean option with a default.
    pub fn bool_or(&self, name: &str, default: bool) -> Result<bool, OptionError> {
        if self.has_option(name) {
            self.get_bool(name)
        } else {
            Ok(default)
        }
    }

    fn wrong_type(&self, name: &str, expected: OptionType, value: &OptionValue) -> OptionError {
        OptionError::WrongType {
            backend: self.name.clone(),
            option: name.to_string(),
            expected,
            actual: value.type_name(),
        }
    }
}

fn validate_name(name: &str) -> Result<(), ConfigError> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name.contains(SEPARATOR) {
        "name contains the identifier separator"
    } else if name.chars().any(char::is_control) {
        "name contains control characters"
    } else {
        return Ok(());
    };
    Err(ConfigError::InvalidBackendName {
        name: name.to_string(),
        reason,
    })
}
