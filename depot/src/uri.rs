//! Identifier parsing.
//!
//! Identifiers have the form `<backend><SEPARATOR><path>`, e.g.
//! `docs:reports/q1.pdf`. Only the first separator splits: anything after
//! it belongs to the path, colons included.

use std::fmt;
use std::str::FromStr;

use crate::error::UriError;

/// Separator between backend name and path.
pub const SEPARATOR: &str = ":";

/// An identifier split into backend name and raw (unvalidated) path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParsedUri {
    server_name: String,
    path: String,
}

impl ParsedUri {
    /// Split `identifier` at the first [`SEPARATOR`].
    ///
    /// The path part is kept raw and may be empty, meaning the backend root.
    ///
    /// # Errors
    ///
    /// `MalformedIdentifier` when the separator is missing or the backend
    /// name before it is empty.
    pub fn parse(identifier: &str) -> Result<Self, UriError> {
        let (server_name, path) =
            identifier
                .split_once(SEPARATOR)
                .ok_or_else(|| UriError::MalformedIdentifier {
                    identifier: identifier.to_string(),
                    reason: "missing separator",
                })?;

        if server_name.is_empty() {
            return Err(UriError::MalformedIdentifier {
                identifier: identifier.to_string(),
                reason: "empty backend name",
            });
        }

        Ok(Self {
            server_name: server_name.to_string(),
            path: path.to_string(),
        })
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// Raw path, empty for the backend root.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Inverse of [`parse`](Self::parse).
    pub fn render(&self) -> String {
        format!("{}{}{}", self.server_name, SEPARATOR, self.path)
    }
}

impl fmt::Display for ParsedUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.server_name, SEPARATOR, self.path)
    }
}

impl FromStr for ParsedUri {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_basic() {
        let uri = ParsedUri::parse("docs:reports/q1.pdf").unwrap();
        assert_eq!(uri.server_name(), "docs");
        assert_eq!(uri.path(), "reports/q1.pdf");
    }

    #[test]
    fn test_only_first_separator_splits() {
        let uri = ParsedUri::parse("local:times/12:30:00.log").unwrap();
        assert_eq!(uri.server_name(), "local");
        assert_eq!(uri.path(), "times/12:30:00.log");
    }

    #[test]
    fn test_empty_path_is_root() {
        let uri = ParsedUri::parse("docs:").unwrap();
        assert_eq!(uri.path(), "");
    }

    #[test]
    fn test_missing_separator() {
        let err = ParsedUri::parse("noseparatorhere").unwrap_err();
        assert_eq!(
            err,
            UriError::MalformedIdentifier {
                identifier: "noseparatorhere".to_string(),
                reason: "missing separator",
            }
        );
    }

    #[test]
    fn test_empty_server_name() {
        assert!(matches!(
            ParsedUri::parse(":foo"),
            Err(UriError::MalformedIdentifier {
                reason: "empty backend name",
                ..
            })
        ));
    }

    #[test]
    fn test_render_and_display() {
        let uri: ParsedUri = "docs:a/b".parse().unwrap();
        assert_eq!(uri.render(), "docs:a/b");
        assert_eq!(uri.to_string(), "docs:a/b");
    }

    proptest! {
        #[test]
        fn prop_render_inverts_parse(
            name in "[a-z][a-z0-9_-]{0,12}",
            path in "[a-z0-9/:._ -]{0,32}",
        ) {
            let identifier = format!("{}:{}", name, path);
            let parsed = ParsedUri::parse(&identifier).unwrap();
            prop_assert_eq!(parsed.render(), identifier.clone());
            prop_assert_eq!(ParsedUri::parse(&parsed.render()).unwrap(), parsed);
        }
    }
}
