//! Typed backend option values.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Option mapping in insertion order.
pub type Options = IndexMap<String, OptionValue>;

/// Pre-built object handed to an adapter factory instead of plain settings,
/// e.g. an already-configured client.
///
/// Handles cannot come from a config file; they are inserted into
/// [`Options`] programmatically.
#[derive(Clone)]
pub struct OpaqueHandle {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl OpaqueHandle {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Rust type name of the wrapped value.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for OpaqueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpaqueHandle<{}>", self.type_name)
    }
}

impl PartialEq for OpaqueHandle {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.inner), Arc::as_ptr(&other.inner))
    }
}

/// A single option value.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    /// TOML date, time or date-time
    Datetime(toml::value::Datetime),
    List(Vec<OptionValue>),
    Map(IndexMap<String, OptionValue>),
    #[serde(skip)]
    Handle(OpaqueHandle),
}

impl OptionValue {
    /// Name of the runtime type, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            OptionValue::Bool(_) => "boolean",
            OptionValue::Integer(_) => "integer",
            OptionValue::Float(_) => "float",
            OptionValue::Datetime(_) => "datetime",
            OptionValue::String(_) => "string",
            OptionValue::List(_) => "list",
            OptionValue::Map(_) => "mapping",
            OptionValue::Handle(_) => "handle",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            OptionValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_handle(&self) -> Option<&OpaqueHandle> {
        match self {
            OptionValue::Handle(h) => Some(h),
            _ => None,
        }
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::String(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::String(value)
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Integer(value)
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        OptionValue::Float(value)
    }
}

impl From<OpaqueHandle> for OptionValue {
    fn from(value: OpaqueHandle) -> Self {
        OptionValue::Handle(value)
    }
}
