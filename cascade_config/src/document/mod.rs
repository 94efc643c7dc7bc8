//! Generic document tree shared by codecs, the merger and the binder.
//!
//! Every codec decodes into a [`Node`]; merging, expansion, path lookup and
//! binding all operate on this tree, so the engine never needs to know which
//! format a value came from.

mod de;
mod mapping;
mod serde_impl;

pub use de::{DecodeError, from_node};
pub use mapping::Mapping;
pub(crate) use serde_impl::TextKeys;

use std::fmt;

use serde::Serialize;

use crate::{ConfigError, ConfigResult};

/// One node of a configuration document.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Node {
    /// Explicit `null` (or `~`).
    #[default]
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Signed integer scalar.
    Int(i64),
    /// Unsigned integer that does not fit in an `i64`.
    UInt(u64),
    /// Floating point scalar.
    Float(f64),
    /// String scalar.
    Str(String),
    /// Sequence of nodes.
    Seq(Vec<Node>),
    /// Mapping from (possibly non-string) keys to nodes.
    Map(Mapping),
}

/// Coarse structural classification used when merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// The null node.
    Null,
    /// Any non-null scalar.
    Scalar,
    /// A sequence.
    Sequence,
    /// A mapping.
    Mapping,
}

impl Shape {
    /// Human readable name used in error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Scalar => "scalar",
            Self::Sequence => "sequence",
            Self::Mapping => "mapping",
        }
    }
}

impl Node {
    /// Structural shape of this node.
    #[must_use]
    pub const fn shape(&self) -> Shape {
        match self {
            Self::Null => Shape::Null,
            Self::Seq(_) => Shape::Sequence,
            Self::Map(_) => Shape::Mapping,
            _ => Shape::Scalar,
        }
    }

    /// Returns `true` when the node is a non-null scalar.
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        matches!(self.shape(), Shape::Scalar)
    }

    /// Returns `true` for the zero value of the node's kind.
    ///
    /// Mappings are zero when every value they hold is zero, which mirrors a
    /// struct whose fields are all unset.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Bool(b) => !b,
            Self::Int(i) => *i == 0,
            Self::UInt(u) => *u == 0,
            Self::Float(f) => *f == 0.0,
            Self::Str(s) => s.is_empty(),
            Self::Seq(items) => items.is_empty(),
            Self::Map(map) => map.values().all(Self::is_zero),
        }
    }

    /// Borrow the string contents of a string scalar.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the mapping held by this node.
    #[must_use]
    pub const fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Mutably borrow the mapping held by this node.
    pub const fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Borrow the sequence held by this node.
    #[must_use]
    pub fn as_seq(&self) -> Option<&[Self]> {
        match self {
            Self::Seq(items) => Some(items),
            _ => None,
        }
    }

    /// Render a scalar the way it would appear as a path segment or
    /// environment value. Collections render as flow YAML.
    #[must_use]
    pub fn key_text(&self) -> String {
        match self {
            Self::Null => "null".to_owned(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::UInt(u) => u.to_string(),
            Self::Float(f) => float_text(*f),
            Self::Str(s) => s.clone(),
            Self::Seq(_) | Self::Map(_) => serde_json::to_string(&TextKeys(self)).unwrap_or_default(),
        }
    }

    /// Overlay `other` onto `self`.
    ///
    /// Mappings merge key by key, anything else replaces the current value.
    /// A null incoming value never erases what is already present.
    pub fn overlay(&mut self, other: Self) {
        match (self, other) {
            (_, Self::Null) => {}
            (Self::Map(current), Self::Map(incoming)) => {
                for (key, value) in incoming {
                    match current.get_mut(&key) {
                        Some(slot) => slot.overlay(value),
                        None => {
                            current.insert(key, value);
                        }
                    }
                }
            }
            (slot, value) => *slot = value,
        }
    }

    /// Parse a literal with YAML scalar rules.
    ///
    /// Blank input yields [`Node::Null`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Decode`] when the text is not valid YAML.
    pub fn parse_literal(text: &str) -> ConfigResult<Self> {
        crate::codec::parse_yaml(text)
            .map(Option::unwrap_or_default)
            .map_err(|e| std::sync::Arc::new(ConfigError::decode("literal", e)))
    }
}

/// Render a float so that YAML reads it back as a float.
pub(crate) fn float_text(f: f64) -> String {
    if f.is_nan() {
        ".nan".to_owned()
    } else if f.is_infinite() {
        if f.is_sign_positive() { ".inf" } else { "-.inf" }.to_owned()
    } else if f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

/// Block-style YAML, without the trailing newline.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = crate::codec::render_yaml(self).map_err(|_| fmt::Error)?;
        f.write_str(text.trim_end_matches('\n'))
    }
}

/// Serialise `value` into a [`Node`].
///
/// # Errors
///
/// Returns [`ConfigError::InvalidTarget`] when `value` cannot be represented
/// as a document, for example a map with non-scalar keys.
pub fn to_node<T: Serialize + ?Sized>(value: &T) -> ConfigResult<Node> {
    serde_json::to_value(value)
        .map(Node::from)
        .map_err(|e| ConfigError::invalid_target(e.to_string()))
}

impl From<serde_json::Value> for Node {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_u64().map(Self::UInt))
                .unwrap_or_else(|| Self::Float(n.as_f64().unwrap_or(f64::NAN))),
            Value::String(s) => Self::Str(s),
            Value::Array(items) => Self::Seq(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(k, v)| (Self::Str(k), Self::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Node {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Mapping> for Node {
    fn from(value: Mapping) -> Self {
        Self::Map(value)
    }
}

impl From<Vec<Self>> for Node {
    fn from(value: Vec<Self>) -> Self {
        Self::Seq(value)
    }
}

#[cfg(test)]
mod tests;
