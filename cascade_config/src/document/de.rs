//! Weakly typed decoding from a [`Node`] into any `Deserialize` type.
//!
//! Configuration values arrive from YAML, JSON, TOML and environment
//! variables, so the decoder converts between scalar kinds where the intent
//! is unambiguous: `"8080"` decodes into an integer, `1` into a string,
//! `null` into an empty collection, and a lone scalar into a one-element
//! sequence.

use std::fmt;

use serde::de::{
    self, DeserializeOwned, DeserializeSeed, Deserializer, IntoDeserializer, Visitor,
};

use super::{Node, float_text};

/// Error raised when a node does not fit the requested type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError(String);

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for DecodeError {}

impl de::Error for DecodeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self(msg.to_string())
    }
}

/// Decode `node` into `T`.
///
/// # Errors
///
/// Returns a [`DecodeError`] when the node cannot be converted.
///
/// # Examples
///
/// ```
/// use cascade_config::{Node, from_node};
/// let port: u16 = from_node(&Node::from("8080")).expect("weakly typed");
/// assert_eq!(port, 8080);
/// ```
pub fn from_node<T: DeserializeOwned>(node: &Node) -> Result<T, DecodeError> {
    T::deserialize(node)
}

static NULL: Node = Node::Null;

impl Node {
    fn unexpected(&self) -> de::Unexpected<'_> {
        match self {
            Self::Null => de::Unexpected::Unit,
            Self::Bool(b) => de::Unexpected::Bool(*b),
            Self::Int(i) => de::Unexpected::Signed(*i),
            Self::UInt(u) => de::Unexpected::Unsigned(*u),
            Self::Float(f) => de::Unexpected::Float(*f),
            Self::Str(s) => de::Unexpected::Str(s),
            Self::Seq(_) => de::Unexpected::Seq,
            Self::Map(_) => de::Unexpected::Map,
        }
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "f" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "only integral floats inside the i64 range are converted"
)]
fn integral(f: f64) -> Option<i64> {
    (f.fract() == 0.0 && f >= -9.223_372_036_854_776e18 && f < 9.223_372_036_854_776e18)
        .then_some(f as i64)
}

macro_rules! weak_integer {
    ($method:ident) => {
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
            match self {
                Node::Null => visitor.visit_i64(0),
                Node::Bool(b) => visitor.visit_i64(i64::from(*b)),
                Node::Int(i) => visitor.visit_i64(*i),
                Node::UInt(u) => visitor.visit_u64(*u),
                Node::Float(f) => match integral(*f) {
                    Some(i) => visitor.visit_i64(i),
                    None => visitor.visit_f64(*f),
                },
                Node::Str(s) => {
                    let text = s.trim();
                    if let Ok(i) = text.parse::<i64>() {
                        visitor.visit_i64(i)
                    } else if let Ok(u) = text.parse::<u64>() {
                        visitor.visit_u64(u)
                    } else if text.is_empty() {
                        visitor.visit_i64(0)
                    } else {
                        Err(de::Error::invalid_value(self.unexpected(), &visitor))
                    }
                }
                Node::Seq(_) | Node::Map(_) => {
                    Err(de::Error::invalid_type(self.unexpected(), &visitor))
                }
            }
        }
    };
}

macro_rules! weak_float {
    ($method:ident) => {
        #[expect(
            clippy::cast_precision_loss,
            reason = "integers decoded into floats follow the usual widening rules"
        )]
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
            match self {
                Node::Null => visitor.visit_f64(0.0),
                Node::Bool(b) => visitor.visit_f64(f64::from(u8::from(*b))),
                Node::Int(i) => visitor.visit_f64(*i as f64),
                Node::UInt(u) => visitor.visit_f64(*u as f64),
                Node::Float(f) => visitor.visit_f64(*f),
                Node::Str(s) => match s.trim() {
                    "" => visitor.visit_f64(0.0),
                    text => text
                        .parse::<f64>()
                        .map_err(|_| de::Error::invalid_value(self.unexpected(), &visitor))
                        .and_then(|f| visitor.visit_f64(f)),
                },
                Node::Seq(_) | Node::Map(_) => {
                    Err(de::Error::invalid_type(self.unexpected(), &visitor))
                }
            }
        }
    };
}

impl<'de> Deserializer<'de> for &'de Node {
    type Error = DecodeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self {
            Node::Null => visitor.visit_unit(),
            Node::Bool(b) => visitor.visit_bool(*b),
            Node::Int(i) => visitor.visit_i64(*i),
            Node::UInt(u) => visitor.visit_u64(*u),
            Node::Float(f) => visitor.visit_f64(*f),
            Node::Str(s) => visitor.visit_borrowed_str(s),
            Node::Seq(items) => visit_seq(items, visitor),
            Node::Map(_) => self.deserialize_map(visitor),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self {
            Node::Null => visitor.visit_bool(false),
            Node::Bool(b) => visitor.visit_bool(*b),
            Node::Int(i) => visitor.visit_bool(*i != 0),
            Node::UInt(u) => visitor.visit_bool(*u != 0),
            Node::Float(f) => visitor.visit_bool(*f != 0.0),
            Node::Str(s) => match parse_bool(s) {
                Some(b) => visitor.visit_bool(b),
                None => Err(de::Error::invalid_value(self.unexpected(), &visitor)),
            },
            Node::Seq(_) | Node::Map(_) => Err(de::Error::invalid_type(self.unexpected(), &visitor)),
        }
    }

    weak_integer!(deserialize_i8);
    weak_integer!(deserialize_i16);
    weak_integer!(deserialize_i32);
    weak_integer!(deserialize_i64);
    weak_integer!(deserialize_i128);
    weak_integer!(deserialize_u8);
    weak_integer!(deserialize_u16);
    weak_integer!(deserialize_u32);
    weak_integer!(deserialize_u64);
    weak_integer!(deserialize_u128);
    weak_float!(deserialize_f32);
    weak_float!(deserialize_f64);

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_str(visitor)
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self {
            Node::Null => visitor.visit_str(""),
            Node::Bool(b) => visitor.visit_string(b.to_string()),
            Node::Int(i) => visitor.visit_string(i.to_string()),
            Node::UInt(u) => visitor.visit_string(u.to_string()),
            Node::Float(f) => visitor.visit_string(float_text(*f)),
            Node::Str(s) => visitor.visit_borrowed_str(s),
            Node::Seq(_) | Node::Map(_) => Err(de::Error::invalid_type(self.unexpected(), &visitor)),
        }
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self {
            Node::Str(s) => visitor.visit_borrowed_bytes(s.as_bytes()),
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self {
            Node::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self {
            Node::Null => visitor.visit_unit(),
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self {
            Node::Seq(items) => visit_seq(items, visitor),
            Node::Null => visit_seq(&[], visitor),
            Node::Map(map) if map.is_empty() => visit_seq(&[], visitor),
            Node::Map(_) => Err(de::Error::invalid_type(self.unexpected(), &visitor)),
            scalar => visit_seq(std::slice::from_ref(scalar), visitor),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self {
            Node::Map(map) => visitor.visit_map(MapAccess {
                entries: map.entries().iter(),
                value: None,
            }),
            Node::Null => visitor.visit_map(MapAccess {
                entries: [].iter(),
                value: None,
            }),
            Node::Seq(items) if items.is_empty() => visitor.visit_map(MapAccess {
                entries: [].iter(),
                value: None,
            }),
            _ => Err(de::Error::invalid_type(self.unexpected(), &visitor)),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        match self {
            Node::Str(_) => visitor.visit_enum(EnumAccess {
                variant: self,
                value: None,
            }),
            Node::Map(map) if map.len() == 1 => match map.entries().first() {
                Some((variant, value)) => visitor.visit_enum(EnumAccess {
                    variant,
                    value: Some(value),
                }),
                None => Err(de::Error::invalid_length(0, &"a single-entry map")),
            },
            _ => Err(de::Error::invalid_type(
                self.unexpected(),
                &"a string or single-entry map",
            )),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        match self {
            Node::Str(s) => visitor.visit_borrowed_str(s),
            Node::Int(i) => match u64::try_from(*i) {
                Ok(u) => visitor.visit_u64(u),
                Err(_) => visitor.visit_string(i.to_string()),
            },
            Node::UInt(u) => visitor.visit_u64(*u),
            Node::Bool(b) => visitor.visit_string(b.to_string()),
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        visitor.visit_unit()
    }
}

fn visit_seq<'de, V: Visitor<'de>>(
    items: &'de [Node],
    visitor: V,
) -> Result<V::Value, DecodeError> {
    let mut access = SeqAccess {
        items: items.iter(),
    };
    let value = visitor.visit_seq(&mut access)?;
    match access.items.len() {
        0 => Ok(value),
        remaining => Err(de::Error::invalid_length(
            items.len() - remaining,
            &"fewer elements in sequence",
        )),
    }
}

struct SeqAccess<'de> {
    items: std::slice::Iter<'de, Node>,
}

impl<'de> de::SeqAccess<'de> for SeqAccess<'de> {
    type Error = DecodeError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, DecodeError> {
        self.items.next().map(|item| seed.deserialize(item)).transpose()
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

struct MapAccess<'de> {
    entries: std::slice::Iter<'de, (Node, Node)>,
    value: Option<&'de Node>,
}

impl<'de> de::MapAccess<'de> for MapAccess<'de> {
    type Error = DecodeError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, DecodeError> {
        match self.entries.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(key).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<T::Value, DecodeError> {
        seed.deserialize(self.value.take().unwrap_or(&NULL))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}

struct EnumAccess<'de> {
    variant: &'de Node,
    value: Option<&'de Node>,
}

impl<'de> de::EnumAccess<'de> for EnumAccess<'de> {
    type Error = DecodeError;
    type Variant = VariantAccess<'de>;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> Result<(V::Value, Self::Variant), DecodeError> {
        let variant = seed.deserialize(self.variant)?;
        Ok((variant, VariantAccess { value: self.value }))
    }
}

struct VariantAccess<'de> {
    value: Option<&'de Node>,
}

impl<'de> de::VariantAccess<'de> for VariantAccess<'de> {
    type Error = DecodeError;

    fn unit_variant(self) -> Result<(), DecodeError> {
        match self.value {
            None | Some(Node::Null) => Ok(()),
            Some(other) => Err(de::Error::invalid_type(other.unexpected(), &"unit variant")),
        }
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(
        self,
        seed: T,
    ) -> Result<T::Value, DecodeError> {
        seed.deserialize(self.value.unwrap_or(&NULL))
    }

    fn tuple_variant<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        self.value.unwrap_or(&NULL).deserialize_seq(visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        self.value.unwrap_or(&NULL).deserialize_map(visitor)
    }
}

impl<'de> IntoDeserializer<'de, DecodeError> for &'de Node {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}
