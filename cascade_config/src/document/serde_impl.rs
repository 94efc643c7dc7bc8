//! `Serialize` and `Deserialize` for [`Node`].

use std::fmt;

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, MapAccess, SeqAccess, Visitor},
};

use super::{Mapping, Node};

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::UInt(u) => serializer.serialize_u64(*u),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::Str(s) => serializer.serialize_str(s),
            Self::Seq(items) => serializer.collect_seq(items),
            Self::Map(map) => serializer.collect_map(map.iter()),
        }
    }
}

/// Serialises a node with every mapping key rendered as text, for formats
/// whose keys must be strings.
pub(crate) struct TextKeys<'a>(pub(crate) &'a Node);

impl Serialize for TextKeys<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Node::Seq(items) => serializer.collect_seq(items.iter().map(TextKeys)),
            Node::Map(map) => {
                serializer.collect_map(map.iter().map(|(key, value)| (key.key_text(), TextKeys(value))))
            }
            other => other.serialize(serializer),
        }
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = Node;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any configuration value")
    }

    fn visit_bool<E>(self, v: bool) -> Result<Node, E> {
        Ok(Node::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Node, E> {
        Ok(Node::Int(v))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Node, E> {
        Ok(i64::try_from(v).map_or(Node::UInt(v), Node::Int))
    }

    #[expect(
        clippy::cast_precision_loss,
        reason = "integers beyond 64 bits have no exact document form"
    )]
    fn visit_i128<E>(self, v: i128) -> Result<Node, E> {
        Ok(i64::try_from(v).map(Node::Int).unwrap_or_else(|_| {
            u64::try_from(v).map_or(Node::Float(v as f64), Node::UInt)
        }))
    }

    #[expect(
        clippy::cast_precision_loss,
        reason = "integers beyond 64 bits have no exact document form"
    )]
    fn visit_u128<E>(self, v: u128) -> Result<Node, E> {
        Ok(i64::try_from(v).map(Node::Int).unwrap_or_else(|_| {
            u64::try_from(v).map_or(Node::Float(v as f64), Node::UInt)
        }))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Node, E> {
        Ok(Node::Float(v))
    }

    fn visit_str<E>(self, v: &str) -> Result<Node, E> {
        Ok(Node::Str(v.to_owned()))
    }

    fn visit_string<E>(self, v: String) -> Result<Node, E> {
        Ok(Node::Str(v))
    }

    fn visit_unit<E>(self) -> Result<Node, E> {
        Ok(Node::Null)
    }

    fn visit_none<E>(self) -> Result<Node, E> {
        Ok(Node::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Node, D::Error> {
        deserializer.deserialize_any(Self)
    }

    fn visit_newtype_struct<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> Result<Node, D::Error> {
        Node::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Node, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Node::Seq(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Node, A::Error> {
        // Duplicates are kept here and resolved by the merger.
        let mut map = Mapping::new();
        while let Some((key, value)) = access.next_entry::<Node, Node>()? {
            map.push_raw(key, value);
        }
        Ok(Node::Map(map))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Node, E> {
        Ok(Node::Seq(v.iter().map(|b| Node::Int(i64::from(*b))).collect()))
    }
}

impl<'de> Deserialize<'de> for Node {
    /// Goes through `deserialize_option` so formats that only report plain
    /// `~`, `null` or empty scalars as absent values still yield
    /// [`Node::Null`].
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_option(NodeVisitor)
    }
}
