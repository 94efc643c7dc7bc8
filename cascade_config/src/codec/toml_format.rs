//! TOML codec backed by the `toml` crate.

use super::{Codec, CodecError, is_blank};
use crate::{Mapping, Node, document::TextKeys};

/// TOML codec. Date-time values decode as strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlCodec;

fn convert(value: toml::Value) -> Node {
    match value {
        toml::Value::String(s) => Node::Str(s),
        toml::Value::Integer(i) => Node::Int(i),
        toml::Value::Float(f) => Node::Float(f),
        toml::Value::Boolean(b) => Node::Bool(b),
        toml::Value::Datetime(dt) => Node::Str(dt.to_string()),
        toml::Value::Array(items) => Node::Seq(items.into_iter().map(convert).collect()),
        toml::Value::Table(table) => Node::Map(
            table
                .into_iter()
                .map(|(k, v)| (Node::Str(k), convert(v)))
                .collect::<Mapping>(),
        ),
    }
}

impl Codec for TomlCodec {
    fn name(&self) -> &'static str {
        "toml"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["toml"]
    }

    fn decode(&self, bytes: &[u8]) -> Result<Option<Node>, CodecError> {
        let text = std::str::from_utf8(bytes)?;
        if is_blank(text, |line| line.starts_with('#')) {
            return Ok(None);
        }
        let table: toml::Table = toml::from_str(text)?;
        Ok(Some(convert(toml::Value::Table(table))))
    }

    fn encode(&self, node: &Node) -> Result<Vec<u8>, CodecError> {
        Ok(toml::to_string_pretty(&TextKeys(node))?.into_bytes())
    }
}
