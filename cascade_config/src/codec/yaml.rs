//! YAML codec backed by `serde-saphyr`.

use serde::{Serialize, Serializer};
use serde_saphyr::{FlowMap, FlowSeq, Options};

use super::{Codec, CodecError, is_blank};
use crate::Node;

/// YAML 1.2 codec. `yes`/`no` stay strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

/// Parse YAML text into a node using strict boolean semantics.
///
/// Text holding only whitespace, comments or document markers yields
/// `Ok(None)`.
pub(crate) fn parse_yaml(text: &str) -> Result<Option<Node>, serde_saphyr::Error> {
    if is_blank(text, |line| {
        line.starts_with('#') || line == "---" || line == "..."
    }) {
        return Ok(None);
    }
    serde_saphyr::from_str_with_options(
        text,
        Options {
            strict_booleans: true,
            ..Options::default()
        },
    )
    .map(Some)
}

/// Emits empty collections in flow style so they read back as `[]` and
/// `{}` rather than null.
struct Yaml<'a>(&'a Node);

impl Serialize for Yaml<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Node::Seq(items) if items.is_empty() => FlowSeq(self.0).serialize(serializer),
            Node::Map(map) if map.is_empty() => FlowMap(self.0).serialize(serializer),
            Node::Seq(items) => serializer.collect_seq(items.iter().map(Yaml)),
            Node::Map(map) => serializer.collect_map(map.iter().map(|(k, v)| (Yaml(k), Yaml(v)))),
            scalar => scalar.serialize(serializer),
        }
    }
}

/// Render `node` as block-style YAML ending in a newline.
pub(crate) fn render_yaml(node: &Node) -> Result<String, CodecError> {
    Ok(serde_saphyr::to_string(&Yaml(node))?)
}

impl Codec for YamlCodec {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["yaml", "yml"]
    }

    fn decode(&self, bytes: &[u8]) -> Result<Option<Node>, CodecError> {
        let text = std::str::from_utf8(bytes)?;
        Ok(parse_yaml(text)?)
    }

    fn encode(&self, node: &Node) -> Result<Vec<u8>, CodecError> {
        Ok(render_yaml(node)?.into_bytes())
    }
}
