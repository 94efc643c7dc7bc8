//! JSON codec backed by `serde_json`.

use super::{Codec, CodecError, is_blank};
use crate::{Node, document::TextKeys};

/// JSON codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["json"]
    }

    fn decode(&self, bytes: &[u8]) -> Result<Option<Node>, CodecError> {
        let text = std::str::from_utf8(bytes)?;
        if is_blank(text, |_| false) {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(text)?))
    }

    fn encode(&self, node: &Node) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec_pretty(&TextKeys(node))?)
    }
}
