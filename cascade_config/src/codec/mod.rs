//! Document codecs and extension-based format selection.

mod json;
#[cfg(feature = "toml")]
mod toml_format;
mod yaml;

use std::sync::Arc;

use camino::Utf8Path;
use tracing::trace;

use crate::{ConfigError, ConfigResult, Node};

pub use json::JsonCodec;
#[cfg(feature = "toml")]
pub use toml_format::TomlCodec;
pub use yaml::YamlCodec;
pub(crate) use yaml::{parse_yaml, render_yaml};

/// Boxed error returned by codec implementations.
pub type CodecError = Box<dyn std::error::Error + Send + Sync>;

/// A document format that can be decoded into, and encoded from, a [`Node`].
pub trait Codec: Send + Sync {
    /// Format name, for example `"yaml"`.
    fn name(&self) -> &'static str;

    /// File extensions and aliases handled by this codec, without the dot.
    fn extensions(&self) -> &'static [&'static str];

    /// Decode `bytes`. Blank documents yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns the underlying parser error when the bytes are malformed.
    fn decode(&self, bytes: &[u8]) -> Result<Option<Node>, CodecError>;

    /// Encode `node` in this format.
    ///
    /// # Errors
    ///
    /// Returns an error when the node cannot be represented in the format.
    fn encode(&self, node: &Node) -> Result<Vec<u8>, CodecError>;
}

/// Registry of codecs keyed by extension.
#[derive(Clone)]
pub struct Codecs {
    codecs: Vec<Arc<dyn Codec>>,
}

impl std::fmt::Debug for Codecs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.codecs.iter().map(|c| c.name()))
            .finish()
    }
}

impl Default for Codecs {
    fn default() -> Self {
        let mut codecs: Vec<Arc<dyn Codec>> = vec![Arc::new(YamlCodec), Arc::new(JsonCodec)];
        #[cfg(feature = "toml")]
        codecs.push(Arc::new(TomlCodec));
        Self { codecs }
    }
}

impl Codecs {
    /// Registry without any codecs.
    #[must_use]
    pub const fn empty() -> Self {
        Self { codecs: Vec::new() }
    }

    /// Register `codec`, taking precedence over codecs registered earlier for
    /// the same extension.
    #[must_use]
    pub fn with(mut self, codec: impl Codec + 'static) -> Self {
        self.codecs.insert(0, Arc::new(codec));
        self
    }

    /// Look up a codec by name or alias, ignoring ASCII case.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Codec> {
        self.codecs
            .iter()
            .find(|c| {
                c.name().eq_ignore_ascii_case(name)
                    || c.extensions().iter().any(|e| e.eq_ignore_ascii_case(name))
            })
            .map(AsRef::as_ref)
    }

    /// Select the codec for `path` from its extension.
    #[must_use]
    pub fn for_path(&self, path: &Utf8Path) -> Option<&dyn Codec> {
        self.get(path.extension()?)
    }

    /// Decode the contents of `path`.
    ///
    /// Files with an unrecognised extension are probed as JSON and then as
    /// YAML; when both fail the YAML error is reported.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Decode`] naming `path` when decoding fails.
    pub fn decode_path(&self, path: &Utf8Path, bytes: &[u8]) -> ConfigResult<Option<Node>> {
        if let Some(codec) = self.for_path(path) {
            trace!(path = %path, codec = codec.name(), "decoding configuration file");
            return codec
                .decode(bytes)
                .map_err(|e| Arc::new(ConfigError::decode(path.as_str(), e)));
        }
        trace!(path = %path, "unknown extension, probing JSON then YAML");
        if let Ok(node) = JsonCodec.decode(bytes) {
            return Ok(node);
        }
        YamlCodec
            .decode(bytes)
            .map_err(|e| Arc::new(ConfigError::decode(path.as_str(), e)))
    }
}

/// Returns `true` when every line is blank or satisfies `is_filler`.
fn is_blank(text: &str, is_filler: impl Fn(&str) -> bool) -> bool {
    text.lines().map(str::trim).all(|line| line.is_empty() || is_filler(line))
}

#[cfg(test)]
mod tests;
