//! Deterministic multi-source document merging.
//!
//! Sources are folded left to right, so later sources take precedence.
//! Mappings merge key by key, sequences replace wholesale and scalars either
//! override (permissive) or must agree (strict). A mapping, sequence and
//! scalar can never be merged into one another.

use std::sync::Arc;

use tracing::trace;

use crate::{
    ConfigError, ConfigResult, Mapping, Node,
    codec::Codec,
    expand::escape,
};

/// One named document contributing to a merge.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    name: String,
    document: Option<Node>,
    escaped: bool,
}

impl Source {
    /// Wrap an already decoded document. `None` means the source was blank.
    #[must_use]
    pub fn new(name: impl Into<String>, document: Option<Node>) -> Self {
        Self {
            name: name.into(),
            document,
            escaped: false,
        }
    }

    /// Decode `bytes` with `codec`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Decode`] when the codec rejects the bytes.
    pub fn parse(name: impl Into<String>, bytes: &[u8], codec: &dyn Codec) -> ConfigResult<Self> {
        let name = name.into();
        let document = codec
            .decode(bytes)
            .map_err(|e| Arc::new(ConfigError::decode(name.as_str(), e)))?;
        Ok(Self::new(name, document))
    }

    /// Protect `${...}` sequences in this source from variable expansion.
    #[must_use]
    pub const fn escaped(mut self) -> Self {
        self.escaped = true;
        self
    }

    pub(crate) const fn plain(mut self) -> Self {
        self.escaped = false;
        self
    }

    /// Name used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Decoded document, or `None` for a blank source.
    #[must_use]
    pub const fn document(&self) -> Option<&Node> {
        self.document.as_ref()
    }

    /// Whether placeholders in this source are protected from expansion.
    #[must_use]
    pub const fn is_escaped(&self) -> bool {
        self.escaped
    }
}

/// Folds ordered sources into a single document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentMerger {
    strict: bool,
}

impl DocumentMerger {
    /// Create a merger; `strict` rejects conflicting scalars and repeated keys.
    #[must_use]
    pub const fn new(strict: bool) -> Self {
        Self { strict }
    }

    /// Merge `sources`, lowest priority first.
    ///
    /// Returns `Ok(None)` when no source carried a document. A source whose
    /// whole document is `null` contributes nothing beyond marking the result
    /// as present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateKey`] for conflicting scalars or
    /// repeated keys under strict merging, and
    /// [`ConfigError::StructuralConflict`] when shapes disagree.
    pub fn merge(&self, sources: &[Source]) -> ConfigResult<Option<Node>> {
        let mut merged: Option<Node> = None;
        for source in sources {
            let Some(document) = source.document() else {
                trace!(source = source.name(), "skipping blank source");
                continue;
            };
            let mut path = Vec::new();
            let document = self.normalise(document, source.escaped, &mut path)?;
            merged = Some(match merged {
                None => document,
                Some(current) if document == Node::Null => current,
                Some(current) => self.merge_nodes(current, document, &mut path)?,
            });
        }
        Ok(merged)
    }

    /// Collapse repeated keys and apply escaping, producing a canonical tree.
    fn normalise(&self, node: &Node, escaped: bool, path: &mut Vec<String>) -> ConfigResult<Node> {
        match node {
            Node::Map(map) => {
                let mut out = Mapping::new();
                for (key, value) in map.iter() {
                    path.push(key.key_text());
                    let value = self.normalise(value, escaped, path)?;
                    if out.insert(key.clone(), value).is_some() && self.strict {
                        return Err(ConfigError::duplicate_key(dotted(path)));
                    }
                    path.pop();
                }
                Ok(Node::Map(out))
            }
            Node::Seq(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    path.push(index.to_string());
                    out.push(self.normalise(item, escaped, path)?);
                    path.pop();
                }
                Ok(Node::Seq(out))
            }
            Node::Str(text) if escaped => Ok(Node::Str(escape(text))),
            scalar => Ok(scalar.clone()),
        }
    }

    fn merge_nodes(&self, current: Node, incoming: Node, path: &mut Vec<String>) -> ConfigResult<Node> {
        match (current, incoming) {
            (Node::Map(mut current), Node::Map(incoming)) => {
                for (key, value) in incoming {
                    match current.get_mut(&key) {
                        Some(slot) => {
                            path.push(key.key_text());
                            let previous = std::mem::take(slot);
                            *slot = self.merge_nodes(previous, value, path)?;
                            path.pop();
                        }
                        None => {
                            current.insert(key, value);
                        }
                    }
                }
                Ok(Node::Map(current))
            }
            (_, Node::Null) => Ok(Node::Null),
            (Node::Null, incoming) | (Node::Seq(_), incoming @ Node::Seq(_)) => Ok(incoming),
            (current, incoming) if current.is_scalar() && incoming.is_scalar() => {
                if self.strict && current != incoming {
                    return Err(ConfigError::duplicate_key(dotted(path)));
                }
                Ok(incoming)
            }
            (current, incoming) => Err(Arc::new(ConfigError::StructuralConflict {
                path: dotted(path),
                existing: current.shape().name(),
                incoming: incoming.shape().name(),
            })),
        }
    }
}

fn dotted(path: &[String]) -> String {
    if path.is_empty() {
        "<root>".to_owned()
    } else {
        path.join(".")
    }
}

/// Merge `sources` with a [`DocumentMerger`].
///
/// # Errors
///
/// See [`DocumentMerger::merge`].
pub fn merge(sources: &[Source], strict: bool) -> ConfigResult<Option<Node>> {
    DocumentMerger::new(strict).merge(sources)
}

#[cfg(test)]
#[expect(
    clippy::expect_used,
    reason = "clippy::expect_used is denied globally; tests may not hit those branches"
)]
mod tests {
    use anyhow::{Result, anyhow, ensure};
    use rstest::rstest;

    use super::{Source, merge};
    use crate::{
        ConfigError, Node,
        codec::{Codec, JsonCodec, YamlCodec},
    };

    fn yaml(name: &str, text: &str) -> Source {
        Source::parse(name, text.as_bytes(), &YamlCodec)
            .unwrap_or_else(|e| panic!("fixture {name} should parse: {e}"))
    }

    fn merged(sources: &[Source], strict: bool) -> Result<Option<Node>> {
        merge(sources, strict).map_err(|e| anyhow!(e.to_string()))
    }

    #[rstest]
    fn strict_merge_combines_disjoint_keys() -> Result<()> {
        let out = merged(
            &[yaml("a", "a: 1\nb:\n  x: 1\n"), yaml("b", "b:\n  y: 2\n")],
            true,
        )?;
        let expected = yaml("want", "a: 1\nb:\n  x: 1\n  y: 2\n");
        ensure!(out.as_ref() == expected.document(), "got {out:?}");
        Ok(())
    }

    #[rstest]
    #[case::equal("k: 1\n", true)]
    #[case::different("k: 2\n", false)]
    fn strict_merge_compares_scalars(#[case] later: &str, #[case] ok: bool) {
        let result = merge(&[yaml("a", "k: 1\n"), yaml("b", later)], true);
        match result {
            Ok(_) => assert!(ok, "expected a duplicate key error"),
            Err(err) => {
                assert!(!ok, "unexpected error {err}");
                assert!(
                    matches!(err.as_ref(), ConfigError::DuplicateKey { path } if path == "k"),
                    "{err}"
                );
            }
        }
    }

    #[rstest]
    fn permissive_merge_prefers_later_sources() -> Result<()> {
        let out = merged(
            &[yaml("a", "k: 1\nlist: [1, 2, 3]\n"), yaml("b", "k: 2\nlist: [9]\n")],
            false,
        )?;
        let expected = yaml("want", "k: 2\nlist: [9]\n");
        ensure!(out.as_ref() == expected.document(), "got {out:?}");
        Ok(())
    }

    #[rstest]
    #[case::strict(true)]
    #[case::permissive(false)]
    fn shape_mismatch_is_always_an_error(#[case] strict: bool) {
        let err = merge(&[yaml("a", "b:\n  x: 1\n"), yaml("b", "b: 2\n")], strict)
            .expect_err("expected structural conflict");
        assert!(
            matches!(
                err.as_ref(),
                ConfigError::StructuralConflict { path, existing: "mapping", incoming: "scalar" }
                    if path == "b"
            ),
            "{err}"
        );
    }

    #[rstest]
    fn repeated_keys_in_one_source() -> Result<()> {
        let document = JsonCodec
            .decode(br#"{"a": 1, "a": 2}"#)
            .map_err(|e| anyhow!(e.to_string()))?;
        let source = Source::new("dup", document);
        let strict = merge(std::slice::from_ref(&source), true).expect_err("strict rejects");
        ensure!(matches!(strict.as_ref(), ConfigError::DuplicateKey { .. }));
        let permissive = merged(&[source], false)?;
        let expected = yaml("want", "a: 2\n");
        ensure!(permissive.as_ref() == expected.document());
        Ok(())
    }

    #[rstest]
    fn null_sources_are_distinct_from_no_document() -> Result<()> {
        ensure!(merged(&[yaml("blank", "# nothing\n")], true)?.is_none());
        ensure!(merged(&[yaml("null", "~\n")], true)? == Some(Node::Null));
        let out = merged(&[yaml("a", "a: 1\n"), yaml("null", "null\n")], true)?;
        ensure!(out.as_ref() == yaml("want", "a: 1\n").document());
        Ok(())
    }

    #[rstest]
    fn nested_null_overrides_lower_priority_values() -> Result<()> {
        let out = merged(&[yaml("a", "a:\n  x: 1\n"), yaml("b", "a: null\n")], true)?;
        ensure!(out.as_ref() == yaml("want", "a: null\n").document());
        Ok(())
    }

    #[rstest]
    fn escaped_sources_double_dollar_signs() -> Result<()> {
        let out = merged(&[yaml("raw", "t: ${HOME}\n").escaped()], true)?;
        ensure!(out.as_ref() == yaml("want", "t: $${HOME}\n").document());
        Ok(())
    }
}
