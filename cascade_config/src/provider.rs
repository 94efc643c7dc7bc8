//! Read-only views over merged documents.
//!
//! A [`Provider`] answers path lookups; a [`Value`] is a lazy handle on one
//! path that only touches the document when decoded. Decoding always goes
//! through a fresh copy of the sub-tree, so callers can never mutate what the
//! provider holds.

use std::{fmt, sync::Arc};

use camino::Utf8Path;
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::{
    ConfigError, ConfigResult, Node, Path, ROOT,
    codec::{Codec, Codecs, YamlCodec},
    document::{from_node, to_node},
    expand::expand_node,
    fs::{FileSystem, OsFileSystem},
    merge::{DocumentMerger, Source},
};

/// Name given to providers built without one.
pub const DEFAULT_PROVIDER_NAME: &str = "YAML";

/// Variable lookup used for placeholder expansion.
pub type Lookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Anything that can answer path lookups against a document.
///
/// [`Provider::get`] works the same on concrete providers and on
/// `&dyn Provider`.
pub trait Provider: AsProvider + Send + Sync {
    /// Name reported by [`Value::source`].
    fn name(&self) -> &str;

    /// The node at `path`, if any.
    fn at(&self, path: &Path) -> Option<&Node>;

    /// A lazy view of the value at the dotted `key`.
    fn get(&self, key: &str) -> Value<'_> {
        Value::new(self.as_provider(), Path::parse(key))
    }
}

/// Upcast to a trait object; implemented for every sized [`Provider`].
pub trait AsProvider {
    /// `self` as a `&dyn Provider`.
    fn as_provider(&self) -> &dyn Provider;
}

impl<P: Provider> AsProvider for P {
    fn as_provider(&self) -> &dyn Provider {
        self
    }
}

/// A path into a provider, resolved on demand.
#[derive(Clone)]
pub struct Value<'a> {
    provider: &'a dyn Provider,
    path: Path,
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("provider", &self.provider.name())
            .field("path", &self.path)
            .finish()
    }
}

impl<'a> Value<'a> {
    fn new(provider: &'a dyn Provider, path: Path) -> Self {
        Self { provider, path }
    }

    /// Descend into the dotted `key`. [`ROOT`] returns the same value.
    #[must_use]
    pub fn get(&self, key: &str) -> Self {
        if key == ROOT {
            return self.clone();
        }
        Self::new(self.provider, self.path.join(key))
    }

    /// Returns `true` when the provider holds a node at this path.
    #[must_use]
    pub fn has(&self) -> bool {
        self.node().is_some()
    }

    /// Borrow the node at this path.
    #[must_use]
    pub fn node(&self) -> Option<&'a Node> {
        self.provider.at(&self.path)
    }

    /// Path this value addresses.
    #[must_use]
    pub const fn path(&self) -> &Path {
        &self.path
    }

    /// Name of the owning provider.
    #[must_use]
    pub fn source(&self) -> &'a str {
        self.provider.name()
    }

    /// Decode the value into a fresh `T`; `None` when the path is absent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Decode`] when the node does not fit `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> ConfigResult<Option<T>> {
        self.node()
            .map(|node| from_node(node).map_err(|e| self.decode_error(e)))
            .transpose()
    }

    /// Merge the value into an already populated `target`.
    ///
    /// Fields the document omits keep their current values. An absent path
    /// leaves `target` untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTarget`] when `target` cannot be
    /// serialised and [`ConfigError::Decode`] when the merged node does not
    /// fit `T`.
    pub fn populate<T: Serialize + DeserializeOwned>(&self, target: &mut T) -> ConfigResult<()> {
        let Some(node) = self.node() else {
            return Ok(());
        };
        let mut base = to_node(target)?;
        base.overlay(node.clone());
        *target = from_node(&base).map_err(|e| self.decode_error(e))?;
        Ok(())
    }

    fn decode_error(&self, err: impl fmt::Display) -> Arc<ConfigError> {
        let origin = if self.path.is_root() {
            self.provider.name().to_owned()
        } else {
            format!("{}:{}", self.provider.name(), self.path)
        };
        Arc::new(ConfigError::decode(origin, err))
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.node().map_or(Ok(()), |node| fmt::Display::fmt(node, f))
    }
}

/// A provider over one merged document.
///
/// # Examples
///
/// ```
/// use cascade_config::{DocumentProvider, Provider};
/// let provider = DocumentProvider::builder()
///     .source("server: {port: 80}")
///     .source("server: {host: example.org}")
///     .build()
///     .expect("sources merge");
/// let port: Option<u16> = provider.get("server.port").decode().expect("decodes");
/// assert_eq!(port, Some(80));
/// assert!(provider.get("server.host").has());
/// ```
#[derive(Clone)]
pub struct DocumentProvider {
    name: String,
    document: Option<Node>,
    sources: Vec<Source>,
    lookup: Option<Lookup>,
}

impl fmt::Debug for DocumentProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentProvider")
            .field("name", &self.name)
            .field("document", &self.document)
            .field("sources", &self.sources.len())
            .field("expands", &self.lookup.is_some())
            .finish()
    }
}

impl PartialEq for DocumentProvider {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.document == other.document
    }
}

impl DocumentProvider {
    /// Wrap an already merged document.
    #[must_use]
    pub fn new(name: impl Into<String>, document: Option<Node>) -> Self {
        let name = name.into();
        Self {
            sources: vec![Source::new(name.as_str(), document.clone())],
            name,
            document,
            lookup: None,
        }
    }

    /// Merge `sources` and expand the result when `lookup` is set.
    ///
    /// Without a lookup the sources are merged as plain text, so escaping
    /// never leaks into the document.
    fn assemble(
        name: String,
        sources: Vec<Source>,
        lookup: Option<Lookup>,
        strict: bool,
    ) -> ConfigResult<Self> {
        let sources: Vec<Source> = if lookup.is_some() {
            sources
        } else {
            sources.into_iter().map(Source::plain).collect()
        };
        let merged = DocumentMerger::new(strict).merge(&sources)?;
        let document = match (merged, &lookup) {
            (Some(node), Some(lookup)) => Some(expand_node(lookup.as_ref(), node)?),
            (merged, _) => merged,
        };
        debug!(provider = %name, sources = sources.len(), "built document provider");
        Ok(Self {
            name,
            document,
            sources,
            lookup,
        })
    }

    /// Start building a provider from ordered sources.
    #[must_use]
    pub fn builder() -> DocumentProviderBuilder {
        DocumentProviderBuilder::default()
    }

    /// The whole merged document.
    #[must_use]
    pub const fn document(&self) -> Option<&Node> {
        self.document.as_ref()
    }

    /// A provider whose sources are `defaults` followed by this provider's
    /// own sources, merged permissively.
    ///
    /// The defaults are the lowest priority source and are never expanded.
    /// A source whose whole document is `null` keeps the defaults, while a
    /// nested `null` replaces the default beneath it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTarget`] when `defaults` cannot be
    /// serialised, [`ConfigError::StructuralConflict`] when its shape
    /// clashes with a source and the expansion error when a placeholder no
    /// longer resolves.
    pub fn with_default<T: Serialize + ?Sized>(&self, defaults: &T) -> ConfigResult<Self> {
        let lowest = Source::new("defaults", Some(to_node(defaults)?)).escaped();
        let sources = std::iter::once(lowest)
            .chain(self.sources.iter().cloned())
            .collect();
        Self::assemble(self.name.clone(), sources, self.lookup.clone(), false)
    }
}

impl Provider for DocumentProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn at(&self, path: &Path) -> Option<&Node> {
        path.resolve(self.document.as_ref()?)
    }
}

/// Collects sources for a [`DocumentProvider`].
///
/// Errors raised while adding sources are kept until [`build`] so the chain
/// stays fluent.
///
/// [`build`]: DocumentProviderBuilder::build
pub struct DocumentProviderBuilder {
    name: String,
    sources: Vec<Source>,
    errors: Vec<Arc<ConfigError>>,
    lookup: Option<Lookup>,
    strict: bool,
}

impl Default for DocumentProviderBuilder {
    fn default() -> Self {
        Self {
            name: DEFAULT_PROVIDER_NAME.to_owned(),
            sources: Vec::new(),
            errors: Vec::new(),
            lookup: None,
            strict: true,
        }
    }
}

impl fmt::Debug for DocumentProviderBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentProviderBuilder")
            .field("name", &self.name)
            .field("sources", &self.sources)
            .field("errors", &self.errors)
            .field("expands", &self.lookup.is_some())
            .field("strict", &self.strict)
            .finish()
    }
}

impl DocumentProviderBuilder {
    fn source_name(&self) -> String {
        format!("{}#{}", self.name, self.sources.len() + self.errors.len())
    }

    fn push(mut self, source: ConfigResult<Source>) -> Self {
        match source {
            Ok(source) => self.sources.push(source),
            Err(err) => self.errors.push(err),
        }
        self
    }

    /// Name reported by the built provider.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add a YAML source. Later sources take precedence.
    #[must_use]
    pub fn source(self, bytes: impl AsRef<[u8]>) -> Self {
        self.source_with(&YamlCodec, bytes)
    }

    /// Add a source decoded with `codec`.
    #[must_use]
    pub fn source_with(self, codec: &dyn Codec, bytes: impl AsRef<[u8]>) -> Self {
        let name = self.source_name();
        self.push(Source::parse(name, bytes.as_ref(), codec))
    }

    /// Add a YAML source whose `${...}` text is never expanded.
    #[must_use]
    pub fn raw_source(self, bytes: impl AsRef<[u8]>) -> Self {
        let name = self.source_name();
        self.push(Source::parse(name, bytes.as_ref(), &YamlCodec).map(Source::escaped))
    }

    /// Add a serialisable value as a source. Its strings are never expanded.
    #[must_use]
    pub fn static_value<T: Serialize + ?Sized>(self, value: &T) -> Self {
        let name = self.source_name();
        self.push(to_node(value).map(|node| Source::new(name, Some(node)).escaped()))
    }

    /// Add the file at `path`, choosing the codec from its extension.
    #[must_use]
    pub fn file(self, path: impl AsRef<Utf8Path>) -> Self {
        let path = path.as_ref();
        let source = OsFileSystem
            .read_file(path)
            .map_err(|e| ConfigError::file(path, e))
            .and_then(|bytes| Codecs::default().decode_path(path, &bytes))
            .map(|document| Source::new(path.as_str(), document));
        self.push(source)
    }

    /// Expand `${NAME}` placeholders with `lookup` after merging.
    #[must_use]
    pub fn expand<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.lookup = Some(Arc::new(lookup));
        self
    }

    /// Let later sources override conflicting scalars and repeated keys.
    #[must_use]
    pub const fn permissive(mut self) -> Self {
        self.strict = false;
        self
    }

    /// Merge the collected sources.
    ///
    /// # Errors
    ///
    /// Returns the error of a source that failed to load (aggregated when
    /// several did), or the merge or expansion error.
    pub fn build(self) -> ConfigResult<DocumentProvider> {
        if let Some(err) = ConfigError::try_aggregate(self.errors) {
            return Err(Arc::new(err));
        }
        DocumentProvider::assemble(self.name, self.sources, self.lookup, self.strict)
    }
}

/// Restricts every lookup of `inner` to the sub-tree under `prefix`.
#[derive(Debug, Clone)]
pub struct ScopedProvider<P> {
    prefix: Path,
    inner: P,
}

impl<P: Provider> ScopedProvider<P> {
    /// Scope `inner` to the dotted `prefix`.
    #[must_use]
    pub fn new(prefix: &str, inner: P) -> Self {
        Self {
            prefix: Path::parse(prefix),
            inner,
        }
    }
}

impl<P: Provider> Provider for ScopedProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn at(&self, path: &Path) -> Option<&Node> {
        self.inner.at(&self.prefix.concat(path))
    }
}

/// Merge several providers, later ones taking precedence on conflicts.
///
/// # Errors
///
/// Returns [`ConfigError::StructuralConflict`] when the providers disagree on
/// the shape of a path.
pub fn provider_group(name: &str, providers: &[&dyn Provider]) -> ConfigResult<DocumentProvider> {
    let root = Path::root();
    let sources: Vec<Source> = providers
        .iter()
        .map(|provider| Source::new(provider.name(), provider.at(&root).cloned()))
        .collect();
    let document = DocumentMerger::new(false).merge(&sources)?;
    Ok(DocumentProvider::new(name, document))
}

/// A provider without any values.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopProvider;

impl Provider for NopProvider {
    fn name(&self) -> &str {
        "no-op"
    }

    fn at(&self, _path: &Path) -> Option<&Node> {
        None
    }
}

#[cfg(test)]
#[expect(
    clippy::expect_used,
    reason = "clippy::expect_used is denied globally; tests may not hit those branches"
)]
mod tests {
    use std::collections::BTreeMap;

    use anyhow::{Result, anyhow, ensure};
    use rstest::rstest;
    use serde::{Deserialize, Serialize};

    use super::{DocumentProvider, NopProvider, Provider, ScopedProvider, provider_group};
    use crate::{ConfigError, JsonCodec, ROOT};

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Server {
        host: String,
        port: u16,
        tags: Vec<String>,
    }

    fn build(sources: &[&str]) -> Result<DocumentProvider> {
        sources
            .iter()
            .fold(DocumentProvider::builder(), |builder, source| builder.source(source))
            .build()
            .map_err(|e| anyhow!(e.to_string()))
    }

    #[rstest]
    fn later_sources_merge_over_earlier_ones() -> Result<()> {
        let provider = build(&["a: 1\nb: {x: 1}\n", "b: {y: 2}\n"])?;
        let merged: Option<BTreeMap<String, serde_json::Value>> =
            provider.get(ROOT).decode().map_err(|e| anyhow!(e.to_string()))?;
        ensure!(
            merged == Some(serde_json::from_str(r#"{"a":1,"b":{"x":1,"y":2}}"#)?),
            "unexpected merge: {merged:?}"
        );
        Ok(())
    }

    #[rstest]
    fn strict_by_default_and_permissive_on_request() -> Result<()> {
        let err = DocumentProvider::builder()
            .source("a: 1")
            .source("a: 2")
            .build()
            .expect_err("conflicting scalars are rejected");
        ensure!(matches!(*err, ConfigError::DuplicateKey { .. }));
        let provider = DocumentProvider::builder()
            .source("a: 1")
            .source("a: 2")
            .permissive()
            .build()
            .map_err(|e| anyhow!(e.to_string()))?;
        ensure!(provider.get("a").decode::<i64>().ok().flatten() == Some(2));
        Ok(())
    }

    #[rstest]
    fn value_navigation_and_root() -> Result<()> {
        let provider = build(&["server:\n  host: example.org\n  port: 80\n"])?;
        let server = provider.get("server");
        ensure!(server.get(ROOT).path() == server.path());
        ensure!(server.get("port").has());
        ensure!(!server.get("missing").has());
        ensure!(!provider.get("server.port.deeper").has(), "scalars have no children");
        ensure!(server.source() == "YAML");
        ensure!(server.get("host").to_string() == "example.org");
        Ok(())
    }

    #[rstest]
    fn populate_keeps_fields_the_document_omits() -> Result<()> {
        let provider = build(&["server:\n  port: 8080\n"])?;
        let mut server = Server {
            host: "localhost".to_owned(),
            port: 80,
            tags: vec!["a".to_owned()],
        };
        provider
            .get("server")
            .populate(&mut server)
            .map_err(|e| anyhow!(e.to_string()))?;
        ensure!(server.host == "localhost" && server.port == 8080 && server.tags == ["a"]);
        provider
            .get("absent")
            .populate(&mut server)
            .map_err(|e| anyhow!(e.to_string()))?;
        ensure!(server.port == 8080, "absent paths leave the target alone");
        Ok(())
    }

    #[rstest]
    fn decode_of_missing_path_is_none() -> Result<()> {
        let provider = build(&["a: 1"])?;
        let value: Option<Server> = provider.get("b").decode().map_err(|e| anyhow!(e.to_string()))?;
        ensure!(value.is_none());
        Ok(())
    }

    #[rstest]
    fn decode_failure_names_the_path() -> Result<()> {
        let provider = build(&["server:\n  port: [1, 2]\n"])?;
        let err = provider
            .get("server")
            .decode::<Server>()
            .expect_err("a sequence is not a port");
        ensure!(err.to_string().contains("YAML:server"), "{err}");
        Ok(())
    }

    #[rstest]
    fn expansion_skips_raw_and_static_sources() -> Result<()> {
        let provider = DocumentProvider::builder()
            .source("a: ${USER_NAME|nobody}\nb: $${LITERAL}\n")
            .raw_source("c: ${RAW}\n")
            .static_value(&BTreeMap::from([("d", "${STATIC}")]))
            .expand(|name: &str| (name == "USER_NAME").then(|| "ada".to_owned()))
            .build()
            .map_err(|e| anyhow!(e.to_string()))?;
        for (key, expected) in [("a", "ada"), ("b", "${LITERAL}"), ("c", "${RAW}"), ("d", "${STATIC}")] {
            let found: Option<String> = provider.get(key).decode().map_err(|e| anyhow!(e.to_string()))?;
            ensure!(found.as_deref() == Some(expected), "{key}: {found:?}");
        }
        Ok(())
    }

    #[rstest]
    fn undefined_variables_fail_the_build() {
        let err = DocumentProvider::builder()
            .source("a: ${MISSING}")
            .expand(|_: &str| None)
            .build()
            .expect_err("undefined variable");
        assert!(matches!(*err, ConfigError::UndefinedVariable { .. }), "{err}");
    }

    #[rstest]
    fn without_lookup_placeholders_are_kept_verbatim() -> Result<()> {
        let provider = DocumentProvider::builder()
            .raw_source("a: ${X}")
            .build()
            .map_err(|e| anyhow!(e.to_string()))?;
        ensure!(provider.get("a").decode::<String>().ok().flatten().as_deref() == Some("${X}"));
        Ok(())
    }

    #[rstest]
    fn source_errors_surface_from_build() {
        let err = DocumentProvider::builder()
            .source_with(&JsonCodec, "{ broken")
            .source("fine: true")
            .build()
            .expect_err("broken JSON");
        assert!(matches!(*err, ConfigError::Decode { .. }), "{err}");
    }

    #[rstest]
    fn defaults_sit_below_the_document() -> Result<()> {
        let defaults = BTreeMap::from([("server", BTreeMap::from([("host", "localhost")]))]);
        let provider = build(&["server:\n  port: 8080\n"])?
            .with_default(&defaults)
            .map_err(|e| anyhow!(e.to_string()))?;
        let server: Option<Server> = provider.get("server").decode().map_err(|e| anyhow!(e.to_string()))?;
        ensure!(
            server
                == Some(Server {
                    host: "localhost".to_owned(),
                    port: 8080,
                    tags: Vec::new(),
                })
        );
        Ok(())
    }

    #[rstest]
    fn null_source_keeps_defaults_and_nested_null_replaces_them() -> Result<()> {
        let whole = DocumentProvider::builder()
            .source("~")
            .build()
            .and_then(|p| p.with_default(&serde_json::json!({"a": 1})))
            .map_err(|e| anyhow!(e.to_string()))?;
        ensure!(whole.get("a").decode::<i64>().ok().flatten() == Some(1));

        let nested = build(&["a: ~\n"])?
            .with_default(&serde_json::json!({"a": 1, "b": 2}))
            .map_err(|e| anyhow!(e.to_string()))?;
        ensure!(nested.get("a").node() == Some(&crate::Node::Null));
        ensure!(nested.get("b").decode::<i64>().ok().flatten() == Some(2));
        Ok(())
    }

    #[rstest]
    fn defaults_are_not_expanded_and_sources_still_are() -> Result<()> {
        let provider = DocumentProvider::builder()
            .source("host: ${HOST}\n")
            .expand(|name: &str| (name == "HOST").then(|| "example.org".to_owned()))
            .build()
            .and_then(|p| p.with_default(&serde_json::json!({"banner": "${HOST}"})))
            .map_err(|e| anyhow!(e.to_string()))?;
        for (key, expected) in [("host", "example.org"), ("banner", "${HOST}")] {
            let found: Option<String> = provider.get(key).decode().map_err(|e| anyhow!(e.to_string()))?;
            ensure!(found.as_deref() == Some(expected), "{key}: {found:?}");
        }
        Ok(())
    }

    #[rstest]
    fn scoped_and_grouped_providers() -> Result<()> {
        let base = build(&["app:\n  name: base\n  port: 1\n"])?;
        let overlay = build(&["app:\n  port: 2\n"])?;
        let group = provider_group("group", &[&base, &overlay, &NopProvider])
            .map_err(|e| anyhow!(e.to_string()))?;
        let scoped = ScopedProvider::new("app", group);
        ensure!(scoped.name() == "group");
        ensure!(scoped.get("port").decode::<u16>().ok().flatten() == Some(2));
        ensure!(scoped.get("name").decode::<String>().ok().flatten().as_deref() == Some("base"));
        Ok(())
    }

    #[rstest]
    fn nop_provider_has_nothing() {
        let provider: &dyn Provider = &NopProvider;
        assert_eq!(provider.name(), "no-op");
        assert!(!provider.get(ROOT).has());
        assert!(!NopProvider.get("a").has());
    }

    #[rstest]
    fn get_resolves_on_concrete_and_dyn_providers() -> Result<()> {
        let provider = build(&["a: 1\n"])?;
        let concrete = provider.get("a").decode::<i64>().map_err(|e| anyhow!(e.to_string()))?;
        let erased: &dyn Provider = &provider;
        let dynamic = erased.get("a").decode::<i64>().map_err(|e| anyhow!(e.to_string()))?;
        let boxed: Box<dyn Provider> = Box::new(provider.clone());
        let owned = boxed.get("a").decode::<i64>().map_err(|e| anyhow!(e.to_string()))?;
        ensure!(concrete == Some(1) && dynamic == concrete && owned == concrete);
        Ok(())
    }
}
