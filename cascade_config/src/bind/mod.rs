//! Populates bindable structs from defaults, documents and the environment.
//!
//! Binding runs in a fixed order on the target's document form:
//!
//! 1. defaults are applied to zero fields, recursing into nested structs and
//!    struct sequence elements;
//! 2. the sub-document for the registered key is overlaid, so document values
//!    win over defaults but never erase fields the document omits; struct
//!    sequence elements in the document start from their defaults first;
//! 3. environment variables override individual fields, and empty struct
//!    sequences are discovered from indexed variables;
//! 4. `required` fields that are still zero fail the bind.
//!
//! The resulting node is decoded back into the target.

mod defaults;
mod environment;

use std::sync::Arc;

use tracing::trace;

use crate::{
    Bindable, ConfigError, ConfigResult, Node, Path,
    document::{from_node, to_node},
    env::EnvLookup,
};

/// Binds targets for one environment prefix.
///
/// # Examples
///
/// ```
/// use cascade_config::{Bindable, Binder, MapEnv, Path};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Default, Serialize, Deserialize, Bindable)]
/// struct Main {
///     #[bind(default = "1")]
///     a: String,
///     #[bind(default = "2")]
///     b: i64,
/// }
///
/// let env = MapEnv::new().with("APP_MAIN_A", "hello");
/// let binder = Binder::for_key(&env, Some("APP"), &Path::parse("main"));
/// let mut main = Main::default();
/// binder.bind(&mut main, None).expect("binds");
/// assert_eq!((main.a.as_str(), main.b), ("hello", 2));
/// ```
pub struct Binder<'a> {
    env: &'a dyn EnvLookup,
    prefix: Vec<String>,
    verbose: bool,
    debug: bool,
}

impl std::fmt::Debug for Binder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binder")
            .field("prefix", &self.prefix)
            .field("verbose", &self.verbose)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

impl<'a> Binder<'a> {
    /// Binder with no environment prefix.
    #[must_use]
    pub fn new(env: &'a dyn EnvLookup) -> Self {
        Self {
            env,
            prefix: Vec::new(),
            verbose: false,
            debug: false,
        }
    }

    /// Binder whose variable names start with `env_prefix` followed by the
    /// upper-cased segments of `key`.
    #[must_use]
    pub fn for_key(env: &'a dyn EnvLookup, env_prefix: Option<&str>, key: &Path) -> Self {
        let prefix = env_prefix
            .map(str::to_owned)
            .into_iter()
            .chain(key.segments().iter().map(|s| s.to_uppercase()))
            .collect();
        Self::new(env).with_prefix(prefix)
    }

    /// Replace the prefix segments.
    #[must_use]
    pub fn with_prefix(mut self, prefix: Vec<String>) -> Self {
        self.prefix = prefix;
        self
    }

    /// Log every environment lookup.
    #[must_use]
    pub const fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Log every environment value that is applied.
    #[must_use]
    pub const fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Prefix segments used for derived variable names.
    #[must_use]
    pub fn prefix(&self) -> &[String] {
        &self.prefix
    }

    /// Populate `target` from `document` and the environment.
    ///
    /// Returns the document form of the bound value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTarget`] when `T` does not serialise to
    /// a mapping, [`ConfigError::MissingRequired`] for blank required fields
    /// and [`ConfigError::Decode`] when a default, variable or document value
    /// does not fit its field.
    pub fn bind<T: Bindable>(&self, target: &mut T, document: Option<&Node>) -> ConfigResult<Node> {
        let schema = T::schema();
        let mut node = to_node(&*target)?;
        if !matches!(node, Node::Map(_)) {
            return Err(ConfigError::invalid_target(format!(
                "{} serialises to a {}, expected a mapping",
                schema.type_name,
                node.shape().name()
            )));
        }
        if let Node::Map(map) = &mut node {
            defaults::apply(schema, map)?;
        }
        if let Some(document) = document {
            trace!(target_type = schema.type_name, "overlaying document");
            let mut incoming = document.clone();
            if let Node::Map(map) = &mut incoming {
                defaults::complete_elements(schema, map)?;
            }
            node.overlay(incoming);
        }
        if let Node::Map(map) = &mut node {
            self.apply_env(schema, map, &self.prefix)?;
        }
        *target = from_node(&node)
            .map_err(|e| Arc::new(ConfigError::decode(schema.type_name, e)))?;
        Ok(node)
    }
}

#[cfg(test)]
mod tests;
