//! Environment override pass and indexed sequence discovery.

use std::sync::Arc;

use tracing::{debug, trace};

use super::{Binder, defaults};
use crate::{
    ConfigError, ConfigResult, Mapping, Node,
    env::env_bool,
    schema::{FieldKind, FieldSpec, Schema},
};

/// Upper bound on elements discovered from indexed variables.
const MAX_DISCOVERED_ELEMENTS: usize = 1024;

/// Variable names checked for `field`, most specific first.
fn env_names(prefix: &[String], field: &FieldSpec) -> Vec<String> {
    if let Some(name) = field.env {
        return vec![name.to_owned()];
    }
    let joined = prefix
        .iter()
        .map(String::as_str)
        .chain([field.ident])
        .collect::<Vec<_>>()
        .join("_");
    let upper = joined.to_uppercase();
    if upper == joined {
        vec![joined]
    } else {
        vec![joined, upper]
    }
}

fn nested_prefix(prefix: &[String], field: &FieldSpec) -> Vec<String> {
    let mut nested = prefix.to_vec();
    if !field.anonymous {
        nested.push(field.ident.to_owned());
    }
    nested
}

fn apply_value(kind: &FieldKind, slot: &mut Node, name: &str, raw: &str) -> ConfigResult<()> {
    let parse = || {
        Node::parse_literal(raw)
            .map_err(|e| Arc::new(ConfigError::decode(format!("environment variable {name}"), e)))
    };
    match kind.inner() {
        FieldKind::Bool => *slot = Node::Bool(env_bool(raw)),
        FieldKind::Str => *slot = Node::from(raw),
        FieldKind::Struct(_) | FieldKind::Map => slot.overlay(parse()?),
        _ => *slot = parse()?,
    }
    Ok(())
}

impl Binder<'_> {
    pub(super) fn apply_env(
        &self,
        schema: &Schema,
        map: &mut Mapping,
        prefix: &[String],
    ) -> ConfigResult<()> {
        let mut empty_sequences = Vec::new();
        for field in &schema.fields {
            if field.flatten {
                if let Some(nested) = field.kind.schema() {
                    self.apply_env(nested, map, &nested_prefix(prefix, field))?;
                }
                continue;
            }
            let names = env_names(prefix, field);
            if self.verbose {
                trace!(
                    target_type = schema.type_name,
                    field = field.ident,
                    candidates = %names.join(", "),
                    "trying to load field from environment"
                );
            }
            let slot = map.slot(field.key);
            let found = names.iter().find_map(|name| {
                self.env
                    .lookup(name)
                    .filter(|value| !value.is_empty())
                    .map(|value| (name, value))
            });
            if let Some((name, value)) = found {
                if self.debug || self.verbose {
                    debug!(
                        target_type = schema.type_name,
                        field = field.ident,
                        env = %name,
                        "loading field from environment"
                    );
                }
                apply_value(&field.kind, slot, name, &value)?;
            }
            if field.required && slot.is_zero() {
                return Err(Arc::new(ConfigError::MissingRequired {
                    type_name: schema.type_name,
                    field: field.ident.to_owned(),
                }));
            }
            let nested = nested_prefix(prefix, field);
            match slot {
                Node::Map(inner) => {
                    if let Some(nested_schema) = field.kind.schema() {
                        self.apply_env(nested_schema, inner, &nested)?;
                    }
                }
                Node::Seq(items) => {
                    if let Some(element) = field.kind.element_schema() {
                        if items.is_empty() {
                            empty_sequences.push(field);
                        }
                        for (index, item) in items.iter_mut().enumerate() {
                            if let Node::Map(inner) = item {
                                let mut indexed = nested.clone();
                                indexed.push(index.to_string());
                                self.apply_env(element, inner, &indexed)?;
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        if !empty_sequences.is_empty() && !map.values().all(Node::is_zero) {
            for field in empty_sequences {
                self.discover_elements(field, map, prefix);
            }
        }
        Ok(())
    }

    /// Build sequence elements purely from indexed variables such as
    /// `APP_SERVERS_0_HOST`. Stops at the first index whose variables leave
    /// the element zero or fail to bind; discovery never fails the
    /// surrounding bind.
    fn discover_elements(&self, field: &FieldSpec, map: &mut Mapping, prefix: &[String]) {
        let Some(element) = field.kind.element_schema() else {
            return;
        };
        let base = nested_prefix(prefix, field);
        let mut discovered = Vec::new();
        for index in 0..MAX_DISCOVERED_ELEMENTS {
            let mut indexed = base.clone();
            indexed.push(index.to_string());
            match self.indexed_element(element, &indexed) {
                Ok(Some(candidate)) => discovered.push(candidate),
                Ok(None) => break,
                Err(err) => {
                    trace!(field = field.ident, index, error = %err, "stopping element discovery");
                    break;
                }
            }
        }
        if !discovered.is_empty() {
            debug!(
                field = field.ident,
                count = discovered.len(),
                "discovered sequence elements from environment"
            );
            *map.slot(field.key) = Node::Seq(discovered);
        }
    }

    /// `None` when the variables under `prefix` leave the zero element
    /// unchanged; otherwise the element built from its defaults with the
    /// variables applied on top, so explicit `false` or `0` values survive.
    fn indexed_element(&self, element: &Schema, prefix: &[String]) -> ConfigResult<Option<Node>> {
        let mut bare = element.zero();
        if let Node::Map(inner) = &mut bare {
            self.apply_env(element, inner, prefix)?;
        }
        if bare.is_zero() {
            return Ok(None);
        }
        let mut candidate = element.zero();
        if let Node::Map(inner) = &mut candidate {
            defaults::apply(element, inner)?;
            self.apply_env(element, inner, prefix)?;
        }
        Ok(Some(candidate))
    }
}
