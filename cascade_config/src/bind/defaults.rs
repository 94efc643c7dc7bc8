//! Default application pass.

use std::sync::Arc;

use crate::{
    ConfigError, ConfigResult, Mapping, Node,
    schema::{FieldKind, FieldSpec, Schema},
};

/// Apply `default` literals to zero fields of `map`, recursing into nested
/// structs and struct sequence elements.
pub(super) fn apply(schema: &Schema, map: &mut Mapping) -> ConfigResult<()> {
    for field in &schema.fields {
        if field.flatten {
            if let Some(nested) = field.kind.schema() {
                apply(nested, map)?;
            }
            continue;
        }
        let slot = map.slot(field.key);
        if slot.is_zero()
            && let Some(literal) = field.default
        {
            *slot = parse_default(schema, field, literal)?;
        }
        descend(&field.kind, slot, apply)?;
    }
    Ok(())
}

/// Complete the struct sequence elements of an incoming document before it
/// is overlaid. Each element starts from its defaulted zero value and the
/// document's element is overlaid on top, so explicit zero values such as
/// `false` or `0` survive while omitted fields take their defaults.
pub(super) fn complete_elements(schema: &Schema, map: &mut Mapping) -> ConfigResult<()> {
    for field in &schema.fields {
        if field.flatten {
            if let Some(nested) = field.kind.schema() {
                complete_elements(nested, map)?;
            }
            continue;
        }
        match map.get_str_mut(field.key) {
            Some(Node::Map(inner)) => {
                if let Some(nested) = field.kind.schema() {
                    complete_elements(nested, inner)?;
                }
            }
            Some(Node::Seq(items)) => {
                if let Some(element) = field.kind.element_schema() {
                    for item in items {
                        complete_element(element, item)?;
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn complete_element(element: &Schema, item: &mut Node) -> ConfigResult<()> {
    let Node::Map(incoming) = item else {
        return Ok(());
    };
    complete_elements(element, incoming)?;
    let mut completed = element.zero();
    if let Node::Map(base) = &mut completed {
        apply(element, base)?;
    }
    completed.overlay(std::mem::take(item));
    *item = completed;
    Ok(())
}

fn descend(
    kind: &FieldKind,
    slot: &mut Node,
    pass: fn(&Schema, &mut Mapping) -> ConfigResult<()>,
) -> ConfigResult<()> {
    match slot {
        Node::Map(inner) => {
            if let Some(nested) = kind.schema() {
                pass(nested, inner)?;
            }
        }
        Node::Seq(items) => {
            if let Some(element) = kind.element_schema() {
                for item in items {
                    if let Node::Map(inner) = item {
                        pass(element, inner)?;
                    }
                }
            }
        }
        _ => {}
    }
    Ok(())
}

/// String fields take the literal verbatim; everything else is parsed as a
/// YAML scalar or flow collection.
fn parse_default(schema: &Schema, field: &FieldSpec, literal: &str) -> ConfigResult<Node> {
    if matches!(field.kind.inner(), FieldKind::Str) {
        return Ok(Node::from(literal));
    }
    Node::parse_literal(literal).map_err(|e| {
        Arc::new(ConfigError::decode(
            format!("default for {}.{}", schema.type_name, field.ident),
            e,
        ))
    })
}
