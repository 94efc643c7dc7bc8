//! Per-type schema descriptors consumed by the binder.
//!
//! `#[derive(Bindable)]` builds one [`Schema`] per struct the first time it
//! is requested and caches it for the life of the process.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Serialize, de::DeserializeOwned};

use crate::{Mapping, Node};

/// A struct that can be populated from defaults, documents and environment
/// variables.
///
/// Implement it with `#[derive(Bindable)]`.
pub trait Bindable: Serialize + DeserializeOwned {
    /// Cached schema describing the struct's fields.
    fn schema() -> &'static Schema;
}

/// Field layout of a bindable struct.
#[derive(Debug)]
pub struct Schema {
    /// Name of the struct, used in error messages.
    pub type_name: &'static str,
    /// Fields in declaration order. Skipped fields are omitted.
    pub fields: Vec<FieldSpec>,
}

/// One field of a bindable struct.
#[derive(Debug)]
pub struct FieldSpec {
    /// Rust field name, used to derive environment variable names.
    pub ident: &'static str,
    /// Document key after serde renaming.
    pub key: &'static str,
    /// Shape of the field's type.
    pub kind: FieldKind,
    /// Literal applied when the field is zero before documents are read.
    pub default: Option<&'static str>,
    /// Explicit environment variable name.
    pub env: Option<&'static str>,
    /// Fail binding when the field is still zero at the end.
    pub required: bool,
    /// Nested struct that does not add its name to environment prefixes.
    pub anonymous: bool,
    /// Field flattened into the parent mapping by serde.
    pub flatten: bool,
}

/// Shape of a field type as far as binding is concerned.
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// `bool`.
    Bool,
    /// Strings, characters and paths.
    Str,
    /// Any integer type.
    Integer,
    /// `f32` or `f64`.
    Float,
    /// `Option<T>`.
    Optional(Box<FieldKind>),
    /// Sequences and sets.
    Seq(Box<FieldKind>),
    /// Maps.
    Map,
    /// A nested bindable struct.
    Struct(fn() -> &'static Schema),
    /// Anything else; treated as an opaque scalar.
    Other,
}

impl FieldKind {
    /// Strip any number of `Option` layers.
    #[must_use]
    pub fn inner(&self) -> &Self {
        match self {
            Self::Optional(inner) => inner.inner(),
            other => other,
        }
    }

    /// Schema of the struct this kind holds, looking through `Option`.
    #[must_use]
    pub fn schema(&self) -> Option<&'static Schema> {
        match self.inner() {
            Self::Struct(schema) => Some(schema()),
            _ => None,
        }
    }

    /// Schema of the struct elements of a sequence kind.
    #[must_use]
    pub fn element_schema(&self) -> Option<&'static Schema> {
        match self.inner() {
            Self::Seq(element) => element.schema(),
            _ => None,
        }
    }

    /// Zero value of this kind as a document node.
    #[must_use]
    pub fn zero(&self) -> Node {
        match self {
            Self::Bool => Node::Bool(false),
            Self::Str => Node::Str(String::new()),
            Self::Integer => Node::Int(0),
            Self::Float => Node::Float(0.0),
            Self::Seq(_) => Node::Seq(Vec::new()),
            Self::Map => Node::Map(Mapping::new()),
            Self::Struct(schema) => schema().zero(),
            Self::Optional(_) | Self::Other => Node::Null,
        }
    }
}

impl Schema {
    /// Zero value of the whole struct.
    #[must_use]
    pub fn zero(&self) -> Node {
        let mut map = Mapping::new();
        self.write_zero(&mut map);
        Node::Map(map)
    }

    fn write_zero(&self, map: &mut Mapping) {
        for field in &self.fields {
            match (field.flatten, field.kind.schema()) {
                (true, Some(nested)) => nested.write_zero(map),
                _ => {
                    map.insert(Node::from(field.key), field.kind.zero());
                }
            }
        }
    }
}

/// Reports the [`FieldKind`] of a type.
///
/// Implemented for the standard scalar, string, path and collection types.
/// `#[derive(Bindable)]` implements it for the deriving struct; other types
/// can implement it by hand or mark fields `#[bind(opaque)]`.
pub trait Describe {
    /// Kind of `Self`.
    fn kind() -> FieldKind;
}

macro_rules! describe_as {
    ($kind:ident: $($ty:ty),+ $(,)?) => {
        $(impl Describe for $ty {
            fn kind() -> FieldKind {
                FieldKind::$kind
            }
        })+
    };
}

describe_as!(Bool: bool);
describe_as!(Str: String, char, PathBuf, Utf8PathBuf);
describe_as!(Integer: i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
describe_as!(Float: f32, f64);
describe_as!(Other: std::time::Duration, Node);

impl<T: Describe> Describe for Option<T> {
    fn kind() -> FieldKind {
        FieldKind::Optional(Box::new(T::kind()))
    }
}

impl<T: Describe> Describe for Box<T> {
    fn kind() -> FieldKind {
        T::kind()
    }
}

macro_rules! describe_seq {
    ($($ty:ident),+) => {
        $(impl<T: Describe> Describe for $ty<T> {
            fn kind() -> FieldKind {
                FieldKind::Seq(Box::new(T::kind()))
            }
        })+
    };
}

describe_seq!(Vec, VecDeque, BTreeSet);

impl<T: Describe, S> Describe for HashSet<T, S> {
    fn kind() -> FieldKind {
        FieldKind::Seq(Box::new(T::kind()))
    }
}

impl<K, V> Describe for BTreeMap<K, V> {
    fn kind() -> FieldKind {
        FieldKind::Map
    }
}

impl<K, V, S> Describe for HashMap<K, V, S> {
    fn kind() -> FieldKind {
        FieldKind::Map
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rstest::rstest;

    use super::{Describe, FieldKind};
    use crate::Node;

    #[rstest]
    fn describes_nested_options_and_collections() {
        assert!(matches!(
            Option::<Vec<u8>>::kind(),
            FieldKind::Optional(inner) if matches!(*inner, FieldKind::Seq(_))
        ));
        assert!(matches!(HashMap::<String, u8>::kind(), FieldKind::Map));
        assert!(matches!(Option::<Option<bool>>::kind().inner(), FieldKind::Bool));
    }

    #[rstest]
    #[case(FieldKind::Bool, Node::Bool(false))]
    #[case(FieldKind::Str, Node::from(""))]
    #[case(FieldKind::Integer, Node::Int(0))]
    #[case(FieldKind::Optional(Box::new(FieldKind::Integer)), Node::Null)]
    fn zero_values(#[case] kind: FieldKind, #[case] expected: Node) {
        assert_eq!(kind.zero(), expected);
        assert!(kind.zero().is_zero());
    }
}
