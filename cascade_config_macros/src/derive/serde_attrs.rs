//! Serde attribute parsing.
//!
//! The schema records the document key serde reads and writes for each
//! field, so `rename` and `rename_all` must be honoured, `skip`ped fields
//! omitted and `flatten`ed ones marked.

use heck::{
    ToKebabCase, ToLowerCamelCase, ToShoutyKebabCase, ToShoutySnakeCase, ToSnakeCase,
    ToUpperCamelCase,
};
use syn::meta::ParseNestedMeta;
use syn::{Attribute, LitStr, Token};

/// Supported `#[serde(rename_all = "...")]` rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    fn parse(value: &LitStr) -> syn::Result<Self> {
        match value.value().as_str() {
            "lowercase" => Ok(Self::Lower),
            "UPPERCASE" => Ok(Self::Upper),
            "PascalCase" => Ok(Self::Pascal),
            "camelCase" => Ok(Self::Camel),
            "snake_case" => Ok(Self::Snake),
            "SCREAMING_SNAKE_CASE" => Ok(Self::ScreamingSnake),
            "kebab-case" => Ok(Self::Kebab),
            "SCREAMING-KEBAB-CASE" => Ok(Self::ScreamingKebab),
            other => Err(syn::Error::new(
                value.span(),
                format!("unsupported serde rename_all value '{other}'"),
            )),
        }
    }

    pub(crate) fn apply(self, field_name: &str) -> String {
        match self {
            Self::Lower => field_name.to_ascii_lowercase(),
            Self::Upper => field_name.to_ascii_uppercase(),
            Self::Pascal => field_name.to_upper_camel_case(),
            Self::Camel => field_name.to_lower_camel_case(),
            Self::Snake => field_name.to_snake_case(),
            Self::ScreamingSnake => field_name.to_shouty_snake_case(),
            Self::Kebab => field_name.to_kebab_case(),
            Self::ScreamingKebab => field_name.to_shouty_kebab_case(),
        }
    }
}

/// Serde options found on one field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct SerdeField {
    pub rename: Option<String>,
    pub skip: bool,
    pub flatten: bool,
}

/// Consume the value of a key this crate does not interpret.
pub(crate) fn discard_unknown(meta: &ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        meta.value()?.parse::<proc_macro2::TokenStream>()?;
    } else if meta.input.peek(syn::token::Paren) {
        let content;
        syn::parenthesized!(content in meta.input);
        content.parse::<proc_macro2::TokenStream>()?;
    }
    Ok(())
}

fn serde_attrs(attrs: &[Attribute]) -> impl Iterator<Item = &Attribute> {
    attrs.iter().filter(|attr| attr.path().is_ident("serde"))
}

/// Parse `#[serde(rename_all = "...")]` from container attributes.
pub(crate) fn rename_all(attrs: &[Attribute]) -> syn::Result<Option<RenameRule>> {
    let mut out = None;
    for attr in serde_attrs(attrs) {
        attr.parse_nested_meta(|meta| {
            if !meta.path.is_ident("rename_all") {
                return discard_unknown(&meta);
            }
            if meta.input.peek(Token![=]) {
                out = Some(RenameRule::parse(&meta.value()?.parse()?)?);
                return Ok(());
            }
            meta.parse_nested_meta(|nested| {
                if nested.path.is_ident("serialize") {
                    out = Some(RenameRule::parse(&nested.value()?.parse()?)?);
                    Ok(())
                } else {
                    discard_unknown(&nested)
                }
            })
        })?;
    }
    Ok(out)
}

/// Parse the serde options of one field.
pub(crate) fn field(attrs: &[Attribute]) -> syn::Result<SerdeField> {
    let mut out = SerdeField::default();
    for attr in serde_attrs(attrs) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                out.skip = true;
                Ok(())
            } else if meta.path.is_ident("flatten") {
                out.flatten = true;
                Ok(())
            } else if meta.path.is_ident("rename") {
                parse_rename(&meta, &mut out.rename)
            } else {
                discard_unknown(&meta)
            }
        })?;
    }
    Ok(out)
}

fn parse_rename(meta: &ParseNestedMeta, rename: &mut Option<String>) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        *rename = Some(meta.value()?.parse::<LitStr>()?.value());
        return Ok(());
    }
    meta.parse_nested_meta(|nested| {
        if nested.path.is_ident("serialize") {
            *rename = Some(nested.value()?.parse::<LitStr>()?.value());
            Ok(())
        } else {
            discard_unknown(&nested)
        }
    })
}
