//! Parsing of the deriving struct and its `#[bind(...)]` attributes.

use syn::{
    Attribute, Data, DeriveInput, Fields, Ident, Lit, LitStr, Type, ext::IdentExt,
    meta::ParseNestedMeta,
};

use super::serde_attrs::{self, RenameRule};

/// Field-level `#[bind(...)]` tags.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct BindAttrs {
    pub default: Option<String>,
    pub env: Option<String>,
    pub required: bool,
    pub anonymous: bool,
    pub opaque: bool,
}

/// One serialised field of the deriving struct.
#[derive(Clone)]
pub(crate) struct FieldInput {
    pub ident: String,
    pub key: String,
    pub ty: Type,
    pub flatten: bool,
    pub attrs: BindAttrs,
}

/// The deriving struct, reduced to what generation needs.
pub(crate) struct BindableInput {
    pub ident: Ident,
    pub crate_path: syn::Path,
    pub fields: Vec<FieldInput>,
}

fn bind_attrs(attrs: &[Attribute]) -> impl Iterator<Item = &Attribute> {
    attrs.iter().filter(|attr| attr.path().is_ident("bind"))
}

/// Text of a literal used as a default: strings verbatim, numbers and
/// booleans as written.
fn literal_text(meta: &ParseNestedMeta, key: &str) -> syn::Result<String> {
    match meta.value()?.parse::<Lit>()? {
        Lit::Str(text) => Ok(text.value()),
        Lit::Int(int) => Ok(int.base10_digits().to_owned()),
        Lit::Float(float) => Ok(float.base10_digits().to_owned()),
        Lit::Bool(flag) => Ok(flag.value.to_string()),
        other => Err(syn::Error::new(
            other.span(),
            format!("{key} must be a string, number or boolean literal"),
        )),
    }
}

fn lit_str(meta: &ParseNestedMeta, key: &str) -> syn::Result<String> {
    let Lit::Str(text) = meta.value()?.parse::<Lit>()? else {
        return Err(meta.error(format!("{key} must be a string literal")));
    };
    Ok(text.value())
}

pub(crate) fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<BindAttrs> {
    let mut out = BindAttrs::default();
    for attr in bind_attrs(attrs) {
        attr.parse_nested_meta(|meta| {
            let Some(key) = meta.path.get_ident().map(ToString::to_string) else {
                return Err(meta.error("expected a bind attribute name"));
            };
            match key.as_str() {
                "default" => out.default = Some(literal_text(&meta, "default")?),
                "env" => {
                    let name = lit_str(&meta, "env")?;
                    if name.is_empty() {
                        return Err(meta.error("env must not be empty"));
                    }
                    out.env = Some(name);
                }
                "required" => out.required = true,
                "anonymous" => out.anonymous = true,
                "opaque" => out.opaque = true,
                other => return Err(meta.error(format!("unknown bind attribute `{other}`"))),
            }
            Ok(())
        })?;
    }
    Ok(out)
}

fn parse_crate_path(attrs: &[Attribute]) -> syn::Result<syn::Path> {
    let mut out: syn::Path = syn::parse_quote!(::cascade_config);
    for attr in bind_attrs(attrs) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("crate") {
                out = meta.value()?.parse::<LitStr>()?.parse()?;
                Ok(())
            } else {
                Err(meta.error("only `crate` is accepted on the struct"))
            }
        })?;
    }
    Ok(out)
}

fn parse_field(field: &syn::Field, rename_all: Option<RenameRule>) -> syn::Result<Option<FieldInput>> {
    let Some(ident) = field.ident.as_ref() else {
        return Err(syn::Error::new_spanned(field, "unnamed fields are not supported"));
    };
    let serde = serde_attrs::field(&field.attrs)?;
    let attrs = parse_field_attrs(&field.attrs)?;
    if serde.skip {
        return Ok(None);
    }
    let name = ident.unraw().to_string();
    let key = serde
        .rename
        .unwrap_or_else(|| rename_all.map_or_else(|| name.clone(), |rule| rule.apply(&name)));
    if serde.flatten && (attrs.default.is_some() || attrs.env.is_some() || attrs.required) {
        return Err(syn::Error::new_spanned(
            ident,
            "flattened fields cannot carry default, env or required",
        ));
    }
    Ok(Some(FieldInput {
        ident: name,
        key,
        ty: field.ty.clone(),
        flatten: serde.flatten,
        attrs,
    }))
}

/// Validate the derive input and collect its fields.
pub(crate) fn parse_input(input: &DeriveInput) -> syn::Result<BindableInput> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Bindable cannot be derived for generic structs",
        ));
    }
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Bindable can only be derived for structs",
        ));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(syn::Error::new_spanned(
            data.struct_token,
            "Bindable requires named fields",
        ));
    };
    let rename_all = serde_attrs::rename_all(&input.attrs)?;
    let mut fields = Vec::with_capacity(named.named.len());
    for field in &named.named {
        fields.extend(parse_field(field, rename_all)?);
    }
    Ok(BindableInput {
        ident: input.ident.clone(),
        crate_path: parse_crate_path(&input.attrs)?,
        fields,
    })
}
