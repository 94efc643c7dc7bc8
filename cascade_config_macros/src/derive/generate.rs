//! Token generation for the schema and trait impls.

use proc_macro2::TokenStream;
use quote::quote;
use syn::DeriveInput;

use super::{BindableInput, FieldInput, parse_input};

fn optional(value: Option<&str>) -> TokenStream {
    value.map_or_else(
        || quote! { ::core::option::Option::None },
        |text| quote! { ::core::option::Option::Some(#text) },
    )
}

pub(crate) fn field_spec(field: &FieldInput, krate: &syn::Path) -> TokenStream {
    let FieldInput {
        ident,
        key,
        ty,
        flatten,
        attrs,
    } = field;
    let kind = if attrs.opaque {
        quote! { #krate::FieldKind::Other }
    } else {
        quote! { <#ty as #krate::Describe>::kind() }
    };
    let default = optional(attrs.default.as_deref());
    let env = optional(attrs.env.as_deref());
    let required = attrs.required;
    let anonymous = attrs.anonymous;
    quote! {
        #krate::FieldSpec {
            ident: #ident,
            key: #key,
            kind: #kind,
            default: #default,
            env: #env,
            required: #required,
            anonymous: #anonymous,
            flatten: #flatten,
        }
    }
}

pub(crate) fn generate(input: &BindableInput) -> TokenStream {
    let BindableInput {
        ident,
        crate_path: krate,
        fields,
    } = input;
    let type_name = ident.to_string();
    let specs = fields.iter().map(|field| field_spec(field, krate));
    quote! {
        impl #krate::Bindable for #ident {
            fn schema() -> &'static #krate::Schema {
                static SCHEMA: ::std::sync::OnceLock<#krate::Schema> = ::std::sync::OnceLock::new();
                SCHEMA.get_or_init(|| #krate::Schema {
                    type_name: #type_name,
                    fields: ::std::vec![#(#specs),*],
                })
            }
        }

        impl #krate::Describe for #ident {
            fn kind() -> #krate::FieldKind {
                #krate::FieldKind::Struct(<Self as #krate::Bindable>::schema)
            }
        }
    }
}

/// Expand the derive for `input`.
pub(crate) fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    parse_input(input).map(|parsed| generate(&parsed))
}
