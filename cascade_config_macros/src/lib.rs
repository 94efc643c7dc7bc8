//! Procedural macros for `cascade_config`.
//!
//! `#[derive(Bindable)]` builds the schema descriptor the binder walks:
//! one entry per serialised field carrying its document key, kind and the
//! `#[bind(...)]` tags.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod derive;

/// Derive macro for `cascade_config::Bindable`.
///
/// Field attributes:
///
/// - `#[bind(default = "...")]` literal applied while the field is zero;
/// - `#[bind(env = "NAME")]` explicit environment variable;
/// - `#[bind(required)]` fail binding when the field stays zero;
/// - `#[bind(anonymous)]` keep a nested struct out of environment prefixes;
/// - `#[bind(opaque)]` treat a type without a `Describe` impl as a scalar.
///
/// The container attribute `#[bind(crate = "path")]` points generated code
/// at a re-exported copy of the runtime crate.
#[proc_macro_derive(Bindable, attributes(bind))]
pub fn derive_bindable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

#[cfg(test)]
mod tests;
