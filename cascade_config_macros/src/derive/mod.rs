//! Expansion of `#[derive(Bindable)]`.

mod generate;
mod parse;
mod serde_attrs;

pub(crate) use generate::expand;
pub(crate) use parse::{BindableInput, FieldInput, parse_input};
