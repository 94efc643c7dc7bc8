//! Unit tests for attribute parsing and schema generation.

use anyhow::{Context, Result, anyhow, ensure};
use quote::ToTokens;
use rstest::rstest;
use syn::{DeriveInput, parse_quote};

use crate::derive::{expand, parse_input};

fn parsed(input: &DeriveInput) -> Result<crate::derive::BindableInput> {
    parse_input(input).map_err(|e| anyhow!(e.to_string()))
}

#[rstest]
fn collects_bind_tags_and_keys() -> Result<()> {
    let input: DeriveInput = parse_quote! {
        struct Main {
            #[bind(default = "1", env = "TEST_A")]
            a: String,
            #[bind(default = 2, required)]
            b: i64,
            #[bind(anonymous)]
            logging: Logging,
        }
    };
    let parsed = parsed(&input)?;
    let [a, b, logging] = parsed.fields.as_slice() else {
        return Err(anyhow!("expected three fields"));
    };
    ensure!(a.attrs.default.as_deref() == Some("1") && a.attrs.env.as_deref() == Some("TEST_A"));
    ensure!(b.attrs.default.as_deref() == Some("2"), "numeric literals keep their text");
    ensure!(b.attrs.required && !b.attrs.anonymous);
    ensure!(logging.attrs.anonymous && logging.key == "logging");
    ensure!(parsed.crate_path.to_token_stream().to_string() == ":: cascade_config");
    Ok(())
}

#[rstest]
#[case::rename_all(parse_quote! {
    #[serde(rename_all = "kebab-case")]
    struct S { max_connections: u32 }
}, "max_connections", "max-connections")]
#[case::field_rename(parse_quote! {
    #[serde(rename_all = "UPPERCASE")]
    struct S { #[serde(rename = "db")] database: Database }
}, "database", "db")]
#[case::raw_ident(parse_quote! {
    struct S { r#type: String }
}, "type", "type")]
fn keys_follow_serde(#[case] input: DeriveInput, #[case] ident: &str, #[case] key: &str) -> Result<()> {
    let parsed = parsed(&input)?;
    let field = parsed.fields.first().context("one field")?;
    ensure!(field.ident == ident, "ident {}", field.ident);
    ensure!(field.key == key, "key {}", field.key);
    Ok(())
}

#[rstest]
fn skipped_fields_are_omitted_and_flatten_is_recorded() -> Result<()> {
    let input: DeriveInput = parse_quote! {
        struct S {
            #[serde(skip)]
            cache: Vec<u8>,
            #[serde(flatten)]
            common: Common,
            name: String,
        }
    };
    let parsed = parsed(&input)?;
    let names: Vec<_> = parsed.fields.iter().map(|f| (f.ident.as_str(), f.flatten)).collect();
    ensure!(names == [("common", true), ("name", false)], "{names:?}");
    Ok(())
}

#[rstest]
#[case::generic(parse_quote! { struct S<T> { value: T } }, "generic")]
#[case::tuple(parse_quote! { struct S(u8); }, "named fields")]
#[case::enumeration(parse_quote! { enum E { A } }, "only be derived for structs")]
#[case::unknown_tag(parse_quote! { struct S { #[bind(dflt = "1")] a: u8 } }, "unknown bind attribute")]
#[case::empty_env(parse_quote! { struct S { #[bind(env = "")] a: u8 } }, "must not be empty")]
#[case::flatten_default(parse_quote! {
    struct S { #[serde(flatten)] #[bind(default = "x")] c: Common }
}, "flattened")]
#[case::bad_rename_all(parse_quote! {
    #[serde(rename_all = "Title Case")]
    struct S { a: u8 }
}, "unsupported serde rename_all")]
fn rejects_unsupported_input(#[case] input: DeriveInput, #[case] message: &str) -> Result<()> {
    let Err(err) = parse_input(&input) else {
        return Err(anyhow!("input should be rejected"));
    };
    ensure!(err.to_string().contains(message), "unexpected error: {err}");
    Ok(())
}

#[rstest]
fn generates_cached_schema_and_describe() -> Result<()> {
    let input: DeriveInput = parse_quote! {
        #[bind(crate = "my_config")]
        struct Server {
            #[bind(default = "80")]
            port: u16,
            #[bind(opaque)]
            timeout: Timeout,
        }
    };
    let tokens = expand(&input).map_err(|e| anyhow!(e.to_string()))?.to_string();
    for needle in [
        "impl my_config :: Bindable for Server",
        "OnceLock < my_config :: Schema >",
        "type_name : \"Server\"",
        "< u16 as my_config :: Describe > :: kind ()",
        "kind : my_config :: FieldKind :: Other",
        "default : :: core :: option :: Option :: Some (\"80\")",
        "impl my_config :: Describe for Server",
        "FieldKind :: Struct (< Self as my_config :: Bindable > :: schema)",
    ] {
        ensure!(tokens.contains(needle), "missing `{needle}` in {tokens}");
    }
    Ok(())
}
