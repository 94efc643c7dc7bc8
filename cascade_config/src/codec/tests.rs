//! Codec selection and decoding behaviour.

#![expect(
    clippy::expect_used,
    reason = "clippy::expect_used is denied globally; tests may not hit those branches"
)]

use anyhow::{Result, anyhow, ensure};
use camino::Utf8Path;
use rstest::{fixture, rstest};

use super::{Codec, Codecs, JsonCodec, YamlCodec};
use crate::{ConfigError, Node};

#[fixture]
fn codecs() -> Codecs {
    Codecs::default()
}

#[rstest]
#[case("app.yaml", "yaml")]
#[case("app.YML", "yaml")]
#[case("app.json", "json")]
fn selects_codec_by_extension(codecs: Codecs, #[case] path: &str, #[case] expected: &str) {
    let codec = codecs.for_path(Utf8Path::new(path));
    assert_eq!(codec.map(Codec::name), Some(expected));
}

#[rstest]
#[case("")]
#[case("   \n")]
#[case("# only a comment\n---\n")]
fn blank_yaml_is_no_document(#[case] text: &str) -> Result<()> {
    let node = YamlCodec
        .decode(text.as_bytes())
        .map_err(|e| anyhow!(e.to_string()))?;
    ensure!(node.is_none(), "expected no document, got {node:?}");
    Ok(())
}

#[rstest]
fn explicit_null_is_a_document() -> Result<()> {
    let node = YamlCodec
        .decode(b"null")
        .map_err(|e| anyhow!(e.to_string()))?;
    ensure!(node == Some(Node::Null));
    Ok(())
}

#[rstest]
fn yaml_keeps_integer_keys_and_yes_strings() -> Result<()> {
    let node = YamlCodec
        .decode(b"1: one\nflag: yes\n")
        .map_err(|e| anyhow!(e.to_string()))?
        .ok_or_else(|| anyhow!("expected a document"))?;
    let map = node.as_mapping().ok_or_else(|| anyhow!("expected mapping"))?;
    ensure!(map.get(&Node::Int(1)) == Some(&Node::from("one")));
    ensure!(map.get_str("flag") == Some(&Node::from("yes")));
    Ok(())
}

#[rstest]
fn json_keeps_duplicate_keys_for_the_merger() -> Result<()> {
    let node = JsonCodec
        .decode(br#"{"a": 1, "a": 2}"#)
        .map_err(|e| anyhow!(e.to_string()))?
        .ok_or_else(|| anyhow!("expected a document"))?;
    let map = node.as_mapping().ok_or_else(|| anyhow!("expected mapping"))?;
    ensure!(map.len() == 2);
    Ok(())
}

#[rstest]
fn unknown_extension_probes_json_then_yaml(codecs: Codecs) -> Result<()> {
    let json = codecs
        .decode_path(Utf8Path::new("app.conf"), br#"{"a": 1}"#)
        .map_err(|e| anyhow!(e.to_string()))?;
    let yaml = codecs
        .decode_path(Utf8Path::new("app.conf"), b"a: 1\n")
        .map_err(|e| anyhow!(e.to_string()))?;
    ensure!(json == yaml, "both encodings describe the same document");
    Ok(())
}

#[rstest]
fn unknown_extension_reports_yaml_failure(codecs: Codecs) {
    let err = codecs
        .decode_path(Utf8Path::new("app.conf"), b"a: [1, 2\n")
        .expect_err("expected decode failure");
    assert!(
        matches!(err.as_ref(), ConfigError::Decode { origin, .. } if origin == "app.conf"),
        "unexpected error: {err}"
    );
}

#[cfg(feature = "toml")]
#[rstest]
fn toml_dates_decode_as_strings(codecs: Codecs) -> Result<()> {
    let node = codecs
        .decode_path(Utf8Path::new("app.toml"), b"when = 1979-05-27\n[server]\nport = 80\n")
        .map_err(|e| anyhow!(e.to_string()))?
        .ok_or_else(|| anyhow!("expected a document"))?;
    let map = node.as_mapping().ok_or_else(|| anyhow!("expected mapping"))?;
    ensure!(map.get_str("when") == Some(&Node::from("1979-05-27")));
    Ok(())
}

#[rstest]
fn yaml_encoding_is_canonical() -> Result<()> {
    let node = YamlCodec
        .decode(b"# comment\nb: {y: 2}\na: 1\n")
        .map_err(|e| anyhow!(e.to_string()))?
        .ok_or_else(|| anyhow!("expected a document"))?;
    let encoded = YamlCodec.encode(&node).map_err(|e| anyhow!(e.to_string()))?;
    ensure!(encoded == b"b:\n  y: 2\na: 1\n", "{:?}", String::from_utf8_lossy(&encoded));
    Ok(())
}
