//! Unit tests for the document tree, weak decoding and rendering.

#![expect(
    clippy::expect_used,
    reason = "clippy::expect_used is denied globally; tests may not hit those branches"
)]

use std::collections::BTreeMap;

use anyhow::{Result, anyhow, ensure};
use rstest::rstest;
use serde::{Deserialize, Serialize};

use super::{Mapping, Node, from_node, to_node};

fn map(entries: &[(&str, Node)]) -> Node {
    Node::Map(
        entries
            .iter()
            .map(|(k, v)| (Node::from(*k), v.clone()))
            .collect(),
    )
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
struct Listener {
    host: String,
    port: u16,
    tls: bool,
    ratio: f64,
    tags: Vec<String>,
    label: Option<String>,
}

#[rstest]
#[case::null(Node::Null, true)]
#[case::false_bool(Node::Bool(false), true)]
#[case::zero(Node::Int(0), true)]
#[case::empty_str(Node::from(""), true)]
#[case::empty_seq(Node::Seq(Vec::new()), true)]
#[case::zero_struct(map(&[("a", Node::Int(0)), ("b", Node::from(""))]), true)]
#[case::text(Node::from("x"), false)]
#[case::partial_struct(map(&[("a", Node::Int(0)), ("b", Node::from("y"))]), false)]
fn zero_detection(#[case] node: Node, #[case] expected: bool) {
    assert_eq!(node.is_zero(), expected);
}

#[rstest]
fn decodes_weakly_typed_scalars() -> Result<()> {
    let node = map(&[
        ("host", Node::Int(10)),
        ("port", Node::from("8080")),
        ("tls", Node::from("true")),
        ("ratio", Node::Int(2)),
        ("tags", Node::from("single")),
        ("label", Node::Null),
    ]);
    let listener: Listener = from_node(&node).map_err(|e| anyhow!(e))?;
    ensure!(listener.host == "10", "integer should decode into a string");
    ensure!(listener.port == 8080, "string should decode into an integer");
    ensure!(listener.tls, "string should decode into a bool");
    ensure!((listener.ratio - 2.0).abs() < f64::EPSILON);
    ensure!(listener.tags == vec!["single".to_owned()]);
    ensure!(listener.label.is_none());
    Ok(())
}

#[rstest]
fn null_decodes_into_empty_collections() -> Result<()> {
    let tags: Vec<String> = from_node(&Node::Null).map_err(|e| anyhow!(e))?;
    let table: BTreeMap<String, i64> = from_node(&Node::Null).map_err(|e| anyhow!(e))?;
    ensure!(tags.is_empty() && table.is_empty());
    Ok(())
}

#[derive(Debug, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Mode {
    Fast,
    Careful { retries: u8 },
}

#[rstest]
fn decodes_enums_from_strings_and_single_entry_maps() -> Result<()> {
    let fast: Mode = from_node(&Node::from("fast")).map_err(|e| anyhow!(e))?;
    ensure!(fast == Mode::Fast);
    let careful: Mode = from_node(&map(&[("careful", map(&[("retries", Node::from("3"))]))]))
        .map_err(|e| anyhow!(e))?;
    ensure!(careful == Mode::Careful { retries: 3 });
    Ok(())
}

#[rstest]
fn rejects_non_numeric_text_for_integers() {
    let err = from_node::<u16>(&Node::from("eighty")).expect_err("expected failure");
    assert!(err.to_string().contains("eighty"), "{err}");
}

#[rstest]
fn to_node_keeps_field_order() -> Result<()> {
    let node = to_node(&Listener {
        host: "localhost".into(),
        ..Listener::default()
    })
    .map_err(|e| anyhow!(e.to_string()))?;
    let keys: Vec<String> = node
        .as_mapping()
        .ok_or_else(|| anyhow!("expected mapping"))?
        .iter()
        .map(|(k, _)| k.key_text())
        .collect();
    ensure!(keys == ["host", "port", "tls", "ratio", "tags", "label"], "{keys:?}");
    Ok(())
}

#[rstest]
fn overlay_merges_mappings_without_erasing() {
    let mut base = map(&[("a", Node::Int(1)), ("b", map(&[("x", Node::Int(1))]))]);
    base.overlay(map(&[
        ("a", Node::Null),
        ("b", map(&[("y", Node::Int(2))])),
    ]));
    assert_eq!(
        base,
        map(&[
            ("a", Node::Int(1)),
            ("b", map(&[("x", Node::Int(1)), ("y", Node::Int(2))])),
        ])
    );
}

#[rstest]
fn mapping_insert_replaces_existing_keys() {
    let mut mapping = Mapping::new();
    assert!(mapping.insert(Node::from("k"), Node::Int(1)).is_none());
    assert_eq!(
        mapping.insert(Node::from("k"), Node::Int(2)),
        Some(Node::Int(1))
    );
    assert_eq!(mapping.len(), 1);
    *mapping.slot("other") = Node::Bool(true);
    assert_eq!(mapping.get_str("other"), Some(&Node::Bool(true)));
}

#[rstest]
fn renders_block_yaml() {
    let node = map(&[
        ("name", Node::from("demo")),
        ("ports", Node::Seq(vec![Node::Int(80), Node::Int(443)])),
        ("flag", Node::from("true")),
        ("empty", Node::Seq(Vec::new())),
    ]);
    let text = node.to_string();
    assert!(text.starts_with("name: demo\nports:\n"), "{text}");
    assert!(text.contains("- 443"), "{text}");
    assert!(text.contains("flag: \"true\""), "{text}");
    assert!(text.ends_with("empty: []"), "{text}");
}

#[rstest]
fn rendered_yaml_parses_back() -> Result<()> {
    let node = map(&[
        ("quoted", Node::from("a: b # c")),
        ("nested", map(&[("list", Node::Seq(vec![Node::Seq(vec![Node::Int(1)])]))])),
        ("float", Node::Float(0.5)),
        ("null", Node::Null),
        ("none", Node::Map(Mapping::new())),
    ]);
    let parsed = crate::codec::parse_yaml(&node.to_string())
        .map_err(|e| anyhow!(e.to_string()))?
        .ok_or_else(|| anyhow!("expected a document"))?;
    ensure!(parsed == node, "round trip changed the document: {parsed:?}");
    Ok(())
}

#[rstest]
fn typed_keys_survive_yaml_rendering() -> Result<()> {
    let node = Node::Map(
        [
            (Node::Int(80), Node::from("http")),
            (Node::Bool(true), Node::from("yes")),
        ]
        .into_iter()
        .collect(),
    );
    let parsed = crate::codec::parse_yaml(&node.to_string())
        .map_err(|e| anyhow!(e.to_string()))?
        .ok_or_else(|| anyhow!("expected a document"))?;
    ensure!(parsed == node, "keys lost their type: {parsed:?}");
    ensure!(node.key_text() == r#"{"80":"http","true":"yes"}"#, "{}", node.key_text());
    Ok(())
}

#[rstest]
#[case("~", Node::Null)]
#[case("null", Node::Null)]
#[case("'~'", Node::from("~"))]
#[case("\"null\"", Node::from("null"))]
fn plain_null_scalars_decode_as_null(#[case] text: &str, #[case] expected: Node) -> Result<()> {
    let parsed = crate::codec::parse_yaml(text).map_err(|e| anyhow!(e.to_string()))?;
    ensure!(parsed == Some(expected.clone()), "{text}: {parsed:?}");
    let nested = crate::codec::parse_yaml(&format!("a: {text}\nb:\n"))
        .map_err(|e| anyhow!(e.to_string()))?;
    ensure!(nested == Some(map(&[("a", expected), ("b", Node::Null)])), "{nested:?}");
    Ok(())
}
