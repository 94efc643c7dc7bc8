//! Binding behaviour: defaults, document overlay, environment overrides and
//! required fields.

#![expect(
    clippy::expect_used,
    clippy::needless_pass_by_value,
    reason = "tests assert on failures directly and take rstest fixtures by value"
)]

use anyhow::{Result, anyhow, ensure};
use rstest::{fixture, rstest};
use serde::{Deserialize, Serialize};

use super::Binder;
use crate::{Bindable, ConfigError, MapEnv, Node, Path, codec::parse_yaml};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Bindable)]
struct Main {
    #[bind(default = "1", env = "TEST_A")]
    a: String,
    #[bind(default = "2")]
    b: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Bindable)]
struct Database {
    #[bind(default = "localhost")]
    host: String,
    #[bind(default = "5432")]
    port: u16,
    #[bind(required)]
    user: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Bindable)]
struct Server {
    #[bind(default = "0.0.0.0")]
    host: String,
    #[bind(default = "80")]
    port: u16,
    tls: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Bindable)]
struct Logging {
    #[bind(default = "info")]
    level: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Bindable)]
struct App {
    name: String,
    debug: bool,
    #[serde(rename = "db")]
    database: Database,
    servers: Vec<Server>,
    #[bind(anonymous)]
    logging: Logging,
    tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Bindable)]
struct Item {
    host: String,
    #[bind(default = "true")]
    enabled: bool,
    #[bind(default = "80")]
    port: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Bindable)]
struct Inventory {
    name: String,
    items: Vec<Item>,
}

fn doc(text: &str) -> Node {
    parse_yaml(text)
        .ok()
        .flatten()
        .unwrap_or_else(|| panic!("fixture should parse: {text}"))
}

#[fixture]
fn empty_env() -> MapEnv {
    MapEnv::new()
}

fn bind<T: Bindable + Default>(binder: &Binder<'_>, document: Option<&Node>) -> Result<T> {
    let mut target = T::default();
    binder
        .bind(&mut target, document)
        .map_err(|e| anyhow!(e.to_string()))?;
    Ok(target)
}

#[rstest]
fn integer_default_applies_without_file_or_env(empty_env: MapEnv) -> Result<()> {
    let main: Main = bind(&Binder::new(&empty_env), None)?;
    ensure!(main.b == 2, "expected default 2, got {}", main.b);
    ensure!(main.a == "1", "string defaults are taken verbatim");
    Ok(())
}

#[rstest]
fn document_overrides_defaults_without_erasing(empty_env: MapEnv) -> Result<()> {
    let document = doc("a: from-file\n");
    let main: Main = bind(&Binder::new(&empty_env), Some(&document))?;
    ensure!(main == Main { a: "from-file".into(), b: 2 }, "{main:?}");
    Ok(())
}

#[rstest]
fn prefixed_variable_overrides_document() -> Result<()> {
    #[derive(Debug, Default, Serialize, Deserialize, Bindable)]
    struct Plain {
        #[serde(rename = "A")]
        a: String,
    }
    let env = MapEnv::new().with("PREFIX_MAIN_A", "hello");
    let binder = Binder::for_key(&env, Some("PREFIX"), &Path::parse("main"));
    let document = doc("A: from-file\n");
    let plain: Plain = bind(&binder, Some(&document))?;
    ensure!(plain.a == "hello", "got {}", plain.a);
    Ok(())
}

#[rstest]
fn explicit_env_tag_takes_sole_precedence() -> Result<()> {
    let both = MapEnv::new().with("TEST_A", "tagged").with("APP_A", "derived");
    let tagged: Main = bind(&Binder::for_key(&both, Some("APP"), &Path::parse("")), None)?;
    ensure!(tagged.a == "tagged");
    let derived_only = MapEnv::new().with("APP_A", "derived");
    let untagged: Main = bind(&Binder::for_key(&derived_only, Some("APP"), &Path::parse("")), None)?;
    ensure!(untagged.a == "1", "derived names are ignored when a tag is present");
    Ok(())
}

#[rstest]
fn empty_variables_are_ignored() -> Result<()> {
    let env = MapEnv::new().with("APP_B", "");
    let main: Main = bind(&Binder::for_key(&env, Some("APP"), &Path::root()), None)?;
    ensure!(main.b == 2);
    Ok(())
}

#[rstest]
fn nested_structs_extend_the_prefix() -> Result<()> {
    let env = MapEnv::new()
        .with("APP_database_host", "db.internal")
        .with("APP_DATABASE_PORT", "6543")
        .with("APP_DATABASE_USER", "admin")
        .with("APP_DEBUG", "F");
    let binder = Binder::for_key(&env, Some("APP"), &Path::root());
    let document = doc("debug: true\n");
    let app: App = bind(&binder, Some(&document))?;
    ensure!(app.database.host == "db.internal", "literal-case name wins");
    ensure!(app.database.port == 6543);
    ensure!(app.database.user == "admin");
    ensure!(!app.debug, "F is false under the environment boolean rule");
    Ok(())
}

#[rstest]
fn anonymous_fields_do_not_extend_the_prefix() -> Result<()> {
    let env = MapEnv::new()
        .with("APP_LEVEL", "debug")
        .with("APP_DATABASE_USER", "admin");
    let app: App = bind(&Binder::for_key(&env, Some("APP"), &Path::root()), None)?;
    ensure!(app.logging.level == "debug");
    Ok(())
}

#[rstest]
fn required_field_left_blank_fails(empty_env: MapEnv) {
    let mut app = App::default();
    let err = Binder::new(&empty_env)
        .bind(&mut app, None)
        .expect_err("user is required");
    assert!(
        matches!(
            err.as_ref(),
            ConfigError::MissingRequired { type_name: "Database", field } if field == "user"
        ),
        "{err}"
    );
    assert_eq!(err.to_string(), "Database.user is required, but blank");
}

#[rstest]
fn struct_sequence_elements_receive_defaults(empty_env: MapEnv) -> Result<()> {
    let document = doc("db:\n  user: admin\nservers:\n  - host: a\n  - port: 8080\n");
    let app: App = bind(&Binder::new(&empty_env), Some(&document))?;
    ensure!(
        app.servers
            == vec![
                Server { host: "a".into(), port: 80, tls: false },
                Server { host: "0.0.0.0".into(), port: 8080, tls: false },
            ],
        "{:?}",
        app.servers
    );
    Ok(())
}

#[rstest]
fn explicit_zero_values_in_document_elements_are_kept(empty_env: MapEnv) -> Result<()> {
    let document = doc("items:\n  - {host: a, enabled: false, port: 0}\n  - host: b\n");
    let inventory: Inventory = bind(&Binder::new(&empty_env), Some(&document))?;
    ensure!(
        inventory.items
            == vec![
                Item { host: "a".into(), enabled: false, port: 0 },
                Item { host: "b".into(), enabled: true, port: 80 },
            ],
        "{:?}",
        inventory.items
    );
    Ok(())
}

#[rstest]
#[case("b: ~\n")]
#[case("b:\n")]
#[case("b: null\n")]
fn null_document_values_keep_defaults(empty_env: MapEnv, #[case] text: &str) -> Result<()> {
    let document = doc(text);
    let main: Main = bind(&Binder::new(&empty_env), Some(&document))?;
    ensure!(main == Main { a: "1".into(), b: 2 }, "{text:?} gave {main:?}");
    Ok(())
}

#[rstest]
fn explicit_false_variable_in_discovered_element_is_kept() -> Result<()> {
    let env = MapEnv::new()
        .with("APP_NAME", "stock")
        .with("APP_ITEMS_0_HOST", "a")
        .with("APP_ITEMS_0_ENABLED", "false")
        .with("APP_ITEMS_1_PORT", "0")
        .with("APP_ITEMS_1_HOST", "b");
    let inventory: Inventory = bind(&Binder::for_key(&env, Some("APP"), &Path::root()), None)?;
    ensure!(
        inventory.items
            == vec![
                Item { host: "a".into(), enabled: false, port: 80 },
                Item { host: "b".into(), enabled: true, port: 0 },
            ],
        "{:?}",
        inventory.items
    );
    Ok(())
}

#[rstest]
fn existing_sequence_elements_use_indexed_names() -> Result<()> {
    let env = MapEnv::new()
        .with("APP_DATABASE_USER", "admin")
        .with("APP_SERVERS_1_TLS", "true");
    let document = doc("servers:\n  - host: a\n  - host: b\n");
    let app: App = bind(&Binder::for_key(&env, Some("APP"), &Path::root()), Some(&document))?;
    ensure!(!app.servers.first().is_some_and(|s| s.tls));
    ensure!(app.servers.get(1).is_some_and(|s| s.tls));
    Ok(())
}

#[rstest]
fn empty_sequences_are_discovered_from_the_environment() -> Result<()> {
    let env = MapEnv::new()
        .with("APP_DATABASE_USER", "admin")
        .with("APP_SERVERS_0_HOST", "first")
        .with("APP_SERVERS_1_PORT", "9000")
        .with("APP_SERVERS_3_HOST", "unreachable");
    let app: App = bind(&Binder::for_key(&env, Some("APP"), &Path::root()), None)?;
    ensure!(
        app.servers
            == vec![
                Server { host: "first".into(), port: 80, tls: false },
                Server { host: "0.0.0.0".into(), port: 9000, tls: false },
            ],
        "discovery stops at the first zero element: {:?}",
        app.servers
    );
    Ok(())
}

#[rstest]
fn non_string_variables_parse_as_yaml() -> Result<()> {
    let env = MapEnv::new()
        .with("APP_DATABASE_USER", "admin")
        .with("APP_TAGS", "[a, b]");
    let app: App = bind(&Binder::for_key(&env, Some("APP"), &Path::root()), None)?;
    ensure!(app.tags == ["a", "b"]);
    Ok(())
}

#[rstest]
fn malformed_integer_variable_is_a_decode_error() {
    let env = MapEnv::new()
        .with("APP_DATABASE_USER", "admin")
        .with("APP_DATABASE_PORT", "not-a-port");
    let mut app = App::default();
    let err = Binder::for_key(&env, Some("APP"), &Path::root())
        .bind(&mut app, None)
        .expect_err("port must be numeric");
    assert!(matches!(err.as_ref(), ConfigError::Decode { .. }), "{err}");
}

#[rstest]
fn binding_twice_is_idempotent() -> Result<()> {
    let env = MapEnv::new().with("APP_DATABASE_USER", "admin");
    let binder = Binder::for_key(&env, Some("APP"), &Path::root());
    let document = doc("name: demo\nservers:\n  - host: a\n");
    let first: App = bind(&binder, Some(&document))?;
    let second: App = bind(&binder, Some(&document))?;
    ensure!(first == second);
    Ok(())
}

#[rstest]
fn non_mapping_targets_are_rejected(empty_env: MapEnv) {
    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Wrapper(u8);

    impl Bindable for Wrapper {
        fn schema() -> &'static crate::Schema {
            static SCHEMA: crate::Schema = crate::Schema {
                type_name: "Wrapper",
                fields: Vec::new(),
            };
            &SCHEMA
        }
    }

    let mut wrapper = Wrapper::default();
    let err = Binder::new(&empty_env)
        .bind(&mut wrapper, None)
        .expect_err("newtype is not a mapping");
    assert!(matches!(err.as_ref(), ConfigError::InvalidTarget { .. }), "{err}");
}
