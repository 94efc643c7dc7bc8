//! Unit tests for error rendering and aggregation behaviour.

use rstest::rstest;
use std::sync::Arc;

use super::ConfigError;

fn run_aggregate_tests<F>(name: &str, runner: F)
where
    F: Fn(Vec<Arc<ConfigError>>) -> ConfigError,
{
    assert_single_owned(name, &runner);
    assert_single_shared(name, &runner);
    assert_multi_entry(name, &runner);
}

fn assert_single_owned<F>(name: &str, runner: &F)
where
    F: Fn(Vec<Arc<ConfigError>>) -> ConfigError,
{
    let err = Arc::new(ConfigError::UndefinedVariable { name: "HOST".into() });
    let outcome = runner(vec![err]);
    assert!(
        matches!(outcome, ConfigError::UndefinedVariable { .. }),
        "{name}: expected UndefinedVariable, got {outcome:?}"
    );
}

fn assert_single_shared<F>(name: &str, runner: &F)
where
    F: Fn(Vec<Arc<ConfigError>>) -> ConfigError,
{
    let shared = ConfigError::duplicate_key("a.b");
    let outcome = runner(vec![Arc::clone(&shared)]);
    match outcome {
        ConfigError::Aggregate(aggregate) => {
            assert_eq!(aggregate.len(), 1, "{name}: expected single entry");
            let first = aggregate.iter().next();
            assert!(
                matches!(first, Some(ConfigError::DuplicateKey { path }) if path == "a.b"),
                "{name}: unexpected entry {first:?}"
            );
        }
        other => panic!("{name}: expected Aggregate, got {other:?}"),
    }
}

fn assert_multi_entry<F>(name: &str, runner: &F)
where
    F: Fn(Vec<Arc<ConfigError>>) -> ConfigError,
{
    let outcome = runner(vec![
        Arc::new(ConfigError::AlreadyLoaded),
        ConfigError::duplicate_key("x"),
    ]);
    match outcome {
        ConfigError::Aggregate(aggregate) => assert_eq!(aggregate.len(), 2, "{name}"),
        other => panic!("{name}: expected Aggregate, got {other:?}"),
    }
}

#[test]
fn try_aggregate_handles_arity() {
    run_aggregate_tests("try_aggregate", |errs| {
        ConfigError::try_aggregate(errs).unwrap_or_else(|| panic!("expected an error"))
    });
    assert!(ConfigError::try_aggregate(Vec::<Arc<ConfigError>>::new()).is_none());
}

#[test]
fn aggregate_handles_arity() {
    run_aggregate_tests("aggregate", ConfigError::aggregate);
}

#[rstest]
#[case::required(
    ConfigError::MissingRequired { type_name: "Settings", field: "token".into() },
    "Settings.token is required, but blank"
)]
#[case::conflict(
    ConfigError::StructuralConflict { path: "b".into(), existing: "mapping", incoming: "scalar" },
    "can't merge a scalar into a mapping at 'b'"
)]
#[case::undefined(
    ConfigError::UndefinedVariable { name: "PORT".into() },
    "variable 'PORT' is not defined and has no default"
)]
fn renders_messages(#[case] err: ConfigError, #[case] expected: &str) {
    assert_eq!(err.to_string(), expected);
}

#[test]
fn aggregate_display_lists_entries() {
    let err = ConfigError::aggregate(vec![
        Arc::new(ConfigError::AlreadyLoaded),
        ConfigError::duplicate_key("k"),
    ]);
    let text = err.to_string();
    assert!(text.contains("\n- cannot set options"), "{text}");
    assert!(text.ends_with("\n- duplicate key at 'k'"), "{text}");
}

#[test]
fn discovery_errors_are_soft() {
    let err = ConfigError::FileDiscovery {
        path: "app.yaml".into(),
        message: "no candidates".into(),
    };
    assert!(err.is_soft());
    assert!(!ConfigError::AlreadyLoaded.is_soft());
}
