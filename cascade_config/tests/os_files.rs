//! Resolution against the host filesystem and process environment.

use std::time::Duration;

use anyhow::{Result, ensure};
use cascade_config::{Config, DocumentProvider, MapEnv, Options, Provider};
use rstest::rstest;
use serial_test::serial;
use test_helpers::{env, files::TempConfigDir, jail::with_jail};

mod common;
use common::{MyTestConfig, err};

#[rstest]
#[serial]
fn files_resolve_relative_to_the_working_directory() -> Result<()> {
    with_jail(|jail| {
        jail.create_file("config.yaml", "main:\n  a: disk\n  b: 3\n")?;
        jail.create_file("config.staging.yaml", "main:\n  b: 4\n")?;
        jail.set_env("CONFIG_ENV", "staging");
        let config = Config::new(Options::new().file("config.yaml"));
        let mut main = MyTestConfig::default();
        config.bind("main", &mut main).map_err(err)?;
        ensure!(main == MyTestConfig::new("disk", 4), "got {main:?}");
        ensure!(config.environment() == "staging");
        Ok(())
    })
}

#[rstest]
#[serial]
fn process_environment_overrides_files() -> Result<()> {
    with_jail(|jail| {
        jail.create_file("app.json", r#"{"main": {"a": "file", "b": 5}}"#)?;
        jail.set_env("FW_MAIN_B", "6");
        jail.set_env("TEST_A", "tagged");
        let config = Config::new(Options::new().file("app.json").env_prefix("FW"));
        let mut main = MyTestConfig::default();
        config.bind("main", &mut main).map_err(err)?;
        ensure!(main == MyTestConfig::new("tagged", 6), "got {main:?}");
        Ok(())
    })
}

#[rstest]
#[serial]
fn example_files_fill_in_for_missing_configs() -> Result<()> {
    with_jail(|jail| {
        jail.create_file("config.example.yaml", "main:\n  a: sample\n")?;
        let config = Config::new(Options::new().file("config.yaml").silent(true));
        let mut main = MyTestConfig::default();
        config.bind("main", &mut main).map_err(err)?;
        ensure!(main.a == "sample");
        Ok(())
    })
}

#[rstest]
#[serial]
fn provider_builder_reads_files_from_disk() -> Result<()> {
    with_jail(|jail| {
        jail.create_file("base.yaml", "server:\n  host: localhost\n")?;
        jail.set_env("PORT", "8080");
        let provider: DocumentProvider = DocumentProvider::builder()
            .file("base.yaml")
            .source("server:\n  port: ${PORT}\n")
            .raw_source("server:\n  banner: ${PORT}\n")
            .expand(|name| std::env::var(name).ok())
            .build()
            .map_err(err)?;
        let port = provider.get("server.port").decode::<u16>().map_err(err)?;
        ensure!(port == Some(8080));
        let host = provider.get("server.host").decode::<String>().map_err(err)?;
        ensure!(host.as_deref() == Some("localhost"));
        let banner = provider.get("server.banner").decode::<String>().map_err(err)?;
        ensure!(banner.as_deref() == Some("${PORT}"), "raw sources keep placeholders");
        Ok(())
    })
}

#[rstest]
#[serial]
fn process_variables_configure_the_engine() -> Result<()> {
    let _lock = env::lock();
    let _guards = env::set_vars([
        ("CONFIG_ENV", "production"),
        ("CONFIG_ENV_PREFIX", "-"),
        ("MAIN_B", "11"),
    ]);
    let _unset = env::remove_var("TEST_A");
    let config = Config::new(Options::new());
    ensure!(config.environment() == "production");
    ensure!(config.env_prefix().is_none());
    let mut main = MyTestConfig::default();
    config.bind("main", &mut main).map_err(err)?;
    ensure!(main == MyTestConfig::new("1", 11), "got {main:?}");
    Ok(())
}

#[rstest]
fn rewritten_files_are_reloaded() -> Result<()> {
    let dir = TempConfigDir::new()?;
    let path = dir.write("config.yaml", "main:\n  a: before\n")?;
    let config = Config::builder()
        .options(Options::new().file(path))
        .env(MapEnv::new())
        .build();
    let main = config
        .load_with_key("main", MyTestConfig::default())
        .map_err(err)?;
    ensure!(main.get().a == "before");
    ensure!(!config.reload_now().map_err(err)?);
    dir.rewrite_later("config.yaml", "main:\n  a: after\n", Duration::from_secs(5))?;
    ensure!(config.reload_now().map_err(err)?);
    ensure!(*main.get() == MyTestConfig::new("after", 2));
    Ok(())
}
