//! Fixtures shared by the integration tests.

use std::sync::Arc;

use anyhow::anyhow;
use cascade_config::{Bindable, Config, ConfigError, MapEnv, MemoryFileSystem, Options};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Bindable)]
pub struct MyTestConfig {
    #[bind(default = "1", env = "TEST_A")]
    pub a: String,
    #[bind(default = "2")]
    pub b: i64,
}

impl MyTestConfig {
    pub fn new(a: &str, b: i64) -> Self {
        Self { a: a.to_owned(), b }
    }
}

/// A config over an in-memory filesystem and a fixed environment.
pub fn config_over(fs: &Arc<MemoryFileSystem>, env: MapEnv, options: Options) -> Config {
    Config::builder()
        .options(options)
        .fs(fs.clone())
        .env(env)
        .build()
}

/// Convert a shared config error into `anyhow`.
#[expect(
    clippy::needless_pass_by_value,
    reason = "used directly as a `map_err` adaptor"
)]
pub fn err(error: Arc<ConfigError>) -> anyhow::Error {
    anyhow!(error.to_string())
}
