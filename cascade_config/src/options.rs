//! Engine options and their process-environment fallbacks.

use std::time::Duration;

use camino::Utf8PathBuf;

use crate::env::{EnvLookup, env_bool};

/// Environment used when neither the options nor `CONFIG_ENV` name one.
pub const DEFAULT_ENVIRONMENT: &str = "development";
/// Variable prefix used when neither the options nor `CONFIG_ENV_PREFIX` name one.
pub const DEFAULT_ENV_PREFIX: &str = "CONFIG";
/// Prefix value that disables prefixing altogether.
pub const NO_PREFIX: &str = "-";
/// Interval between reload ticks unless configured otherwise.
pub const DEFAULT_RELOAD_INTERVAL: Duration = Duration::from_secs(5);

const ENVIRONMENT_VAR: &str = "CONFIG_ENV";
const ENV_PREFIX_VAR: &str = "CONFIG_ENV_PREFIX";
const DEBUG_VAR: &str = "CONFIG_DEBUG_MODE";
const VERBOSE_VAR: &str = "CONFIG_VERBOSE_MODE";
const SILENT_VAR: &str = "CONFIG_SILENT_MODE";

/// Options controlling discovery, merging, binding and reloading.
///
/// Unset values fall back to `CONFIG_ENV`, `CONFIG_ENV_PREFIX`,
/// `CONFIG_DEBUG_MODE`, `CONFIG_VERBOSE_MODE` and `CONFIG_SILENT_MODE` when
/// resolved into [`Settings`].
///
/// # Examples
///
/// ```
/// use cascade_config::{MapEnv, Options};
/// let settings = Options::new()
///     .env_prefix("APP")
///     .file("config.yaml")
///     .resolve(&MapEnv::new().with("CONFIG_ENV", "production"));
/// assert_eq!(settings.environment, "production");
/// assert_eq!(settings.env_prefix.as_deref(), Some("APP"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    environment: Option<String>,
    env_prefix: Option<String>,
    debug: Option<bool>,
    verbose: Option<bool>,
    silent: Option<bool>,
    strict: bool,
    expand_variables: bool,
    auto_reload: bool,
    reload_interval: Option<Duration>,
    files: Vec<Utf8PathBuf>,
}

impl Options {
    /// Options with every value unset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment name used for `name.<env>.ext` file variants.
    #[must_use]
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Prefix for derived environment variable names; `"-"` disables it.
    #[must_use]
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Log each file as it is loaded.
    #[must_use]
    pub const fn debug(mut self, debug: bool) -> Self {
        self.debug = Some(debug);
        self
    }

    /// Log every environment probe as well as loaded files.
    #[must_use]
    pub const fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    /// Suppress warnings about missing files and example fallbacks.
    #[must_use]
    pub const fn silent(mut self, silent: bool) -> Self {
        self.silent = Some(silent);
        self
    }

    /// Reject conflicting scalars and repeated keys while merging files.
    #[must_use]
    pub const fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Expand `${NAME}` placeholders in string values after merging.
    #[must_use]
    pub const fn expand_variables(mut self, expand: bool) -> Self {
        self.expand_variables = expand;
        self
    }

    /// Start a background reload loop on the first registration.
    #[must_use]
    pub const fn auto_reload(mut self, auto_reload: bool) -> Self {
        self.auto_reload = auto_reload;
        self
    }

    /// Interval between reload ticks.
    #[must_use]
    pub const fn reload_interval(mut self, interval: Duration) -> Self {
        self.reload_interval = Some(interval);
        self
    }

    /// Append a configuration file. Earlier files take precedence.
    #[must_use]
    pub fn file(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.files.push(path.into());
        self
    }

    /// Replace the configuration file list.
    #[must_use]
    pub fn files<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Utf8PathBuf>,
    {
        self.files = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Apply process-environment fallbacks and defaults.
    #[must_use]
    pub fn resolve(&self, env: &dyn EnvLookup) -> Settings {
        let var = |name: &str| env.lookup(name).filter(|value| !value.is_empty());
        let flag = |set: Option<bool>, name: &str| {
            set.unwrap_or_else(|| var(name).is_some_and(|value| env_bool(&value)))
        };
        let prefix = self
            .env_prefix
            .clone()
            .filter(|prefix| !prefix.is_empty())
            .or_else(|| var(ENV_PREFIX_VAR))
            .unwrap_or_else(|| DEFAULT_ENV_PREFIX.to_owned());
        Settings {
            environment: self
                .environment
                .clone()
                .filter(|environment| !environment.is_empty())
                .or_else(|| var(ENVIRONMENT_VAR))
                .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_owned()),
            env_prefix: (prefix != NO_PREFIX).then_some(prefix),
            debug: flag(self.debug, DEBUG_VAR),
            verbose: flag(self.verbose, VERBOSE_VAR),
            silent: flag(self.silent, SILENT_VAR),
            strict: self.strict,
            expand_variables: self.expand_variables,
            auto_reload: self.auto_reload,
            reload_interval: self.reload_interval.unwrap_or(DEFAULT_RELOAD_INTERVAL),
            files: self.files.clone(),
        }
    }
}

/// Fully resolved options.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Settings {
    /// Active environment name.
    pub environment: String,
    /// Variable prefix, or `None` when prefixing is disabled.
    pub env_prefix: Option<String>,
    /// Log loaded files.
    pub debug: bool,
    /// Log environment probes.
    pub verbose: bool,
    /// Suppress missing-file warnings.
    pub silent: bool,
    /// Strict merging.
    pub strict: bool,
    /// Placeholder expansion.
    pub expand_variables: bool,
    /// Background reloading.
    pub auto_reload: bool,
    /// Interval between reload ticks.
    pub reload_interval: Duration,
    /// Configuration files, highest precedence first.
    pub files: Vec<Utf8PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Options::default().resolve(&crate::env::MapEnv::new())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::rstest;

    use super::{DEFAULT_RELOAD_INTERVAL, Options};
    use crate::MapEnv;

    #[rstest]
    fn defaults_without_environment() {
        let settings = Options::new().resolve(&MapEnv::new());
        assert_eq!(settings.environment, "development");
        assert_eq!(settings.env_prefix.as_deref(), Some("CONFIG"));
        assert!(!settings.debug && !settings.verbose && !settings.silent);
        assert_eq!(settings.reload_interval, DEFAULT_RELOAD_INTERVAL);
    }

    #[rstest]
    fn process_variables_fill_unset_values() {
        let env = MapEnv::new()
            .with("CONFIG_ENV", "test")
            .with("CONFIG_ENV_PREFIX", "-")
            .with("CONFIG_DEBUG_MODE", "true")
            .with("CONFIG_SILENT_MODE", "0");
        let settings = Options::new().resolve(&env);
        assert_eq!(settings.environment, "test");
        assert!(settings.env_prefix.is_none(), "'-' disables the prefix");
        assert!(settings.debug);
        assert!(!settings.silent);
    }

    #[rstest]
    fn explicit_values_win_over_process_variables() {
        let env = MapEnv::new()
            .with("CONFIG_ENV", "test")
            .with("CONFIG_DEBUG_MODE", "true");
        let settings = Options::new()
            .environment("production")
            .debug(false)
            .reload_interval(Duration::from_millis(10))
            .files(["a.yaml", "b.json"])
            .resolve(&env);
        assert_eq!(settings.environment, "production");
        assert!(!settings.debug);
        assert_eq!(settings.files.len(), 2);
        assert_eq!(settings.reload_interval, Duration::from_millis(10));
    }
}
