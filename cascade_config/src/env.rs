//! Environment variable lookup services.

use std::collections::HashMap;

/// Interpret an environment value as a boolean.
///
/// `""`, `0`, `f` and `false` (in any case) are false; anything else is true.
///
/// # Examples
///
/// ```
/// use cascade_config::env_bool;
/// assert!(!env_bool("False"));
/// assert!(env_bool("no"));
/// ```
#[must_use]
pub fn env_bool(raw: &str) -> bool {
    !matches!(raw.to_lowercase().as_str(), "" | "0" | "f" | "false")
}

/// Source of environment variables.
pub trait EnvLookup: Send + Sync {
    /// Return the value of `name`, or `None` when it is unset.
    fn lookup(&self, name: &str) -> Option<String>;
}

/// Reads the process environment. Values that are not valid Unicode are
/// treated as unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEnv;

impl EnvLookup for OsEnv {
    fn lookup(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Fixed in-memory environment.
///
/// # Examples
///
/// ```
/// use cascade_config::{EnvLookup, MapEnv};
/// let env = MapEnv::from_iter([("APP_PORT", "8080")]);
/// assert_eq!(env.lookup("APP_PORT").as_deref(), Some("8080"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapEnv {
    vars: HashMap<String, String>,
}

impl MapEnv {
    /// Create an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to `value`, returning the environment for chaining.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapEnv {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl EnvLookup for MapEnv {
    fn lookup(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

impl<F> EnvLookup for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn lookup(&self, name: &str) -> Option<String> {
        self(name)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{EnvLookup, MapEnv, env_bool};

    #[rstest]
    #[case("", false)]
    #[case("0", false)]
    #[case("F", false)]
    #[case("False", false)]
    #[case("1", true)]
    #[case("no", true)]
    #[case("yes", true)]
    fn boolean_environment_rule(#[case] raw: &str, #[case] expected: bool) {
        assert_eq!(env_bool(raw), expected);
    }

    #[rstest]
    fn closures_act_as_lookups() {
        let lookup = |name: &str| (name == "A").then(|| "1".to_owned());
        assert_eq!(lookup.lookup("A").as_deref(), Some("1"));
        assert!(MapEnv::new().lookup("A").is_none());
    }
}
